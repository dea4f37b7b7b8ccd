// CSV export of the income listing
use crate::error::FinanceResult;
use crate::models::Transaction;
use std::io::Write;

pub const ENGLISH_HEADER: [&str; 10] = [
    "date", "time", "invoice", "patient", "treatment", "doctor", "amount", "method", "status", "source",
];

pub const SPANISH_HEADER: [&str; 10] = [
    "fecha", "hora", "factura", "paciente", "tratamiento", "doctor", "monto", "metodo", "estado", "origen",
];

const BLANK: &str = "-";

fn cell(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => BLANK.to_string(),
    }
}

fn income_record(tx: &Transaction) -> [String; 10] {
    [
        tx.date.format("%Y-%m-%d").to_string(),
        tx.time.map_or_else(|| BLANK.to_string(), |t| t.format("%H:%M").to_string()),
        cell(tx.invoice_number.as_deref()),
        cell(tx.patient.as_deref()),
        cell(tx.treatment_text()),
        cell(tx.doctor.as_deref()),
        format!("{:.2}", tx.amount.round_dp(2)),
        cell(tx.payment_method.as_deref()),
        tx.status.to_string(),
        tx.source.as_str().to_string(),
    ]
}

/// Write income rows with the English header; returns the number of rows written
pub fn export_income_csv<W: Write>(records: &[Transaction], writer: W) -> FinanceResult<usize> {
    export_income_csv_with_header(records, writer, &ENGLISH_HEADER)
}

pub fn export_income_csv_with_header<W: Write>(
    records: &[Transaction],
    writer: W,
    header: &[&str; 10],
) -> FinanceResult<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header)?;

    let mut written = 0;
    for tx in records.iter().filter(|tx| tx.is_income()) {
        csv.write_record(income_record(tx))?;
        written += 1;
    }

    csv.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    fn tx(kind: TransactionKind) -> Transaction {
        Transaction {
            id: "t1".to_string(),
            amount: Decimal::new(1205, 1),
            date: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
            time: NaiveTime::from_hms_opt(9, 5, 41),
            kind,
            doctor: Some("Dra. Paez".to_string()),
            patient: None,
            treatment: Some("Resina, pieza 26".to_string()),
            chair: None,
            payment_method: Some("Tarjeta".to_string()),
            invoice_number: Some("  ".to_string()),
            status: PaymentStatus::Abono,
            source: TransactionSource::External,
            description: None,
            category: None,
        }
    }

    #[test]
    fn test_income_rows_only() {
        let mut out = Vec::new();
        let written = export_income_csv(&[tx(TransactionKind::Income), tx(TransactionKind::Expense)], &mut out).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,time,invoice,patient,treatment,doctor,amount,method,status,source");
        assert_eq!(
            lines[1],
            "2026-10-03,09:05,-,-,\"Resina, pieza 26\",Dra. Paez,120.50,Tarjeta,ABONO,external"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_spanish_header() {
        let mut out = Vec::new();
        export_income_csv_with_header(&[], &mut out, &SPANISH_HEADER).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("fecha,hora,factura"));
    }
}
