//! Two-source ingestion
//!
//! Local rows map fully (income and expense). External payments contribute
//! income only. A local row that carries `external_ref` replaces the external
//! payment with that id. Rows that fail validation are reported, never dropped.

use crate::models::{PaymentStatus, Transaction, TransactionKind, TransactionSource};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use database_layer::{DateRange, Decoded, ExternalPaymentRow, RowDecodeError, TransactionRow};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// A source row that could not become a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub source: TransactionSource,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Newest first
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
    /// External payments replaced by a local record
    pub shadowed: usize,
    pub skipped_non_income: usize,
}

impl Reconciliation {
    /// Keep the transactions dated inside `range`; rejected rows are kept whatever their date
    pub fn within(mut self, range: DateRange) -> Self {
        self.transactions
            .retain(|tx| range.start <= tx.date && tx.date <= range.end);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn reject(source: TransactionSource, id: Option<String>, reason: impl Into<String>) -> RejectedRow {
    RejectedRow {
        source,
        id,
        reason: reason.into(),
    }
}

fn from_decode_error(source: TransactionSource, err: RowDecodeError) -> RejectedRow {
    reject(source, err.id, err.reason)
}

fn checked_amount(amount: Option<Decimal>) -> Result<Decimal, String> {
    match amount {
        None => Err("missing amount".to_string()),
        Some(a) if a < Decimal::ZERO => Err(format!("negative amount {a}")),
        Some(a) => Ok(a),
    }
}

fn local_transaction(row: TransactionRow) -> Result<Transaction, RejectedRow> {
    let fail = |id: &Option<String>, reason: String| reject(TransactionSource::Local, id.clone(), reason);

    let Some(id) = non_blank(row.id.clone()) else {
        return Err(fail(&row.id, "missing id".to_string()));
    };
    let amount = checked_amount(Some(row.amount)).map_err(|reason| fail(&row.id, reason))?;
    let kind = TransactionKind::parse(&row.kind)
        .ok_or_else(|| fail(&row.id, format!("unknown transaction type '{}'", row.kind)))?;

    Ok(Transaction {
        id,
        amount,
        date: row.date,
        time: row.time,
        kind,
        doctor: non_blank(row.doctor),
        patient: non_blank(row.patient),
        treatment: non_blank(row.treatment),
        chair: non_blank(row.chair),
        payment_method: non_blank(row.payment_method),
        invoice_number: non_blank(row.invoice_number),
        status: non_blank(row.status).map(|s| PaymentStatus::parse(&s)).unwrap_or_default(),
        source: TransactionSource::Local,
        description: non_blank(row.description),
        category: non_blank(row.category),
    })
}

/// `YYYY-MM-DD`, an ISO timestamp, or `DD/MM/YYYY`
fn parse_external_date(raw: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some((date, None));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some((stamp.date(), Some(stamp.time())));
        }
    }
    // Timestamps with an offset: keep the wall-clock date and time
    if let Some(prefix) = raw.get(..19) {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S") {
            return Some((stamp.date(), Some(stamp.time())));
        }
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok().map(|d| (d, None))
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

enum ExternalOutcome {
    Imported(Transaction),
    NotIncome,
}

fn external_transaction(row: ExternalPaymentRow) -> Result<ExternalOutcome, RejectedRow> {
    let fail = |reason: String| reject(TransactionSource::External, row.id.clone(), reason);

    let Some(id) = non_blank(row.id.clone()) else {
        return Err(fail("missing id".to_string()));
    };

    // The payments feed omits the type on ordinary income rows
    match non_blank(row.tipo.clone()) {
        None => {}
        Some(tipo) => match TransactionKind::parse(&tipo) {
            Some(TransactionKind::Income) => {}
            Some(TransactionKind::Expense) => return Ok(ExternalOutcome::NotIncome),
            None => return Err(fail(format!("unknown transaction type '{tipo}'"))),
        },
    }

    let amount = checked_amount(row.monto).map_err(&fail)?;
    let raw_date = non_blank(row.fecha.clone()).ok_or_else(|| fail("missing date".to_string()))?;
    let (date, stamp_time) =
        parse_external_date(&raw_date).ok_or_else(|| fail(format!("unparsable date '{raw_date}'")))?;
    let time = non_blank(row.hora.clone()).and_then(|h| parse_time(&h)).or(stamp_time);

    Ok(ExternalOutcome::Imported(Transaction {
        id,
        amount,
        date,
        time,
        kind: TransactionKind::Income,
        doctor: non_blank(row.doctor),
        patient: non_blank(row.paciente),
        treatment: non_blank(row.tratamiento),
        chair: non_blank(row.sillon),
        payment_method: non_blank(row.metodo_pago),
        invoice_number: non_blank(row.factura),
        status: non_blank(row.estado).map(|s| PaymentStatus::parse(&s)).unwrap_or_default(),
        source: TransactionSource::External,
        description: None,
        category: None,
    }))
}

/// Merge local rows and external payments into one newest-first list
pub fn reconcile(
    local: Vec<Decoded<TransactionRow>>,
    external: Vec<Decoded<ExternalPaymentRow>>,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    let shadowing: HashSet<String> = local
        .iter()
        .filter_map(|row| row.as_ref().ok())
        .filter_map(|row| non_blank(row.external_ref.clone()))
        .collect();

    for row in local {
        match row.map_err(|e| from_decode_error(TransactionSource::Local, e)).and_then(local_transaction) {
            Ok(tx) => result.transactions.push(tx),
            Err(rejected) => result.rejected.push(rejected),
        }
    }

    for row in external {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                result.rejected.push(from_decode_error(TransactionSource::External, e));
                continue;
            }
        };
        if row.id.as_ref().is_some_and(|id| shadowing.contains(id.trim())) {
            result.shadowed += 1;
            continue;
        }
        match external_transaction(row) {
            Ok(ExternalOutcome::Imported(tx)) => result.transactions.push(tx),
            Ok(ExternalOutcome::NotIncome) => result.skipped_non_income += 1,
            Err(rejected) => result.rejected.push(rejected),
        }
    }

    // Stable: equal timestamps keep local rows ahead of external ones
    result
        .transactions
        .sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));

    debug!(
        transactions = result.transactions.len(),
        rejected = result.rejected.len(),
        shadowed = result.shadowed,
        skipped_non_income = result.skipped_non_income,
        "Sources reconciled"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use database_layer::decode_rows;
    use serde_json::json;

    fn local_rows() -> Vec<Decoded<TransactionRow>> {
        decode_rows(
            "transactions",
            vec![
                json!({"id": "l1", "amount": "120", "date": "2026-10-03", "time": "09:15:00", "type": "income", "doctor": "Dra. Paez", "status": "pagado"}),
                json!({"id": "l2", "amount": "300", "date": "2026-10-08", "type": "expense", "category": "Arriendo"}),
                json!({"id": "l3", "amount": "95", "date": "2026-10-09", "type": "income", "external_ref": "902"}),
                json!({"id": "l4", "amount": "-5", "date": "2026-10-09", "type": "income"}),
                json!({"id": "l5", "amount": "5", "date": "2026-10-09", "type": "refund"}),
            ],
        )
    }

    fn external_rows() -> Vec<Decoded<ExternalPaymentRow>> {
        decode_rows(
            "external_payments",
            vec![
                json!({"id": 901, "monto": 60, "fecha": "2026-10-05T14:30:00", "tipo": "ingreso", "estado": "ABONO"}),
                json!({"id": 902, "monto": 90, "fecha": "2026-10-09", "tipo": "ingreso"}),
                json!({"id": 903, "monto": 40, "fecha": "2026-10-06", "tipo": "gasto"}),
                json!({"id": 904, "monto": 70, "fecha": "ayer"}),
                json!({"id": 905, "fecha": "2026-10-06"}),
                json!({"id": 906, "monto": 45, "fecha": "07/10/2026", "hora": "11:00"}),
            ],
        )
    }

    #[test]
    fn test_reconcile_counts() {
        let result = reconcile(local_rows(), external_rows());

        let ids: Vec<&str> = result.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["l3", "l2", "906", "901", "l1"]);
        assert_eq!(result.shadowed, 1);
        assert_eq!(result.skipped_non_income, 1);
        assert_eq!(result.rejected.len(), 4);
    }

    #[test]
    fn test_window_applies_to_parsed_dates() {
        let october_first_week = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 10, 7).unwrap(),
        };
        let result = reconcile(local_rows(), external_rows()).within(october_first_week);

        let ids: Vec<&str> = result.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["906", "901", "l1"]);
        assert_eq!(result.rejected.len(), 4);
    }

    #[test]
    fn test_external_fields_are_mapped() {
        let result = reconcile(Vec::new(), external_rows());

        let abono = result.transactions.iter().find(|t| t.id == "901").unwrap();
        assert_eq!(abono.status, PaymentStatus::Abono);
        assert_eq!(abono.time, NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(abono.source, TransactionSource::External);

        let slashed = result.transactions.iter().find(|t| t.id == "906").unwrap();
        assert_eq!(slashed.date, NaiveDate::from_ymd_opt(2026, 10, 7).unwrap());
        assert_eq!(slashed.time, NaiveTime::from_hms_opt(11, 0, 0));
        assert_eq!(slashed.status, PaymentStatus::Pagado);
    }

    #[test]
    fn test_rejections_carry_reasons() {
        let result = reconcile(local_rows(), external_rows());

        let reasons: Vec<(&str, &str)> = result
            .rejected
            .iter()
            .map(|r| (r.id.as_deref().unwrap_or("-"), r.reason.as_str()))
            .collect();
        assert!(reasons.iter().any(|(id, reason)| *id == "l4" && reason.contains("negative")));
        assert!(reasons.iter().any(|(id, reason)| *id == "l5" && reason.contains("refund")));
        assert!(reasons.iter().any(|(id, reason)| *id == "904" && reason.contains("ayer")));
        assert!(reasons.iter().any(|(id, reason)| *id == "905" && reason.contains("missing amount")));
    }
}
