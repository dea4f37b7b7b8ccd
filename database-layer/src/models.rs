// Backend row models, one per table
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Accept ids stored either as text/uuid or as integer identity columns
fn id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Row of the locally managed `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    #[serde(default, deserialize_with = "id_from_any", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// `income` / `expense` (Spanish `ingreso` / `gasto` accepted on read)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub chair: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Expense category (rent, supplies, payroll...)
    #[serde(default)]
    pub category: Option<String>,
    /// Id of the external payment this local record replaces
    #[serde(default)]
    pub external_ref: Option<String>,
}

/// Row of the `external_payments` table fed by the practice-management system
///
/// Column names follow the external system's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPaymentRow {
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: Option<String>,
    #[serde(default)]
    pub monto: Option<Decimal>,
    /// `YYYY-MM-DD` or an ISO timestamp
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub hora: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub paciente: Option<String>,
    #[serde(default)]
    pub tratamiento: Option<String>,
    #[serde(default)]
    pub sillon: Option<String>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub factura: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

/// Catalog entry (arancel) with public price and default chair time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRow {
    #[serde(default, deserialize_with = "id_from_any", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub price: Decimal,
}

/// Clinic-specific cost override keyed by normalized treatment name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentCostRow {
    pub treatment_key: String,
    #[serde(default)]
    pub treatment_name: Option<String>,
    #[serde(default)]
    pub supply_cost: Decimal,
    #[serde(default)]
    pub lab_cost: Decimal,
}

/// `(doctor, treatment|category|_default, rate %)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRuleRow {
    pub doctor: String,
    pub category: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfigRow {
    pub key: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRow {
    pub category: String,
    pub metric: String,
    pub target: Decimal,
}

/// A row that could not be decoded, kept for reporting instead of being dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDecodeError {
    pub table: String,
    pub id: Option<String>,
    pub reason: String,
}

pub type Decoded<T> = Result<T, RowDecodeError>;

/// Decode rows one by one so a single bad row does not fail the whole load
pub fn decode_rows<T: for<'de> Deserialize<'de>>(table: &str, rows: Vec<JsonValue>) -> Vec<Decoded<T>> {
    rows.into_iter()
        .map(|row| {
            let id = row.get("id").and_then(|v| match v {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            });
            serde_json::from_value(row).map_err(|e| RowDecodeError {
                table: table.to_string(),
                id,
                reason: e.to_string(),
            })
        })
        .collect()
}
