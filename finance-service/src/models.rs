use crate::normalize::normalize;
use chrono::{NaiveDate, NaiveTime};
use database_layer::{ClinicConfigRow, CommissionRuleRow, TreatmentCostRow, TreatmentRow};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Accepts the English column values and the Spanish ones used by the external system
    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "income" | "ingreso" => Some(Self::Income),
            "expense" | "gasto" | "egreso" => Some(Self::Expense),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// Payment status as recorded by reception
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    #[default]
    Pagado,
    /// Paid off
    Cancelado,
    Completado,
    /// Partial payment
    Abono,
    Pendiente,
    /// Voided
    Anulado,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(value: &str) -> Self {
        match normalize(value).as_str() {
            "pagado" | "paid" => Self::Pagado,
            "cancelado" => Self::Cancelado,
            "completado" | "completed" => Self::Completado,
            "abono" | "partial" => Self::Abono,
            "pendiente" | "pending" => Self::Pendiente,
            "anulado" | "void" | "voided" => Self::Anulado,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    /// Paid in full; only these count towards doctor performance
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Pagado | Self::Cancelado | Self::Completado)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pagado => f.write_str("PAGADO"),
            Self::Cancelado => f.write_str("CANCELADO"),
            Self::Completado => f.write_str("COMPLETADO"),
            Self::Abono => f.write_str("ABONO"),
            Self::Pendiente => f.write_str("PENDIENTE"),
            Self::Anulado => f.write_str("ANULADO"),
            Self::Other(raw) => f.write_str(&raw.to_uppercase()),
        }
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::parse(&String::deserialize(deserializer)?))
    }
}

/// Which table a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    Local,
    External,
}

impl TransactionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

/// Income or expense record merged from both sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub kind: TransactionKind,
    pub doctor: Option<String>,
    pub patient: Option<String>,
    pub treatment: Option<String>,
    pub chair: Option<String>,
    pub payment_method: Option<String>,
    pub invoice_number: Option<String>,
    pub status: PaymentStatus,
    pub source: TransactionSource,
    pub description: Option<String>,
    /// Expense category
    pub category: Option<String>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    /// External records cannot be edited or deleted
    pub fn is_editable(&self) -> bool {
        self.source == TransactionSource::Local
    }

    /// Free text used to find the catalog treatment
    pub fn treatment_text(&self) -> Option<&str> {
        self.treatment
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.description.as_deref().filter(|d| !d.trim().is_empty()))
    }
}

/// Catalog entry (arancel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub name: String,
    pub category: Option<String>,
    pub duration_minutes: Option<u32>,
    pub price: Decimal,
}

impl From<TreatmentRow> for Treatment {
    fn from(row: TreatmentRow) -> Self {
        Self {
            name: row.name,
            category: row.category.filter(|c| !c.trim().is_empty()),
            duration_minutes: row.duration_minutes.filter(|d| *d > 0),
            price: row.price,
        }
    }
}

/// Clinic-specific cost override, keyed by normalized treatment name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentCost {
    pub key: String,
    pub supply_cost: Decimal,
    pub lab_cost: Decimal,
}

impl From<TreatmentCostRow> for TreatmentCost {
    fn from(row: TreatmentCostRow) -> Self {
        Self {
            key: normalize(&row.treatment_key),
            supply_cost: row.supply_cost,
            lab_cost: row.lab_cost,
        }
    }
}

/// `(doctor, treatment|category|_default)` commission in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub doctor: String,
    pub key: String,
    pub rate_percent: Decimal,
}

impl From<CommissionRuleRow> for CommissionRule {
    fn from(row: CommissionRuleRow) -> Self {
        Self {
            doctor: row.doctor,
            key: row.category,
            rate_percent: row.rate,
        }
    }
}

/// Monthly fixed costs and operating hours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfig {
    values: BTreeMap<String, Decimal>,
}

impl ClinicConfig {
    /// Explicit fixed-cost total; wins over the sum of individual keys
    pub const FIXED_COSTS_MONTHLY: &'static str = "FIXED_COSTS_MONTHLY";
    pub const OPERATIONAL_HOURS_MONTHLY: &'static str = "OPERATIONAL_HOURS_MONTHLY";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: Decimal) {
        self.values.insert(Self::canonical_key(key), value);
    }

    pub fn with(mut self, key: &str, value: Decimal) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.values.get(&Self::canonical_key(key)).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keys are stored upper-case with spaces and dashes as underscores
    pub fn canonical_key(key: &str) -> String {
        key.trim().to_uppercase().replace([' ', '-'], "_")
    }

    pub fn fixed_costs_monthly(&self) -> Option<Decimal> {
        if let Some(total) = self.get(Self::FIXED_COSTS_MONTHLY) {
            return Some(total);
        }
        let mut parts = self
            .values
            .iter()
            .filter(|(k, _)| k.as_str() != Self::OPERATIONAL_HOURS_MONTHLY)
            .map(|(_, v)| *v)
            .peekable();
        parts.peek()?;
        Some(parts.sum())
    }

    pub fn operational_hours_monthly(&self) -> Option<Decimal> {
        self.get(Self::OPERATIONAL_HOURS_MONTHLY)
    }
}

impl FromIterator<ClinicConfigRow> for ClinicConfig {
    fn from_iter<I: IntoIterator<Item = ClinicConfigRow>>(rows: I) -> Self {
        let mut config = Self::new();
        for row in rows {
            config.set(&row.key, row.value);
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoalCategory {
    Billing,
    Utility,
    Chair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GoalMetric {
    Monthly,
    Daily,
}

impl GoalCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "billing" | "facturacion" => Some(Self::Billing),
            "utility" | "utilidad" => Some(Self::Utility),
            "chair" | "sillon" => Some(Self::Chair),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "BILLING",
            Self::Utility => "UTILITY",
            Self::Chair => "CHAIR",
        }
    }
}

impl GoalMetric {
    pub fn parse(value: &str) -> Option<Self> {
        match normalize(value).as_str() {
            "monthly" | "mensual" => Some(Self::Monthly),
            "daily" | "diario" => Some(Self::Daily),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Daily => "DAILY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub category: GoalCategory,
    pub metric: GoalMetric,
    pub target: Decimal,
}

/// Configured goals with built-in defaults for the ones that are unset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Goals {
    configured: BTreeMap<(GoalCategory, GoalMetric), Decimal>,
}

impl Goals {
    pub fn new(goals: impl IntoIterator<Item = Goal>) -> Self {
        Self {
            configured: goals
                .into_iter()
                .map(|g| ((g.category, g.metric), g.target))
                .collect(),
        }
    }

    pub fn default_target(category: GoalCategory, metric: GoalMetric) -> Option<Decimal> {
        match (category, metric) {
            (GoalCategory::Billing, GoalMetric::Monthly) => Some(Decimal::new(30_000, 0)),
            (GoalCategory::Utility, GoalMetric::Monthly) => Some(Decimal::new(12_000, 0)),
            (GoalCategory::Chair, GoalMetric::Daily) => Some(Decimal::new(150, 0)),
            _ => None,
        }
    }

    pub fn target(&self, category: GoalCategory, metric: GoalMetric) -> Option<Decimal> {
        self.configured
            .get(&(category, metric))
            .copied()
            .or_else(|| Self::default_target(category, metric))
    }

    /// Every goal with a target, configured or default
    pub fn all(&self) -> Vec<Goal> {
        let mut keys: Vec<(GoalCategory, GoalMetric)> = self.configured.keys().copied().collect();
        for category in [GoalCategory::Billing, GoalCategory::Utility, GoalCategory::Chair] {
            for metric in [GoalMetric::Monthly, GoalMetric::Daily] {
                if Self::default_target(category, metric).is_some() && !keys.contains(&(category, metric)) {
                    keys.push((category, metric));
                }
            }
        }
        keys.sort();
        keys.into_iter()
            .filter_map(|(category, metric)| {
                self.target(category, metric).map(|target| Goal {
                    category,
                    metric,
                    target,
                })
            })
            .collect()
    }
}

/// How the free-text treatment was resolved against the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Exact,
    Alias,
    Substring,
    Ambiguous,
    Unmatched,
}

impl MatchQuality {
    pub fn needs_review(self) -> bool {
        matches!(self, Self::Ambiguous | Self::Unmatched)
    }
}

/// Which rule produced a commission rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Treatment,
    Category,
    DoctorDefault,
    Fallback,
}

/// Income transaction with its derived costs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTransaction {
    pub transaction: Transaction,
    pub matched_treatment: Option<String>,
    /// Catalog category of the matched treatment
    pub category: Option<String>,
    pub match_quality: MatchQuality,
    pub commission_rate: Decimal,
    pub commission_source: RateSource,
    pub commission_amount: Decimal,
    pub supplies_cost: Decimal,
    pub lab_cost: Decimal,
    pub duration_minutes: u32,
    pub operational_cost: Decimal,
    pub net_utility: Decimal,
    pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChairSummary {
    pub chair: String,
    pub billing: Decimal,
    pub commission: Decimal,
    pub utility: Decimal,
    pub count: usize,
    pub hours: Decimal,
    pub revenue_per_hour: Decimal,
}

/// Doctor performance over settled income (aporte neto)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorSummary {
    pub doctor: String,
    pub billing: Decimal,
    pub commission: Decimal,
    pub operational_cost: Decimal,
    pub net_contribution: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentSummary {
    pub treatment: String,
    pub count: usize,
    pub price: Decimal,
    pub commission: Decimal,
    pub supplies: Decimal,
    pub operational_cost: Decimal,
    pub utility: Decimal,
    pub margin_percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_cash: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
    pub average_ticket: Decimal,
    pub total_commission: Decimal,
    pub total_utility: Decimal,
    pub income_by_method: BTreeMap<String, Decimal>,
    pub expenses_by_category: BTreeMap<String, Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_and_settlement() {
        assert_eq!(PaymentStatus::parse("PAGADO"), PaymentStatus::Pagado);
        assert_eq!(PaymentStatus::parse(" cancelado "), PaymentStatus::Cancelado);
        assert_eq!(PaymentStatus::parse("Abono"), PaymentStatus::Abono);
        assert_eq!(PaymentStatus::parse("en revisión"), PaymentStatus::Other("en revisión".to_string()));

        assert!(PaymentStatus::Cancelado.is_settled());
        assert!(PaymentStatus::Completado.is_settled());
        assert!(!PaymentStatus::Abono.is_settled());
        assert!(!PaymentStatus::Anulado.is_settled());
        assert_eq!(PaymentStatus::Other("en revisión".to_string()).to_string(), "EN REVISIÓN");
    }

    #[test]
    fn test_kind_accepts_spanish() {
        assert_eq!(TransactionKind::parse("Ingreso"), Some(TransactionKind::Income));
        assert_eq!(TransactionKind::parse("gasto"), Some(TransactionKind::Expense));
        assert_eq!(TransactionKind::parse("transfer"), None);
    }

    #[test]
    fn test_explicit_fixed_costs_win() {
        let config = ClinicConfig::new()
            .with("rent", Decimal::new(1200, 0))
            .with("salaries", Decimal::new(3000, 0))
            .with("OPERATIONAL_HOURS_MONTHLY", Decimal::new(160, 0));
        assert_eq!(config.fixed_costs_monthly(), Some(Decimal::new(4200, 0)));

        let config = config.with("fixed costs monthly", Decimal::new(2000, 0));
        assert_eq!(config.fixed_costs_monthly(), Some(Decimal::new(2000, 0)));
        assert_eq!(config.operational_hours_monthly(), Some(Decimal::new(160, 0)));
    }

    #[test]
    fn test_hours_alone_are_not_fixed_costs() {
        let config = ClinicConfig::new().with("OPERATIONAL_HOURS_MONTHLY", Decimal::new(160, 0));
        assert_eq!(config.fixed_costs_monthly(), None);
    }

    #[test]
    fn test_goal_defaults() {
        let goals = Goals::new(vec![Goal {
            category: GoalCategory::Billing,
            metric: GoalMetric::Monthly,
            target: Decimal::new(25_000, 0),
        }]);

        assert_eq!(goals.target(GoalCategory::Billing, GoalMetric::Monthly), Some(Decimal::new(25_000, 0)));
        assert_eq!(goals.target(GoalCategory::Utility, GoalMetric::Monthly), Some(Decimal::new(12_000, 0)));
        assert_eq!(goals.target(GoalCategory::Chair, GoalMetric::Daily), Some(Decimal::new(150, 0)));
        assert_eq!(goals.target(GoalCategory::Chair, GoalMetric::Monthly), None);
        assert_eq!(goals.all().len(), 3);
    }

    #[test]
    fn test_treatment_text_falls_back_to_description() {
        let tx = Transaction {
            id: "t1".to_string(),
            amount: Decimal::new(50, 0),
            date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            time: None,
            kind: TransactionKind::Income,
            doctor: None,
            patient: None,
            treatment: Some(" ".to_string()),
            chair: None,
            payment_method: None,
            invoice_number: None,
            status: PaymentStatus::Pagado,
            source: TransactionSource::Local,
            description: Some("Profilaxis".to_string()),
            category: None,
        };
        assert_eq!(tx.treatment_text(), Some("Profilaxis"));
    }
}
