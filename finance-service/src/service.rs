use crate::aggregation::{aggregate_by_chair, aggregate_by_doctor, aggregate_by_treatment, summarize};
use crate::commission::CommissionResolver;
use crate::cost::{CostResolver, CostSource};
use crate::enrichment::Enricher;
use crate::error::{FinanceError, FinanceResult};
use crate::export::export_income_csv;
use crate::goals::{evaluate_goals, days_in_month, Alert, GoalProgress, MonthToDate};
use crate::matching::{AliasTable, TreatmentMatcher};
use crate::models::*;
use crate::normalize::normalize;
use crate::reconciliation::{reconcile, RejectedRow};
use chrono::{Datelike, NaiveDate, NaiveTime};
use config_engine::{EngineSettings, TableNames};
use database_layer::{
    CatalogRepository, CommissionRuleRow, DateRange, GoalRow, SettingsRepository, TableClient,
    TransactionRepository, TransactionRow, TreatmentCostRow,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError};

/// Reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month { year: i32, month: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn month(year: i32, month: u32) -> FinanceResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(FinanceError::Validation(format!("invalid month {year}-{month:02}")));
        }
        Ok(Self::Month { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse `YYYY-MM`
    pub fn parse_month(value: &str) -> FinanceResult<Self> {
        let invalid = || FinanceError::Validation(format!("expected YYYY-MM, got '{value}'"));
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::month(year, month)
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> FinanceResult<Self> {
        if end < start {
            return Err(FinanceError::Validation(format!("range end {end} is before start {start}")));
        }
        Ok(Self::Range { start, end })
    }

    pub fn bounds(&self) -> DateRange {
        match *self {
            Self::Month { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
                let end = start
                    .checked_add_days(chrono::Days::new(u64::from(days_in_month(year, month).saturating_sub(1))))
                    .unwrap_or(start);
                DateRange { start, end }
            }
            Self::Range { start, end } => DateRange { start, end },
        }
    }

    /// Progress through the period as of `today`
    pub fn month_to_date(&self, today: NaiveDate) -> MonthToDate {
        let bounds = self.bounds();
        MonthToDate::for_range(bounds.start, bounds.end, today)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
            Self::Range { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

fn non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

/// Input for a new local transaction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTransaction {
    #[validate(custom(function = "non_negative_amount"))]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub kind: TransactionKind,
    #[validate(length(min = 1, max = 120))]
    pub doctor: Option<String>,
    #[validate(length(min = 1, max = 160))]
    pub patient: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub treatment: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub chair: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub payment_method: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub invoice_number: Option<String>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    /// Id of the external payment this record supersedes
    pub external_ref: Option<String>,
}

impl NewTransaction {
    pub fn new(kind: TransactionKind, amount: Decimal, date: NaiveDate) -> Self {
        Self {
            amount,
            date,
            time: None,
            kind,
            doctor: None,
            patient: None,
            treatment: None,
            chair: None,
            payment_method: None,
            invoice_number: None,
            status: None,
            description: None,
            category: None,
            external_ref: None,
        }
    }

    fn into_row(self) -> TransactionRow {
        TransactionRow {
            id: None,
            amount: self.amount,
            date: self.date,
            time: self.time,
            kind: self.kind.as_str().to_string(),
            doctor: self.doctor,
            patient: self.patient,
            treatment: self.treatment,
            chair: self.chair,
            payment_method: self.payment_method,
            invoice_number: self.invoice_number,
            status: Some(self.status.unwrap_or_default().to_string()),
            description: self.description,
            category: self.category,
            external_ref: self.external_ref,
        }
    }
}

/// Partial edit of a local transaction; unset fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TransactionPatch {
    #[validate(custom(function = "non_negative_amount"))]
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub kind: Option<TransactionKind>,
    #[validate(length(min = 1, max = 120))]
    pub doctor: Option<String>,
    #[validate(length(min = 1, max = 160))]
    pub patient: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub treatment: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub chair: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub payment_method: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub invoice_number: Option<String>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.to_json().as_object().map_or(true, Map::is_empty)
    }

    fn to_json(&self) -> JsonValue {
        let mut patch = Map::new();
        let mut put = |column: &str, value: Option<JsonValue>| {
            if let Some(value) = value {
                patch.insert(column.to_string(), value);
            }
        };
        put("amount", self.amount.map(|a| JsonValue::String(a.to_string())));
        put("date", self.date.map(|d| JsonValue::String(d.to_string())));
        put("time", self.time.map(|t| JsonValue::String(t.format("%H:%M:%S").to_string())));
        put("type", self.kind.map(|k| JsonValue::String(k.as_str().to_string())));
        put("doctor", self.doctor.clone().map(JsonValue::String));
        put("patient", self.patient.clone().map(JsonValue::String));
        put("treatment", self.treatment.clone().map(JsonValue::String));
        put("chair", self.chair.clone().map(JsonValue::String));
        put("payment_method", self.payment_method.clone().map(JsonValue::String));
        put("invoice_number", self.invoice_number.clone().map(JsonValue::String));
        put("status", self.status.as_ref().map(|s| JsonValue::String(s.to_string())));
        put("description", self.description.clone().map(JsonValue::String));
        put("category", self.category.clone().map(JsonValue::String));
        JsonValue::Object(patch)
    }
}

/// Everything one computation needs, loaded fresh from the backend
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
    pub shadowed: usize,
    pub skipped_non_income: usize,
    pub treatments: Vec<Treatment>,
    pub costs: Vec<TreatmentCost>,
    pub rules: Vec<CommissionRule>,
    pub config: ClinicConfig,
    pub goals: Goals,
}

/// Record flagged for manual review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub id: String,
    pub date: NaiveDate,
    pub treatment: Option<String>,
    pub match_quality: MatchQuality,
}

/// Data-quality findings that were defaulted rather than failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub cost_source: CostSource,
    pub cost_per_minute: Decimal,
    pub alias_version: u32,
    pub fallback_commissions: usize,
    pub needs_review: Vec<ReviewItem>,
    pub rejected: Vec<RejectedRow>,
    pub shadowed: usize,
    pub skipped_non_income: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub period: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub as_of: NaiveDate,
    pub summary: FinancialSummary,
    pub chairs: Vec<ChairSummary>,
    pub doctors: Vec<DoctorSummary>,
    pub treatments: Vec<TreatmentSummary>,
    pub goals: Vec<GoalProgress>,
    pub alerts: Vec<Alert>,
    pub data_quality: DataQuality,
}

/// Finance service: loads the clinic tables and recomputes every view on demand
#[derive(Clone)]
pub struct FinanceService {
    transactions: TransactionRepository,
    catalog: CatalogRepository,
    settings: SettingsRepository,
    engine: EngineSettings,
    aliases: AliasTable,
}

impl FinanceService {
    /// Create a new finance service over a table client
    pub fn new(client: Arc<dyn TableClient>, tables: &TableNames, engine: EngineSettings) -> Self {
        Self {
            transactions: TransactionRepository::new(client.clone(), &tables.transactions, &tables.external_payments),
            catalog: CatalogRepository::new(client.clone(), &tables.treatments, &tables.treatment_costs),
            settings: SettingsRepository::new(client, &tables.commission_rules, &tables.clinic_config, &tables.goals),
            engine,
            aliases: AliasTable::builtin(),
        }
    }

    /// Replace the built-in alias table
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn engine(&self) -> &EngineSettings {
        &self.engine
    }

    /// Fetch all seven tables concurrently and reconcile the two transaction sources
    #[instrument(skip(self))]
    pub async fn load_snapshot(&self, range: Option<DateRange>) -> FinanceResult<Snapshot> {
        let (local, external, treatments, costs, rules, config, goals) = tokio::try_join!(
            self.transactions.list_local(range),
            self.transactions.list_external(),
            self.catalog.list_treatments(),
            self.catalog.list_treatment_costs(),
            self.settings.list_commission_rules(),
            self.settings.list_config(),
            self.settings.list_goals(),
        )?;

        let reconciliation = reconcile(local, external);
        let reconciliation = match range {
            Some(range) => reconciliation.within(range),
            None => reconciliation,
        };

        let goals = goals.into_iter().filter_map(|row| {
            match (GoalCategory::parse(&row.category), GoalMetric::parse(&row.metric)) {
                (Some(category), Some(metric)) => Some(Goal {
                    category,
                    metric,
                    target: row.target,
                }),
                _ => {
                    warn!(category = %row.category, metric = %row.metric, "Ignoring unknown goal");
                    None
                }
            }
        });

        info!(
            transactions = reconciliation.transactions.len(),
            treatments = treatments.len(),
            rules = rules.len(),
            "Snapshot loaded"
        );

        Ok(Snapshot {
            transactions: reconciliation.transactions,
            rejected: reconciliation.rejected,
            shadowed: reconciliation.shadowed,
            skipped_non_income: reconciliation.skipped_non_income,
            treatments: treatments.into_iter().map(Treatment::from).collect(),
            costs: costs.into_iter().map(TreatmentCost::from).collect(),
            rules: rules.into_iter().map(CommissionRule::from).collect(),
            config: config.into_iter().collect(),
            goals: Goals::new(goals),
        })
    }

    /// Build the enricher over a snapshot's reference data
    pub fn enricher(&self, snapshot: &Snapshot) -> Enricher {
        Enricher::new(
            TreatmentMatcher::new(snapshot.treatments.clone(), snapshot.costs.clone(), self.aliases.clone()),
            CommissionResolver::new(&snapshot.rules, self.engine.fallback_commission_rate),
            CostResolver::from_config(&snapshot.config, self.engine.fallback_cost_per_minute),
            self.engine.clone(),
        )
    }

    /// Recompute the full dashboard for a period
    #[instrument(skip(self, period), fields(period = %period))]
    pub async fn dashboard(&self, period: Period, today: NaiveDate) -> FinanceResult<DashboardReport> {
        let bounds = period.bounds();
        let snapshot = self.load_snapshot(Some(bounds)).await?;
        let enricher = self.enricher(&snapshot);
        let enriched = enricher.enrich_all(&snapshot.transactions);

        let summary = summarize(&snapshot.transactions, &enriched);
        let chairs = aggregate_by_chair(&enriched, self.engine.chair_hours_per_transaction);
        let doctors = aggregate_by_doctor(&enriched);
        let treatments = aggregate_by_treatment(&enriched);
        let evaluation = evaluate_goals(
            summary.total_income,
            summary.total_utility,
            &chairs,
            &snapshot.goals,
            period.month_to_date(today),
        );

        let data_quality = DataQuality {
            cost_source: enricher.costs().source(),
            cost_per_minute: enricher.costs().cost_per_minute(),
            alias_version: enricher.matcher().aliases().version(),
            fallback_commissions: enriched
                .iter()
                .filter(|r| r.commission_source == RateSource::Fallback)
                .count(),
            needs_review: enriched
                .iter()
                .filter(|r| r.needs_review)
                .map(|r| ReviewItem {
                    id: r.transaction.id.clone(),
                    date: r.transaction.date,
                    treatment: r.transaction.treatment_text().map(str::to_string),
                    match_quality: r.match_quality,
                })
                .collect(),
            rejected: snapshot.rejected,
            shadowed: snapshot.shadowed,
            skipped_non_income: snapshot.skipped_non_income,
        };
        report_data_quality(&data_quality);

        info!(
            income = %summary.total_income,
            utility = %summary.total_utility,
            alerts = evaluation.alerts.len(),
            "Dashboard computed"
        );

        Ok(DashboardReport {
            period: period.to_string(),
            start: bounds.start,
            end: bounds.end,
            as_of: today,
            summary,
            chairs,
            doctors,
            treatments,
            goals: evaluation.progress,
            alerts: evaluation.alerts,
            data_quality,
        })
    }

    /// Reconciled transactions of a period, newest first
    pub async fn list_transactions(&self, period: Period) -> FinanceResult<Vec<Transaction>> {
        let bounds = period.bounds();
        let (local, external) = tokio::try_join!(
            self.transactions.list_local(Some(bounds)),
            self.transactions.list_external(),
        )?;
        let reconciliation = reconcile(local, external).within(bounds);
        for rejected in &reconciliation.rejected {
            warn!(source = rejected.source.as_str(), id = ?rejected.id, reason = %rejected.reason, "Row rejected");
        }
        Ok(reconciliation.transactions)
    }

    #[instrument(skip(self, input), fields(kind = input.kind.as_str()))]
    pub async fn create_transaction(&self, input: NewTransaction) -> FinanceResult<Transaction> {
        input.validate()?;
        let stored = self.transactions.insert(&input.into_row()).await?;
        let id = stored
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| FinanceError::Validation("insert returned no transaction id".to_string()))?;
        info!(id = %id, "Transaction created");
        self.local_by_id(&id).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update_transaction(&self, id: &str, patch: TransactionPatch) -> FinanceResult<Transaction> {
        patch.validate()?;
        self.ensure_local(id).await?;
        if patch.is_empty() {
            return self.local_by_id(id).await;
        }
        self.transactions.update(id, patch.to_json()).await?;
        info!(id, "Transaction updated");
        self.local_by_id(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_transaction(&self, id: &str) -> FinanceResult<()> {
        self.ensure_local(id).await?;
        self.transactions.delete(id).await?;
        info!(id, "Transaction deleted");
        Ok(())
    }

    async fn ensure_local(&self, id: &str) -> FinanceResult<()> {
        if self.transactions.get_local(id).await?.is_some() {
            return Ok(());
        }
        if self.transactions.is_external(id).await? {
            warn!(id, "Refusing to modify an external transaction");
            return Err(FinanceError::ReadOnly(id.to_string()));
        }
        Err(FinanceError::NotFound(format!("transaction {id}")))
    }

    async fn local_by_id(&self, id: &str) -> FinanceResult<Transaction> {
        let row = self
            .transactions
            .get_local(id)
            .await?
            .ok_or_else(|| FinanceError::NotFound(format!("transaction {id}")))?;
        let reconciliation = reconcile(vec![Ok(row)], Vec::new());
        match (reconciliation.transactions.into_iter().next(), reconciliation.rejected.into_iter().next()) {
            (Some(tx), _) => Ok(tx),
            (None, Some(rejected)) => Err(FinanceError::Validation(rejected.reason)),
            (None, None) => Err(FinanceError::NotFound(format!("transaction {id}"))),
        }
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub async fn commission_rules(&self) -> FinanceResult<Vec<CommissionRule>> {
        Ok(self
            .settings
            .list_commission_rules()
            .await?
            .into_iter()
            .map(CommissionRule::from)
            .collect())
    }

    /// Set a doctor's rate (percent) for a treatment, a category or `_default`
    #[instrument(skip(self))]
    pub async fn set_commission_rule(&self, doctor: &str, key: &str, rate_percent: Decimal) -> FinanceResult<CommissionRule> {
        let (doctor, key) = (doctor.trim(), key.trim());
        if doctor.is_empty() || key.is_empty() {
            return Err(FinanceError::Validation("doctor and rule key are required".to_string()));
        }
        if rate_percent < Decimal::ZERO || rate_percent > Decimal::ONE_HUNDRED {
            return Err(FinanceError::Validation(format!(
                "commission rate must be within 0-100, got {rate_percent}"
            )));
        }
        // Replace every spelling that resolves to this doctor and key
        for stale in self.matching_rules(doctor, key).await? {
            self.settings
                .delete_commission_rule(&stale.doctor, &stale.category)
                .await?;
        }
        let stored = self
            .settings
            .upsert_commission_rule(&CommissionRuleRow {
                doctor: doctor.to_string(),
                category: key.to_string(),
                rate: rate_percent,
            })
            .await?;
        info!(doctor, key, rate = %rate_percent, "Commission rule saved");
        Ok(stored.into())
    }

    /// Returns whether a rule was removed
    pub async fn remove_commission_rule(&self, doctor: &str, key: &str) -> FinanceResult<bool> {
        let mut removed = 0;
        for rule in self.matching_rules(doctor, key).await? {
            removed += self
                .settings
                .delete_commission_rule(&rule.doctor, &rule.category)
                .await?;
        }
        info!(doctor, key, removed, "Commission rule removed");
        Ok(removed > 0)
    }

    /// Stored rules the resolver would read as `(doctor, key)`
    async fn matching_rules(&self, doctor: &str, key: &str) -> FinanceResult<Vec<CommissionRuleRow>> {
        let (doctor, key) = (normalize(doctor), normalize(key));
        Ok(self
            .settings
            .list_commission_rules()
            .await?
            .into_iter()
            .filter(|rule| normalize(&rule.doctor) == doctor && normalize(&rule.category) == key)
            .collect())
    }

    /// Store supply and lab costs for a treatment under its normalized name
    #[instrument(skip(self))]
    pub async fn upsert_treatment_cost(&self, name: &str, supply_cost: Decimal, lab_cost: Decimal) -> FinanceResult<TreatmentCost> {
        let key = self.aliases.key_for(name);
        if key.is_empty() {
            return Err(FinanceError::Validation("treatment name is required".to_string()));
        }
        if supply_cost < Decimal::ZERO || lab_cost < Decimal::ZERO {
            return Err(FinanceError::Validation("costs cannot be negative".to_string()));
        }
        let stored = self
            .catalog
            .upsert_treatment_cost(&TreatmentCostRow {
                treatment_key: key,
                treatment_name: Some(name.trim().to_string()),
                supply_cost,
                lab_cost,
            })
            .await?;
        Ok(stored.into())
    }

    pub async fn clinic_config(&self) -> FinanceResult<ClinicConfig> {
        Ok(self.settings.list_config().await?.into_iter().collect())
    }

    pub async fn set_config_value(&self, key: &str, value: Decimal) -> FinanceResult<()> {
        let key = ClinicConfig::canonical_key(key);
        if key.is_empty() {
            return Err(FinanceError::Validation("config key is required".to_string()));
        }
        if value < Decimal::ZERO {
            return Err(FinanceError::Validation(format!("{key} cannot be negative")));
        }
        self.settings.set_config_value(&key, value).await?;
        info!(key = %key, value = %value, "Clinic config updated");
        Ok(())
    }

    /// Configured goals merged with the defaults
    pub async fn goals(&self) -> FinanceResult<Goals> {
        let rows = self.settings.list_goals().await?;
        Ok(Goals::new(rows.into_iter().filter_map(|row| {
            Some(Goal {
                category: GoalCategory::parse(&row.category)?,
                metric: GoalMetric::parse(&row.metric)?,
                target: row.target,
            })
        })))
    }

    pub async fn set_goal(&self, category: GoalCategory, metric: GoalMetric, target: Decimal) -> FinanceResult<Goal> {
        if target < Decimal::ZERO {
            return Err(FinanceError::Validation("goal target cannot be negative".to_string()));
        }
        self.settings
            .upsert_goal(&GoalRow {
                category: category.as_str().to_string(),
                metric: metric.as_str().to_string(),
                target,
            })
            .await?;
        info!(category = category.as_str(), metric = metric.as_str(), target = %target, "Goal saved");
        Ok(Goal {
            category,
            metric,
            target,
        })
    }

    /// Write the period's income listing as CSV; returns the number of rows
    pub async fn export_income_csv<W: Write>(&self, period: Period, writer: W) -> FinanceResult<usize> {
        let transactions = self.list_transactions(period).await?;
        let written = export_income_csv(&transactions, writer)?;
        info!(period = %period, rows = written, "Income exported");
        Ok(written)
    }
}

fn report_data_quality(quality: &DataQuality) {
    if quality.cost_source == CostSource::Fallback {
        warn!(
            cost_per_minute = %quality.cost_per_minute,
            "Fixed costs or operational hours not configured, using fallback overhead rate"
        );
    }
    if quality.fallback_commissions > 0 {
        warn!(count = quality.fallback_commissions, "Transactions using the fallback commission rate");
    }
    for item in &quality.needs_review {
        warn!(id = %item.id, treatment = ?item.treatment, quality = ?item.match_quality, "Treatment needs review");
    }
    for rejected in &quality.rejected {
        warn!(source = rejected.source.as_str(), id = ?rejected.id, reason = %rejected.reason, "Row rejected");
    }
}
