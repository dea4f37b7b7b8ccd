// Per-transaction cost and profitability enrichment
use crate::commission::CommissionResolver;
use crate::cost::CostResolver;
use crate::matching::TreatmentMatcher;
use crate::models::{EnrichedTransaction, MatchQuality, Transaction};
use config_engine::EngineSettings;
use rust_decimal::Decimal;

/// Pure enrichment over reference data captured at construction
#[derive(Debug, Clone)]
pub struct Enricher {
    matcher: TreatmentMatcher,
    commissions: CommissionResolver,
    costs: CostResolver,
    engine: EngineSettings,
}

impl Enricher {
    pub fn new(
        matcher: TreatmentMatcher,
        commissions: CommissionResolver,
        costs: CostResolver,
        engine: EngineSettings,
    ) -> Self {
        Self {
            matcher,
            commissions,
            costs,
            engine,
        }
    }

    pub fn matcher(&self) -> &TreatmentMatcher {
        &self.matcher
    }

    pub fn costs(&self) -> &CostResolver {
        &self.costs
    }

    /// Derive commission, supplies, lab, overhead and net utility; `None` for expenses
    pub fn enrich(&self, tx: &Transaction) -> Option<EnrichedTransaction> {
        if !tx.is_income() {
            return None;
        }

        let raw_treatment = tx.treatment_text();
        let found = raw_treatment.map(|text| self.matcher.find(text));
        let entry = found.as_ref().and_then(|m| m.treatment);
        let match_quality = found.as_ref().map_or(MatchQuality::Unmatched, |m| m.quality);

        let matched_name = entry.map(|e| e.treatment.name.clone());
        let category = entry.and_then(|e| e.treatment.category.clone());
        let cost = entry.and_then(|e| e.cost.as_ref());

        let resolved = self.commissions.resolve(
            tx.doctor.as_deref(),
            category.as_deref(),
            matched_name.as_deref().or(raw_treatment),
        );

        let amount = tx.amount;
        let commission_amount = amount * resolved.rate;

        let supplies_cost = match cost {
            Some(cost) if self.engine.prefer_recorded_supply_cost && cost.supply_cost > Decimal::ZERO => {
                cost.supply_cost
            }
            _ => amount * self.engine.supply_cost_rate,
        };
        let lab_cost = cost.map_or(Decimal::ZERO, |c| c.lab_cost);

        let duration_minutes = entry
            .and_then(|e| e.treatment.duration_minutes)
            .unwrap_or(self.engine.default_treatment_minutes);
        let operational_cost = self.costs.operational_cost(duration_minutes);

        let net_utility = (amount - commission_amount - supplies_cost - lab_cost - operational_cost)
            .clamp(Decimal::ZERO, amount.max(Decimal::ZERO));

        Some(EnrichedTransaction {
            transaction: tx.clone(),
            matched_treatment: matched_name,
            category,
            match_quality,
            commission_rate: resolved.rate,
            commission_source: resolved.source,
            commission_amount,
            supplies_cost,
            lab_cost,
            duration_minutes,
            operational_cost,
            net_utility,
            needs_review: match_quality.needs_review(),
        })
    }

    pub fn enrich_all(&self, transactions: &[Transaction]) -> Vec<EnrichedTransaction> {
        transactions.iter().filter_map(|tx| self.enrich(tx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::DEFAULT_RULE_KEY;
    use crate::matching::AliasTable;
    use crate::models::*;
    use chrono::NaiveDate;

    fn income(amount: i64, doctor: &str, treatment: &str) -> Transaction {
        Transaction {
            id: "t1".to_string(),
            amount: Decimal::new(amount, 0),
            date: NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(),
            time: None,
            kind: TransactionKind::Income,
            doctor: Some(doctor.to_string()),
            patient: None,
            treatment: Some(treatment.to_string()),
            chair: Some("Sillón 1".to_string()),
            payment_method: None,
            invoice_number: None,
            status: PaymentStatus::Pagado,
            source: TransactionSource::Local,
            description: None,
            category: None,
        }
    }

    fn enricher(engine: EngineSettings) -> Enricher {
        let matcher = TreatmentMatcher::new(
            vec![
                Treatment {
                    name: "Corona".to_string(),
                    category: Some("Rehabilitación".to_string()),
                    duration_minutes: Some(60),
                    price: Decimal::new(400, 0),
                },
                Treatment {
                    name: "Profilaxis".to_string(),
                    category: Some("Preventiva".to_string()),
                    duration_minutes: None,
                    price: Decimal::new(35, 0),
                },
            ],
            vec![TreatmentCost {
                key: "corona".to_string(),
                supply_cost: Decimal::new(30, 0),
                lab_cost: Decimal::new(120, 0),
            }],
            AliasTable::builtin(),
        );
        let commissions = CommissionResolver::new(
            &[CommissionRule {
                doctor: "Dra. Paez".to_string(),
                key: DEFAULT_RULE_KEY.to_string(),
                rate_percent: Decimal::new(30, 0),
            }],
            engine.fallback_commission_rate,
        );
        let config = ClinicConfig::new()
            .with(ClinicConfig::FIXED_COSTS_MONTHLY, Decimal::new(2000, 0))
            .with(ClinicConfig::OPERATIONAL_HOURS_MONTHLY, Decimal::new(160, 0));
        let costs = CostResolver::from_config(&config, engine.fallback_cost_per_minute);
        Enricher::new(matcher, commissions, costs, engine)
    }

    #[test]
    fn test_enrich_matched_treatment() {
        let enricher = enricher(EngineSettings::default());
        let enriched = enricher.enrich(&income(400, "Dra. Paez", "corona")).unwrap();

        assert_eq!(enriched.matched_treatment.as_deref(), Some("Corona"));
        assert_eq!(enriched.commission_amount, Decimal::new(120, 0));
        assert_eq!(enriched.supplies_cost, Decimal::new(60, 0));
        assert_eq!(enriched.lab_cost, Decimal::new(120, 0));
        assert_eq!(enriched.duration_minutes, 60);
        assert_eq!(enriched.operational_cost, Decimal::new(125, 1));
        // 400 - 120 - 60 - 120 - 12.5
        assert_eq!(enriched.net_utility, Decimal::new(875, 1));
        assert!(!enriched.needs_review);
    }

    #[test]
    fn test_recorded_supply_cost_when_preferred() {
        let engine = EngineSettings {
            prefer_recorded_supply_cost: true,
            ..Default::default()
        };
        let enriched = enricher(engine).enrich(&income(400, "Dra. Paez", "Corona")).unwrap();
        assert_eq!(enriched.supplies_cost, Decimal::new(30, 0));
    }

    #[test]
    fn test_unmatched_uses_defaults_and_flags_review() {
        let enricher = enricher(EngineSettings::default());
        let enriched = enricher.enrich(&income(100, "Dr. Vera", "Endodoncia")).unwrap();

        assert_eq!(enriched.match_quality, MatchQuality::Unmatched);
        assert!(enriched.needs_review);
        assert_eq!(enriched.commission_rate, Decimal::new(33, 2));
        assert_eq!(enriched.commission_source, RateSource::Fallback);
        assert_eq!(enriched.duration_minutes, 30);
        assert_eq!(enriched.operational_cost, Decimal::new(625, 2));
    }

    #[test]
    fn test_net_utility_is_floored() {
        let enricher = enricher(EngineSettings::default());
        let enriched = enricher.enrich(&income(50, "Dra. Paez", "Corona")).unwrap();
        assert_eq!(enriched.net_utility, Decimal::ZERO);
    }

    #[test]
    fn test_expenses_are_not_enriched() {
        let enricher = enricher(EngineSettings::default());
        let mut expense = income(80, "Dra. Paez", "Corona");
        expense.kind = TransactionKind::Expense;
        assert!(enricher.enrich(&expense).is_none());
    }
}
