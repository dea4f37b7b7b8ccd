// Cascading commission lookup
use crate::models::{CommissionRule, RateSource};
use crate::normalize::{normalize, normalize_opt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Rule key applied to every treatment of a doctor without a more specific rule
pub const DEFAULT_RULE_KEY: &str = "_default";

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    /// Fraction in [0, 1]
    pub rate: Decimal,
    pub source: RateSource,
}

/// Commission rates keyed by (normalized doctor, normalized key)
#[derive(Debug, Clone)]
pub struct CommissionResolver {
    rates: HashMap<(String, String), Decimal>,
    fallback: Decimal,
}

impl CommissionResolver {
    /// Build from percent rules; conflicting duplicates keep the highest rate
    pub fn new(rules: &[CommissionRule], fallback: Decimal) -> Self {
        let mut rates: HashMap<(String, String), Decimal> = HashMap::new();

        for rule in rules {
            let doctor = normalize(&rule.doctor);
            let key = normalize(&rule.key);
            if doctor.is_empty() || key.is_empty() {
                warn!(doctor = %rule.doctor, key = %rule.key, "Ignoring commission rule without doctor or key");
                continue;
            }
            let rate = (rule.rate_percent / HUNDRED).clamp(Decimal::ZERO, Decimal::ONE);

            match rates.get(&(doctor.clone(), key.clone())) {
                Some(existing) if *existing != rate => {
                    let kept = (*existing).max(rate);
                    warn!(
                        doctor = %rule.doctor,
                        key = %rule.key,
                        kept = %kept,
                        "Conflicting commission rules, keeping the highest rate"
                    );
                    rates.insert((doctor, key), kept);
                }
                Some(_) => {}
                None => {
                    rates.insert((doctor, key), rate);
                }
            }
        }

        Self {
            rates,
            fallback: fallback.clamp(Decimal::ZERO, Decimal::ONE),
        }
    }

    pub fn fallback_rate(&self) -> Decimal {
        self.fallback
    }

    pub fn rule_count(&self) -> usize {
        self.rates.len()
    }

    /// Rate in [0, 1] for a doctor: treatment, then category, then `_default`, then the fallback
    pub fn resolve_rate(&self, doctor: Option<&str>, category: Option<&str>, treatment: Option<&str>) -> Decimal {
        self.resolve(doctor, category, treatment).rate
    }

    pub fn resolve(&self, doctor: Option<&str>, category: Option<&str>, treatment: Option<&str>) -> ResolvedRate {
        let Some(doctor) = normalize_opt(doctor) else {
            return self.fallback_resolution();
        };

        let candidates = [
            (normalize_opt(treatment), RateSource::Treatment),
            (normalize_opt(category), RateSource::Category),
            (Some(DEFAULT_RULE_KEY.to_string()), RateSource::DoctorDefault),
        ];

        for (key, source) in candidates {
            let Some(key) = key else { continue };
            if let Some(rate) = self.rates.get(&(doctor.clone(), key)) {
                return ResolvedRate { rate: *rate, source };
            }
        }

        self.fallback_resolution()
    }

    fn fallback_resolution(&self) -> ResolvedRate {
        ResolvedRate {
            rate: self.fallback,
            source: RateSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(doctor: &str, key: &str, percent: i64) -> CommissionRule {
        CommissionRule {
            doctor: doctor.to_string(),
            key: key.to_string(),
            rate_percent: Decimal::new(percent, 0),
        }
    }

    fn paez_rules() -> Vec<CommissionRule> {
        vec![
            rule("Dra. Paez", DEFAULT_RULE_KEY, 30),
            rule("Dra. Paez", "Ortodoncia", 50),
            rule("Dra. Paez", "Control Autoligados", 10),
        ]
    }

    #[test]
    fn test_treatment_rule_wins_over_category() {
        let resolver = CommissionResolver::new(&paez_rules(), Decimal::new(33, 2));

        let resolved = resolver.resolve(Some("Dra. Paez"), Some("Ortodoncia"), Some("Control Autoligados"));
        assert_eq!(resolved.rate, Decimal::new(10, 2));
        assert_eq!(resolved.source, RateSource::Treatment);
    }

    #[test]
    fn test_cascade_levels() {
        let resolver = CommissionResolver::new(&paez_rules(), Decimal::new(33, 2));

        assert_eq!(
            resolver.resolve_rate(Some("DRA. PÁEZ"), Some("ortodoncia"), Some("Brackets")),
            Decimal::new(50, 2)
        );
        let default = resolver.resolve(Some("Dra. Paez"), Some("Estética"), Some("Carilla"));
        assert_eq!(default.rate, Decimal::new(30, 2));
        assert_eq!(default.source, RateSource::DoctorDefault);

        let fallback = resolver.resolve(Some("Dr. Vera"), Some("Ortodoncia"), None);
        assert_eq!(fallback.rate, Decimal::new(33, 2));
        assert_eq!(fallback.source, RateSource::Fallback);
        assert_eq!(resolver.resolve(None, None, None).source, RateSource::Fallback);
    }

    #[test]
    fn test_duplicates_keep_highest_rate() {
        let forward = CommissionResolver::new(
            &[rule("Dr. Vera", DEFAULT_RULE_KEY, 25), rule("dr. vera", "_DEFAULT", 40)],
            Decimal::new(33, 2),
        );
        let backward = CommissionResolver::new(
            &[rule("dr. vera", "_DEFAULT", 40), rule("Dr. Vera", DEFAULT_RULE_KEY, 25)],
            Decimal::new(33, 2),
        );

        assert_eq!(forward.resolve_rate(Some("Dr. Vera"), None, None), Decimal::new(40, 2));
        assert_eq!(backward.resolve_rate(Some("Dr. Vera"), None, None), Decimal::new(40, 2));
        assert_eq!(forward.rule_count(), 1);
    }

    #[test]
    fn test_rates_are_clamped() {
        let resolver = CommissionResolver::new(&[rule("Dr. Vera", DEFAULT_RULE_KEY, 150)], Decimal::new(33, 2));
        assert_eq!(resolver.resolve_rate(Some("Dr. Vera"), None, None), Decimal::ONE);
    }
}
