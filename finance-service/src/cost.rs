// Operational overhead per chair minute (costo sillón)
use crate::models::ClinicConfig;
use rust_decimal::Decimal;
use serde::Serialize;

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    Configured,
    Fallback,
}

/// Overhead rate kept as `fixed costs / operating minutes` so charges stay exact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostResolver {
    fixed_costs: Decimal,
    operating_minutes: Decimal,
    source: CostSource,
}

impl CostResolver {
    pub fn from_config(config: &ClinicConfig, fallback_per_minute: Decimal) -> Self {
        let fixed = config.fixed_costs_monthly().filter(|v| *v > Decimal::ZERO);
        let hours = config.operational_hours_monthly().filter(|v| *v > Decimal::ZERO);

        match (fixed, hours) {
            (Some(fixed_costs), Some(hours)) => Self {
                fixed_costs,
                operating_minutes: hours * MINUTES_PER_HOUR,
                source: CostSource::Configured,
            },
            _ => Self::fallback(fallback_per_minute),
        }
    }

    pub fn fallback(per_minute: Decimal) -> Self {
        Self {
            fixed_costs: per_minute,
            operating_minutes: Decimal::ONE,
            source: CostSource::Fallback,
        }
    }

    pub fn cost_per_minute(&self) -> Decimal {
        self.fixed_costs / self.operating_minutes
    }

    pub fn source(&self) -> CostSource {
        self.source
    }

    /// Overhead charged for `minutes` of chair time
    pub fn operational_cost(&self, minutes: u32) -> Decimal {
        self.fixed_costs * Decimal::from(minutes) / self.operating_minutes
    }
}
