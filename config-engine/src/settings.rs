use crate::error::{ConfigError, Result};
use logger_redacted::LoggerConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// File looked up in the working directory when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "clinicpulse.toml";

/// Prefix for environment overrides, e.g. `CLINICPULSE__BACKEND__BASE_URL`
pub const ENV_PREFIX: &str = "CLINICPULSE";

/// Complete application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub engine: EngineSettings,
    pub logging: LoggerConfig,
}

/// Hosted table API connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Project URL; tables live under `{base_url}/rest/v1/{table}`
    pub base_url: String,
    /// Anonymous/public API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub tables: TableNames,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            timeout_secs: 30,
            tables: TableNames::default(),
        }
    }
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("tables", &self.tables)
            .finish()
    }
}

/// Backend table names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub transactions: String,
    pub external_payments: String,
    pub treatments: String,
    pub treatment_costs: String,
    pub commission_rules: String,
    pub clinic_config: String,
    pub goals: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            transactions: "transactions".to_string(),
            external_payments: "external_payments".to_string(),
            treatments: "treatments".to_string(),
            treatment_costs: "treatment_costs".to_string(),
            commission_rules: "commission_rules".to_string(),
            clinic_config: "clinic_config".to_string(),
            goals: "goals".to_string(),
        }
    }
}

/// Heuristics used by the profitability engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Share of the billed amount assumed to be consumed in supplies
    pub supply_cost_rate: Decimal,
    /// Commission rate used when no rule matches the doctor
    pub fallback_commission_rate: Decimal,
    /// Overhead per chair minute when fixed costs or hours are not configured
    pub fallback_cost_per_minute: Decimal,
    /// Chair time charged to treatments without a catalog duration
    pub default_treatment_minutes: u32,
    /// Chair hours credited per transaction in the chair rollup
    pub chair_hours_per_transaction: Decimal,
    /// Use the recorded supply cost of a treatment instead of the flat rate
    pub prefer_recorded_supply_cost: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            supply_cost_rate: Decimal::new(15, 2),
            fallback_commission_rate: Decimal::new(33, 2),
            fallback_cost_per_minute: Decimal::new(33, 2),
            default_treatment_minutes: 30,
            chair_hours_per_transaction: Decimal::new(5, 1),
            prefer_recorded_supply_cost: false,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        let unit = Decimal::ZERO..=Decimal::ONE;
        if !unit.contains(&self.supply_cost_rate) {
            return Err(ConfigError::ValidationError(format!(
                "engine.supply_cost_rate must be within [0, 1], got {}",
                self.supply_cost_rate
            )));
        }
        if !unit.contains(&self.fallback_commission_rate) {
            return Err(ConfigError::ValidationError(format!(
                "engine.fallback_commission_rate must be within [0, 1], got {}",
                self.fallback_commission_rate
            )));
        }
        if self.fallback_cost_per_minute <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "engine.fallback_cost_per_minute must be positive".to_string(),
            ));
        }
        if self.default_treatment_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "engine.default_treatment_minutes must be positive".to_string(),
            ));
        }
        if self.chair_hours_per_transaction < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "engine.chair_hours_per_transaction cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Load settings: built-in defaults, then the TOML file, then `CLINICPULSE__*` variables
    ///
    /// An explicit `path` must exist; without one, `clinicpulse.toml` is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::SourceNotFound(path.display().to_string()));
                }
                config::File::from(path).required(true)
            }
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        info!(
            base_url = %settings.backend.base_url,
            api_key_set = settings.backend.api_key.is_some(),
            "Configuration loaded"
        );
        debug!(engine = ?settings.engine, "Engine heuristics");

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url cannot be empty".to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.timeout_secs must be positive".to_string(),
            ));
        }
        self.engine.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.engine.supply_cost_rate, Decimal::new(15, 2));
        assert_eq!(settings.engine.fallback_commission_rate, Decimal::new(33, 2));
        assert_eq!(settings.engine.default_treatment_minutes, 30);
        assert_eq!(settings.backend.tables.transactions, "transactions");
    }

    #[test]
    fn test_rate_out_of_range_is_rejected() {
        let engine = EngineSettings {
            supply_cost_rate: Decimal::new(15, 0),
            ..Default::default()
        };
        assert!(matches!(engine.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let engine = EngineSettings {
            default_treatment_minutes: 0,
            ..Default::default()
        };
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://clinic.example.test"

[backend.tables]
external_payments = "pagos_externos"

[engine]
default_treatment_minutes = 45
prefer_recorded_supply_cost = true
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.backend.base_url, "https://clinic.example.test");
        assert_eq!(settings.backend.tables.external_payments, "pagos_externos");
        assert_eq!(settings.backend.tables.goals, "goals");
        assert_eq!(settings.engine.default_treatment_minutes, 45);
        assert!(settings.engine.prefer_recorded_supply_cost);
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Settings::load(Some(Path::new("/nonexistent/clinicpulse.toml")));
        assert!(matches!(result, Err(ConfigError::SourceNotFound(_))));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let backend = BackendSettings {
            api_key: Some("anon-secret-key".to_string()),
            ..Default::default()
        };
        let rendered = format!("{backend:?}");
        assert!(!rendered.contains("anon-secret-key"));
        assert!(rendered.contains("***"));
    }
}
