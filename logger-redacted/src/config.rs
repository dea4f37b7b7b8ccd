// Logger configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extra redaction rule supplied through configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Scrub emails, phone numbers and national IDs from every log line
    pub redaction_enabled: bool,
    /// Replace redacted values with a short hash so repeated values can be correlated
    pub hash_for_correlation: bool,
    /// Default filter directive when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Directory for daily rolling log files
    pub log_dir: Option<PathBuf>,
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            hash_for_correlation: false,
            log_level: "info".to_string(),
            json: false,
            log_dir: None,
            custom_patterns: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
