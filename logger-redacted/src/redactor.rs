use crate::config::LoggerConfig;
use crate::error::{LoggerError, LoggerResult};
use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern");
    // Mobile (09x / +593 9x) and landline (0[2-7]) numbers
    static ref PHONE_REGEX: Regex =
        Regex::new(r"(?:\+593[\s-]?|\b0)(?:9\d|[2-7])(?:[\s-]?\d){7}\b").expect("phone pattern");
    // Cédula (10 digits) and RUC (cédula + 001)
    static ref NATIONAL_ID_REGEX: Regex = Regex::new(r"\b\d{10}(?:001)?\b").expect("id pattern");
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_national_ids: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_national_ids: true,
            hash_for_correlation: false,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Compile the redaction rules described by a logger configuration
    pub fn from_logger_config(config: &LoggerConfig) -> LoggerResult<Self> {
        let custom_patterns = config
            .custom_patterns
            .iter()
            .map(|custom| {
                Regex::new(&custom.pattern)
                    .map(|re| (re, custom.replacement.clone()))
                    .map_err(|e| LoggerError::InvalidPattern {
                        pattern: custom.pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<LoggerResult<Vec<_>>>()?;

        Ok(Self {
            hash_for_correlation: config.hash_for_correlation,
            custom_patterns,
            ..Self::default()
        })
    }
}

/// PII redactor for log lines
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_with(&PHONE_REGEX, &result, "PHONE", "(**) ***-****");
        }

        if self.config.redact_national_ids {
            result = self.redact_with(&NATIONAL_ID_REGEX, &result, "ID", "**********");
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    return format!("EMAIL[{}]", self.hash_value(email));
                }
                match email.split_once('@') {
                    Some((user, domain)) => format!(
                        "{}***@{}***",
                        user.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    ),
                    None => "***@***".to_string(),
                }
            })
            .to_string()
    }

    fn redact_with(&self, regex: &Regex, text: &str, label: &str, mask: &str) -> String {
        regex
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{label}[{}]", self.hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        // First 8 bytes keep the tag short
        general_purpose::STANDARD_NO_PAD.encode(digest.get(..8).unwrap_or_default())
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}
