use crate::codes;
use thiserror::Error;

/// Top-level error shared by every ClinicPulse crate and the CLI
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Backend (hosted table API or snapshot) errors
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Business rule violations, e.g. editing an externally sourced record
    #[error("Business logic error: {0}")]
    BusinessError(String),

    /// Validation errors at the ingestion boundary
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Logging/subscriber setup errors
    #[error("Logging error: {0}")]
    LoggingError(String),

    /// File and export errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ClinicError {
    /// Stable error code for logs and exit reporting
    pub fn code(&self) -> &'static str {
        match self {
            Self::BackendError(_) => codes::backend::REQUEST_FAILED,
            Self::NotFound(_) => codes::backend::NOT_FOUND,
            Self::BusinessError(_) => codes::business::RULE_VIOLATION,
            Self::ValidationError(_) => codes::validation::INVALID_INPUT,
            Self::ConfigError(_) => codes::config::LOAD_FAILED,
            Self::LoggingError(_) | Self::InternalError(_) => codes::system::INTERNAL,
            Self::IoError(_) => codes::system::IO_FAILED,
            Self::SerializationError(_) => codes::backend::DECODE_FAILED,
        }
    }

    /// Short category name used as a structured log field
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::BackendError(_) | Self::NotFound(_) => "backend",
            Self::BusinessError(_) => "business",
            Self::ValidationError(_) => "validation",
            Self::ConfigError(_) => "config",
            Self::LoggingError(_) => "logging",
            Self::IoError(_) | Self::SerializationError(_) => "io",
            Self::InternalError(_) => "internal",
        }
    }
}

/// Result type alias for ClinicPulse operations
pub type Result<T> = std::result::Result<T, ClinicError>;

/// Log an error with its code and category
pub fn log_error(context: &str, error: &ClinicError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error_type = error.error_type(),
        error = %error,
        "ClinicPulse error occurred"
    );
}
