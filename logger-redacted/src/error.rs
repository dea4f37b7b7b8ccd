use error_common::ClinicError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid redaction pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

pub type LoggerResult<T> = Result<T, LoggerError>;

impl From<LoggerError> for ClinicError {
    fn from(err: LoggerError) -> Self {
        ClinicError::LoggingError(err.to_string())
    }
}
