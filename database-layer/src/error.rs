use error_common::ClinicError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request to '{table}' failed with status {status}: {message}")]
    RequestFailed {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Record not found: {table}/{id}")]
    RecordNotFound { table: String, id: String },

    #[error("Refusing to {operation} '{table}' without a filter")]
    UnfilteredMutation { table: String, operation: &'static str },

    #[error("Backend returned no rows for {0}")]
    EmptyResponse(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl From<reqwest::Error> for DatabaseError {
    fn from(err: reqwest::Error) -> Self {
        DatabaseError::ConnectionFailed(err.to_string())
    }
}

impl From<DatabaseError> for ClinicError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::RecordNotFound { .. } | DatabaseError::TableNotFound(_) => {
                ClinicError::NotFound(err.to_string())
            }
            DatabaseError::Io(io) => ClinicError::IoError(io),
            other => ClinicError::BackendError(other.to_string()),
        }
    }
}
