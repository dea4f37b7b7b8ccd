use database_layer::DatabaseError;
use error_common::ClinicError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transaction {0} comes from the external system and is read-only")]
    ReadOnly(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FinanceResult<T> = Result<T, FinanceError>;

impl From<validator::ValidationErrors> for FinanceError {
    fn from(err: validator::ValidationErrors) -> Self {
        FinanceError::Validation(err.to_string())
    }
}

impl From<FinanceError> for ClinicError {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::Validation(msg) => ClinicError::ValidationError(msg),
            FinanceError::ReadOnly(id) => ClinicError::BusinessError(format!(
                "transaction {id} comes from the external system and is read-only"
            )),
            FinanceError::NotFound(what) => ClinicError::NotFound(what),
            FinanceError::Database(err) => err.into(),
            FinanceError::Csv(err) => ClinicError::InternalError(format!("CSV export failed: {err}")),
            FinanceError::Io(err) => ClinicError::IoError(err),
        }
    }
}
