//! Common error handling utilities for ClinicPulse
//!
//! Every crate in the workspace keeps its own `thiserror` enum for the
//! failures it knows about and converts into [`ClinicError`] at the crate
//! boundary. The CLI only ever sees `ClinicError`, which carries a stable
//! code for logs and exit reporting.
//!
//! # Error Categories
//!
//! - **BackendError / NotFound**: hosted table API and snapshot failures
//! - **ValidationError**: rows or user input rejected at ingestion
//! - **BusinessError**: rule violations such as editing external records
//! - **ConfigError**: settings that failed to load or validate
//! - **IoError**: export and file failures
//!
//! # Example
//!
//! ```rust
//! use error_common::{ClinicError, Result};
//!
//! fn parse_amount(raw: &str) -> Result<f64> {
//!     raw.parse::<f64>()
//!         .map_err(|e| ClinicError::ValidationError(format!("amount '{raw}': {e}")))
//! }
//!
//! let err = parse_amount("abc").unwrap_err();
//! assert_eq!(err.code(), "VALIDATION_1001");
//! ```

pub mod types;
pub mod codes;

pub use types::*;
