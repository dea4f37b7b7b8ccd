//! Structured logging with automatic patient PII redaction
//!
//! Installs the global `tracing` subscriber for ClinicPulse binaries. Every
//! formatted line passes through [`PiiRedactor`] before it is written, so
//! patient contact data that slips into a log message (emails, phone
//! numbers, cédula/RUC numbers) never reaches the console or the log files.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init, LoggerConfig};
//!
//! let _guard = init(&LoggerConfig::default().with_level("debug"))?;
//! tracing::info!("invoice mailed to ana@example.com");
//! // Output: "invoice mailed to a***@e***"
//! # Ok::<(), logger_redacted::LoggerError>(())
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! log_level = "info"
//! json = false
//! redaction_enabled = true
//! hash_for_correlation = false
//! log_dir = "/var/log/clinicpulse"
//!
//! [[logging.custom_patterns]]
//! pattern = "HC-\\d+"
//! replacement = "HC-[REDACTED]"
//! ```

pub mod config;
pub mod error;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use error::*;
pub use redactor::*;
pub use writer::*;

use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

const LOG_FILE_PREFIX: &str = "clinicpulse.log";

/// Keeps the background file writer alive; drop it only on shutdown
pub struct LoggerGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`
///
/// `RUST_LOG` overrides `config.log_level` when set.
pub fn init(config: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let redactor = if config.redaction_enabled {
        Some(Arc::new(PiiRedactor::new(RedactionConfig::from_logger_config(config)?)))
    } else {
        None
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // stdout is reserved for command output
    let console = RedactingMakeWriter::new(std::io::stderr, redactor.clone());
    if config.json {
        layers.push(
            fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(console)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(console)
                .boxed(),
        );
    }

    let file_guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(RedactingMakeWriter::new(non_blocking, redactor))
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        level = %config.log_level,
        json = config.json,
        redaction = config.redaction_enabled,
        "Logger initialized"
    );

    Ok(LoggerGuard {
        _file_guard: file_guard,
    })
}
