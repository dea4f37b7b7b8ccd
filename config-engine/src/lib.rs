//! Configuration management for ClinicPulse
//!
//! Settings are layered, later sources winning:
//! - built-in defaults (every field has one)
//! - a TOML file (`clinicpulse.toml` or an explicit path)
//! - environment variables prefixed `CLINICPULSE__`, nested with `__`
//!
//! The engine heuristics (supply-cost share, fallback commission, fallback
//! overhead per minute, default chair time) are ordinary settings so each
//! clinic can tune them instead of living with inlined constants.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::Settings;
//!
//! // CLINICPULSE__BACKEND__BASE_URL=https://xyz.example.co
//! // CLINICPULSE__ENGINE__SUPPLY_COST_RATE=0.12
//! let settings = Settings::load(None)?;
//! println!("{}", settings.backend.base_url);
//! # Ok::<(), config_engine::ConfigError>(())
//! ```

pub mod settings;
pub mod error;

pub use settings::*;
pub use error::*;
