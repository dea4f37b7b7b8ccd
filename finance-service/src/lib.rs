//! Finance Service for dental clinic production and profitability
//!
//! Provides the computation engine behind the ClinicPulse dashboard:
//! - Two-source reconciliation of local transactions and external payments
//! - Treatment matching through a versioned alias table with review flags
//! - Cascading commission lookup (treatment, category, doctor default, fallback)
//! - Operational overhead per chair minute from the clinic's fixed costs
//! - Rollups by chair, doctor and treatment, plus period cash summary
//! - Month-end projection and goal alerts
//! - CSV export of the income listing
//!
//! Every computation reloads the source tables; nothing derived is persisted.

pub mod aggregation;
pub mod commission;
pub mod cost;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod goals;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod reconciliation;
pub mod service;

pub use aggregation::*;
pub use commission::*;
pub use cost::*;
pub use enrichment::*;
pub use error::*;
pub use export::*;
pub use goals::*;
pub use matching::*;
pub use models::*;
pub use normalize::{normalize, normalize_opt};
pub use reconciliation::*;
pub use service::*;
