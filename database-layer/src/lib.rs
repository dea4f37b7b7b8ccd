//! Backend access layer for ClinicPulse
//!
//! The clinic's data lives in a hosted Postgres project exposed through its
//! REST table API. This crate provides:
//!
//! - **Table client**: the [`TableClient`] trait (select/insert/update/delete/upsert
//!   with filter, order and limit) implemented by [`RestTableClient`] for the
//!   hosted API and by [`InMemoryTables`] for JSON snapshots and tests
//! - **Row models**: typed rows for every table the engine reads, decoded one by
//!   one so a malformed external record is reported instead of failing the load
//! - **Repositories**: transaction, catalog and settings repositories that own
//!   the table names and conflict keys
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use config_engine::BackendSettings;
//! use database_layer::{RestTableClient, TableClient, TransactionRepository};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = BackendSettings::default();
//! let client: Arc<dyn TableClient> = Arc::new(RestTableClient::new(&backend)?);
//! let repo = TransactionRepository::new(
//!     client,
//!     &backend.tables.transactions,
//!     &backend.tables.external_payments,
//! );
//! let rows = repo.list_local(None).await?;
//! println!("{} local transactions", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog_repository;
pub mod client;
pub mod error;
pub mod memory;
pub mod models;
pub mod query;
pub mod rest;
pub mod settings_repository;
pub mod transaction_repository;

pub use catalog_repository::CatalogRepository;
pub use client::{select_as, to_row, TableClient};
pub use error::{DatabaseError, DatabaseResult};
pub use memory::InMemoryTables;
pub use models::*;
pub use query::{FilterOp, Query};
pub use rest::RestTableClient;
pub use settings_repository::SettingsRepository;
pub use transaction_repository::{DateRange, TransactionRepository};
