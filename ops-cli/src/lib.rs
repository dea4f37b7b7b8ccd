//! ClinicPulse command line
//!
//! The `clinicpulse` binary recomputes the dashboard on demand from the
//! clinic tables and administers the reference data behind it: commission
//! rules, treatment costs, clinic configuration and goals.
//!
//! Without `--snapshot` every command talks to the hosted table API from
//! `[backend]`; with it, the tables are read from a JSON file and mutating
//! commands write the file back.
//!
//! ```text
//! clinicpulse dashboard --month 2026-10
//! clinicpulse --snapshot clinic.json tx add ingreso 45 --doctor "Dra. Paez" --treatment Profilaxis
//! clinicpulse commission set "Dra. Paez" Ortodoncia 50
//! clinicpulse export --month 2026-10 --output octubre.csv --spanish
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod render;

pub use backend::Backend;
pub use cli::*;

use chrono::NaiveDate;
use config_engine::Settings;
use error_common::Result;
use finance_service::FinanceService;
use std::io::Write;
use tracing::debug;

/// Open the configured backend, run `cli.command` and persist offline changes
pub async fn run<W: Write>(cli: Cli, settings: &Settings, today: NaiveDate, out: &mut W) -> Result<()> {
    let backend = Backend::open(&settings.backend, cli.snapshot.as_deref())?;
    debug!(backend = %backend, command = ?cli.command, "Running command");

    let service = FinanceService::new(backend.client(), &settings.backend.tables, settings.engine.clone());
    let mutates = cli.command.mutates();
    commands::execute(cli.command, &service, today, out).await?;

    if mutates {
        backend.persist()?;
    }
    Ok(())
}
