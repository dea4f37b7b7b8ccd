use chrono::Local;
use clap::Parser;
use colored::*;
use config_engine::Settings;
use error_common::{log_error, ClinicError};
use std::io;
use std::process::ExitCode;
use tracing::debug;

use ops_cli::{run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => return fail(&e.into(), false),
    };

    let mut logging = settings.logging.clone();
    if cli.verbose {
        logging.log_level = "debug".to_string();
    }
    let _guard = match logger_redacted::init(&logging) {
        Ok(guard) => guard,
        Err(e) => return fail(&e.into(), false),
    };
    debug!("📋 Version: {}", env!("CARGO_PKG_VERSION"));

    let today = Local::now().date_naive();
    let mut stdout = io::stdout().lock();
    match run(cli, &settings, today, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, true),
    }
}

fn fail(error: &ClinicError, logger_ready: bool) -> ExitCode {
    if logger_ready {
        log_error("clinicpulse", error);
    }
    eprintln!("{} [{}] {}", "error:".bright_red().bold(), error.code(), error);
    ExitCode::FAILURE
}
