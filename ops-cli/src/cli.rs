// Command line definition
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use finance_service::{
    FinanceResult, GoalCategory, GoalMetric, PaymentStatus, Period, TransactionKind,
};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// ClinicPulse financial dashboard
#[derive(Parser, Debug)]
#[command(name = "clinicpulse", version)]
#[command(about = "Dental clinic billing, commissions and profitability from the command line")]
pub struct Cli {
    /// Configuration file (defaults to ./clinicpulse.toml when present)
    #[arg(short, long, global = true, env = "CLINICPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Work offline against a JSON snapshot of the clinic tables
    #[arg(short, long, global = true, env = "CLINICPULSE_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Totals, rollups by chair/doctor/treatment, goal projection and alerts
    Dashboard(DashboardArgs),
    /// Write the income listing of a period as CSV
    Export(ExportArgs),
    /// Local transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Doctor commission rules (aranceles)
    #[command(subcommand)]
    Commission(CommissionCommand),
    /// Treatment supply and lab costs
    #[command(subcommand)]
    Cost(CostCommand),
    /// Clinic fixed costs and operating hours
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Billing, utility and chair goals
    #[command(subcommand)]
    Goal(GoalCommand),
}

impl Command {
    /// Whether the command writes to the backend
    pub fn mutates(&self) -> bool {
        match self {
            Self::Dashboard(_) | Self::Export(_) => false,
            Self::Tx(cmd) => !matches!(cmd, TxCommand::List { .. }),
            Self::Commission(cmd) => !matches!(cmd, CommissionCommand::List { .. }),
            Self::Cost(_) => true,
            Self::Config(cmd) => matches!(cmd, ConfigCommand::Set { .. }),
            Self::Goal(cmd) => matches!(cmd, GoalCommand::Set { .. }),
        }
    }
}

/// Reporting window: a calendar month or an explicit date range
#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Month as YYYY-MM (defaults to the current month)
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    pub month: Option<String>,

    /// First day of a custom range
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of a custom range
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
}

impl PeriodArgs {
    pub fn resolve(&self, today: NaiveDate) -> FinanceResult<Period> {
        match (&self.month, self.from, self.to) {
            (Some(month), _, _) => Period::parse_month(month),
            (None, Some(from), Some(to)) => Period::range(from, to),
            _ => Ok(Period::containing(today)),
        }
    }
}

#[derive(Args, Debug)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use Spanish column headers
    #[arg(long)]
    pub spanish: bool,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    /// Record a new income or expense
    Add(TxAddArgs),
    /// Change fields of a local transaction
    Edit(TxEditArgs),
    /// Delete a local transaction
    Delete {
        id: String,
    },
    /// List reconciled transactions of a period
    List {
        #[command(flatten)]
        period: PeriodArgs,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct TxAddArgs {
    /// income/ingreso or expense/gasto
    #[arg(value_parser = parse_kind)]
    pub kind: TransactionKind,

    pub amount: Decimal,

    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// HH:MM[:SS]
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    #[command(flatten)]
    pub fields: TxFields,

    /// Id of the external payment this record replaces
    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct TxEditArgs {
    pub id: String,

    #[arg(long)]
    pub amount: Option<Decimal>,

    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<TransactionKind>,

    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    #[command(flatten)]
    pub fields: TxFields,
}

/// Descriptive fields shared by `tx add` and `tx edit`
#[derive(Args, Debug, Clone, Default)]
pub struct TxFields {
    #[arg(long)]
    pub doctor: Option<String>,

    #[arg(long)]
    pub patient: Option<String>,

    #[arg(long)]
    pub treatment: Option<String>,

    #[arg(long)]
    pub chair: Option<String>,

    #[arg(long = "method")]
    pub payment_method: Option<String>,

    #[arg(long = "invoice")]
    pub invoice_number: Option<String>,

    /// PAGADO, ABONO, CANCELADO, ...
    #[arg(long, value_parser = parse_status)]
    pub status: Option<PaymentStatus>,

    #[arg(long)]
    pub description: Option<String>,

    /// Expense category
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CommissionCommand {
    /// Set a doctor's rate for a treatment, a category or `_default`
    Set {
        doctor: String,
        key: String,
        /// Percentage, 0-100
        rate: Decimal,
    },
    Remove {
        doctor: String,
        key: String,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CostCommand {
    /// Record supply and lab costs for a treatment
    Set {
        treatment: String,

        #[arg(long)]
        supply: Decimal,

        #[arg(long, default_value = "0")]
        lab: Decimal,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a clinic value such as FIXED_COSTS_MONTHLY or OPERATIONAL_HOURS_MONTHLY
    Set { key: String, value: Decimal },
    Show {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Set {
        /// billing, utility or chair
        #[arg(value_parser = parse_goal_category)]
        category: GoalCategory,

        /// monthly or daily
        #[arg(value_parser = parse_goal_metric)]
        metric: GoalMetric,

        target: Decimal,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

fn parse_kind(value: &str) -> Result<TransactionKind, String> {
    TransactionKind::parse(value).ok_or_else(|| format!("expected income or expense, got '{value}'"))
}

fn parse_status(value: &str) -> Result<PaymentStatus, String> {
    match PaymentStatus::parse(value) {
        PaymentStatus::Other(raw) => Err(format!("unknown payment status '{raw}'")),
        status => Ok(status),
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| format!("invalid time '{value}': {e}"))
}

fn parse_goal_category(value: &str) -> Result<GoalCategory, String> {
    GoalCategory::parse(value).ok_or_else(|| format!("expected billing, utility or chair, got '{value}'"))
}

fn parse_goal_metric(value: &str) -> Result<GoalMetric, String> {
    GoalMetric::parse(value).ok_or_else(|| format!("expected monthly or daily, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["clinicpulse", "dashboard", "--month", "2026-10", "--snapshot", "clinic.json", "-v"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.snapshot, Some(PathBuf::from("clinic.json")));
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.period.month.as_deref(), Some("2026-10"));
        assert!(!args.json);
    }

    #[test]
    fn test_month_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "clinicpulse", "dashboard", "--month", "2026-10", "--from", "2026-10-01", "--to", "2026-10-15",
        ]);
        assert!(result.is_err());
        assert!(Cli::try_parse_from(["clinicpulse", "dashboard", "--from", "2026-10-01"]).is_err());
    }

    #[test]
    fn test_tx_add_parses_spanish_values() {
        let cli = Cli::try_parse_from([
            "clinicpulse", "tx", "add", "ingreso", "45.50", "--time", "09:30", "--status", "abono", "--method", "Efectivo",
        ])
        .unwrap();
        let Command::Tx(TxCommand::Add(args)) = cli.command else {
            panic!("expected tx add");
        };
        assert_eq!(args.kind, TransactionKind::Income);
        assert_eq!(args.amount, Decimal::new(4550, 2));
        assert_eq!(args.time, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(args.fields.status, Some(PaymentStatus::Abono));
        assert_eq!(args.fields.payment_method.as_deref(), Some("Efectivo"));
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["clinicpulse", "tx", "add", "refund", "10"]).is_err());
        assert!(Cli::try_parse_from(["clinicpulse", "tx", "add", "income", "10", "--status", "maybe"]).is_err());
        assert!(Cli::try_parse_from(["clinicpulse", "goal", "set", "revenue", "monthly", "100"]).is_err());
    }

    #[test]
    fn test_mutating_commands() {
        let mutates = |args: &[&str]| Cli::try_parse_from(args.iter().copied()).unwrap().command.mutates();
        assert!(!mutates(&["clinicpulse", "dashboard"]));
        assert!(!mutates(&["clinicpulse", "tx", "list"]));
        assert!(mutates(&["clinicpulse", "tx", "delete", "l1"]));
        assert!(mutates(&["clinicpulse", "cost", "set", "Corona", "--supply", "30"]));
        assert!(!mutates(&["clinicpulse", "config", "show"]));
        assert!(mutates(&["clinicpulse", "goal", "set", "billing", "monthly", "25000"]));
    }

    #[test]
    fn test_period_defaults_to_current_month() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let period = PeriodArgs::default().resolve(today).unwrap();
        assert_eq!(period, Period::Month { year: 2026, month: 10 });
    }
}
