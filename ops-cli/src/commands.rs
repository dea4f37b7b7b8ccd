// Command execution against the finance service
use crate::cli::{
    CommissionCommand, Command, ConfigCommand, CostCommand, ExportArgs, GoalCommand, TxAddArgs,
    TxCommand, TxEditArgs,
};
use crate::render;
use chrono::NaiveDate;
use colored::*;
use error_common::Result;
use finance_service::{
    export_income_csv_with_header, FinanceService, NewTransaction, TransactionPatch, ENGLISH_HEADER,
    SPANISH_HEADER,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Run one command, writing its output to `out`
pub async fn execute<W: Write>(command: Command, service: &FinanceService, today: NaiveDate, out: &mut W) -> Result<()> {
    match command {
        Command::Dashboard(args) => {
            let period = args.period.resolve(today)?;
            let report = service.dashboard(period, today).await?;
            if args.json {
                print_json(out, &report)
            } else {
                render::dashboard(out, &report)?;
                Ok(())
            }
        }
        Command::Export(args) => export(args, service, today, out).await,
        Command::Tx(cmd) => transaction(cmd, service, today, out).await,
        Command::Commission(cmd) => commission(cmd, service, out).await,
        Command::Cost(CostCommand::Set { treatment, supply, lab }) => {
            let cost = service.upsert_treatment_cost(&treatment, supply, lab).await?;
            render::treatment_cost(out, &cost)?;
            Ok(())
        }
        Command::Config(cmd) => config(cmd, service, out).await,
        Command::Goal(cmd) => goal(cmd, service, out).await,
    }
}

async fn export<W: Write>(args: ExportArgs, service: &FinanceService, today: NaiveDate, out: &mut W) -> Result<()> {
    let period = args.period.resolve(today)?;
    let header = if args.spanish { &SPANISH_HEADER } else { &ENGLISH_HEADER };

    match args.output {
        Some(path) => {
            let transactions = service.list_transactions(period).await?;
            let file = BufWriter::new(File::create(&path)?);
            let written = export_income_csv_with_header(&transactions, file, header)?;
            info!(path = %path.display(), rows = written, "Income exported");
            writeln!(out, "{} {} filas en {}", "Exportado:".green(), written, path.display())?;
        }
        None if args.spanish => {
            let transactions = service.list_transactions(period).await?;
            export_income_csv_with_header(&transactions, &mut *out, header)?;
        }
        None => {
            service.export_income_csv(period, &mut *out).await?;
        }
    }
    Ok(())
}

fn new_transaction(args: TxAddArgs, today: NaiveDate) -> NewTransaction {
    let fields = args.fields;
    NewTransaction {
        time: args.time,
        doctor: fields.doctor,
        patient: fields.patient,
        treatment: fields.treatment,
        chair: fields.chair,
        payment_method: fields.payment_method,
        invoice_number: fields.invoice_number,
        status: fields.status,
        description: fields.description,
        category: fields.category,
        external_ref: args.external_ref,
        ..NewTransaction::new(args.kind, args.amount, args.date.unwrap_or(today))
    }
}

fn patch(args: TxEditArgs) -> TransactionPatch {
    let fields = args.fields;
    TransactionPatch {
        amount: args.amount,
        date: args.date,
        time: args.time,
        kind: args.kind,
        doctor: fields.doctor,
        patient: fields.patient,
        treatment: fields.treatment,
        chair: fields.chair,
        payment_method: fields.payment_method,
        invoice_number: fields.invoice_number,
        status: fields.status,
        description: fields.description,
        category: fields.category,
    }
}

async fn transaction<W: Write>(cmd: TxCommand, service: &FinanceService, today: NaiveDate, out: &mut W) -> Result<()> {
    match cmd {
        TxCommand::Add(args) => {
            let created = service.create_transaction(new_transaction(args, today)).await?;
            writeln!(out, "{} {}", "Creado:".green(), render::transaction_line(&created))?;
        }
        TxCommand::Edit(args) => {
            let id = args.id.clone();
            let updated = service.update_transaction(&id, patch(args)).await?;
            writeln!(out, "{} {}", "Actualizado:".green(), render::transaction_line(&updated))?;
        }
        TxCommand::Delete { id } => {
            service.delete_transaction(&id).await?;
            writeln!(out, "{} {}", "Eliminado:".green(), id)?;
        }
        TxCommand::List { period, json } => {
            let transactions = service.list_transactions(period.resolve(today)?).await?;
            if json {
                return print_json(out, &transactions);
            }
            render::transactions(out, &transactions)?;
        }
    }
    Ok(())
}

async fn commission<W: Write>(cmd: CommissionCommand, service: &FinanceService, out: &mut W) -> Result<()> {
    match cmd {
        CommissionCommand::Set { doctor, key, rate } => {
            let rule = service.set_commission_rule(&doctor, &key, rate).await?;
            writeln!(out, "{} {} / {} = {}%", "Regla guardada:".green(), rule.doctor, rule.key, rule.rate_percent)?;
        }
        CommissionCommand::Remove { doctor, key } => {
            if service.remove_commission_rule(&doctor, &key).await? {
                writeln!(out, "{} {} / {}", "Regla eliminada:".green(), doctor, key)?;
            } else {
                writeln!(out, "{} {} / {}", "Sin regla para".yellow(), doctor, key)?;
            }
        }
        CommissionCommand::List { json } => {
            let rules = service.commission_rules().await?;
            if json {
                return print_json(out, &rules);
            }
            render::commission_rules(out, &rules)?;
        }
    }
    Ok(())
}

async fn config<W: Write>(cmd: ConfigCommand, service: &FinanceService, out: &mut W) -> Result<()> {
    match cmd {
        ConfigCommand::Set { key, value } => {
            service.set_config_value(&key, value).await?;
            writeln!(out, "{} {} = {}", "Configuración guardada:".green(), key, value)?;
        }
        ConfigCommand::Show { json } => {
            let config = service.clinic_config().await?;
            if json {
                return print_json(out, &config);
            }
            render::clinic_config(out, &config)?;
        }
    }
    Ok(())
}

async fn goal<W: Write>(cmd: GoalCommand, service: &FinanceService, out: &mut W) -> Result<()> {
    match cmd {
        GoalCommand::Set { category, metric, target } => {
            let goal = service.set_goal(category, metric, target).await?;
            writeln!(
                out,
                "{} {} {} = {}",
                "Meta guardada:".green(),
                goal.category.as_str(),
                goal.metric.as_str(),
                render::money(goal.target)
            )?;
        }
        GoalCommand::List { json } => {
            let goals = service.goals().await?.all();
            if json {
                return print_json(out, &goals);
            }
            render::goals(out, &goals)?;
        }
    }
    Ok(())
}
