//! Terminal rendering of reports and listings
//!
//! Tables are plain text padded per column; color comes from `colored` and
//! switches itself off when stdout is not a terminal.

use colored::*;
use finance_service::{
    Alert, ClinicConfig, CommissionRule, CostSource, DashboardReport, Goal, GoalProgress, Severity,
    Transaction, TransactionKind, TreatmentCost,
};
use rust_decimal::Decimal;
use std::io::{self, Write};

const BLANK: &str = "-";

pub fn money(value: Decimal) -> String {
    format!("${:.2}", value.round_dp(2))
}

fn percent(value: Decimal) -> String {
    format!("{:.1}%", value.round_dp(1))
}

fn text(value: Option<&str>) -> String {
    value.map_or_else(|| BLANK.to_string(), str::to_string)
}

/// Column-aligned table; the first column is left aligned, the rest right aligned
struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }

    fn line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, &width))| {
                if i == 0 {
                    format!("{:<width$}", cell.as_ref())
                } else {
                    format!("{:>width$}", cell.as_ref())
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }

    fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.rows.is_empty() {
            return writeln!(out, "  {}", "(sin registros)".dimmed());
        }
        let widths = self.widths();
        writeln!(out, "  {}", Self::line(&self.headers, &widths).bold())?;
        for row in &self.rows {
            writeln!(out, "  {}", Self::line(row, &widths))?;
        }
        Ok(())
    }
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title.bright_cyan().bold())
}

pub fn dashboard<W: Write>(out: &mut W, report: &DashboardReport) -> io::Result<()> {
    writeln!(
        out,
        "{} {} ({} .. {}, al {})",
        "ClinicPulse".bright_cyan().bold(),
        report.period.bright_white().bold(),
        report.start,
        report.end,
        report.as_of
    )?;

    let summary = &report.summary;
    section(out, "Resumen")?;
    let lines = [
        ("Ingresos", money(summary.total_income), summary.income_count),
        ("Gastos", money(summary.total_expenses), summary.expense_count),
    ];
    for (label, amount, count) in lines {
        writeln!(out, "  {:<18} {:>14}  ({} registros)", label, amount, count)?;
    }
    writeln!(out, "  {:<18} {:>14}", "Flujo neto", money(summary.net_cash))?;
    writeln!(out, "  {:<18} {:>14}", "Ticket promedio", money(summary.average_ticket))?;
    writeln!(out, "  {:<18} {:>14}", "Comisiones", money(summary.total_commission))?;
    writeln!(out, "  {:<18} {:>14}", "Utilidad neta", money(summary.total_utility).bright_green())?;

    if !summary.income_by_method.is_empty() {
        section(out, "Ingresos por método de pago")?;
        let mut table = Table::new(&["Método", "Monto"]);
        for (method, amount) in &summary.income_by_method {
            table.row(vec![method.clone(), money(*amount)]);
        }
        table.write(out)?;
    }

    if !summary.expenses_by_category.is_empty() {
        section(out, "Gastos por categoría")?;
        let mut table = Table::new(&["Categoría", "Monto"]);
        for (category, amount) in &summary.expenses_by_category {
            table.row(vec![category.clone(), money(*amount)]);
        }
        table.write(out)?;
    }

    section(out, "Sillones")?;
    let mut table = Table::new(&["Sillón", "Facturación", "Comisión", "Utilidad", "Atenciones", "Horas", "$/hora"]);
    for chair in &report.chairs {
        table.row(vec![
            chair.chair.clone(),
            money(chair.billing),
            money(chair.commission),
            money(chair.utility),
            chair.count.to_string(),
            chair.hours.normalize().to_string(),
            money(chair.revenue_per_hour),
        ]);
    }
    table.write(out)?;

    section(out, "Doctores (pagos liquidados)")?;
    let mut table = Table::new(&["Doctor", "Facturación", "Comisión", "Costo op.", "Aporte neto", "Atenciones"]);
    for doctor in &report.doctors {
        table.row(vec![
            doctor.doctor.clone(),
            money(doctor.billing),
            money(doctor.commission),
            money(doctor.operational_cost),
            money(doctor.net_contribution),
            doctor.count.to_string(),
        ]);
    }
    table.write(out)?;

    section(out, "Tratamientos")?;
    let mut table = Table::new(&[
        "Tratamiento", "Cant.", "Precio", "Comisión", "Insumos", "Costo op.", "Utilidad", "Margen",
    ]);
    for treatment in &report.treatments {
        table.row(vec![
            treatment.treatment.clone(),
            treatment.count.to_string(),
            money(treatment.price),
            money(treatment.commission),
            money(treatment.supplies),
            money(treatment.operational_cost),
            money(treatment.utility),
            percent(treatment.margin_percent),
        ]);
    }
    table.write(out)?;

    section(out, "Metas")?;
    goal_progress(out, &report.goals)?;

    if !report.alerts.is_empty() {
        section(out, "Alertas")?;
        for alert in &report.alerts {
            writeln!(out, "  {}", alert_line(alert))?;
        }
    }

    data_quality(out, report)
}

fn goal_progress<W: Write>(out: &mut W, progress: &[GoalProgress]) -> io::Result<()> {
    let mut table = Table::new(&["Meta", "Objetivo", "Actual", "Proyectado", "% meta", "Estado"]);
    for goal in progress {
        table.row(vec![
            format!("{} {}", goal.category.as_str(), goal.metric.as_str()),
            money(goal.target),
            money(goal.actual),
            money(goal.projected),
            percent(goal.percent_of_target),
            if goal.on_track { "en curso" } else { "bajo meta" }.to_string(),
        ]);
    }
    table.write(out)
}

pub fn alert_line(alert: &Alert) -> String {
    match alert.severity {
        Severity::Critical => format!("{} {}", "[CRÍTICO]".bright_red().bold(), alert.message),
        Severity::Warning => format!("{} {}", "[AVISO]".bright_yellow().bold(), alert.message),
        Severity::Info => format!("{} {}", "[INFO]".bright_blue(), alert.message),
    }
}

fn data_quality<W: Write>(out: &mut W, report: &DashboardReport) -> io::Result<()> {
    let quality = &report.data_quality;
    section(out, "Calidad de datos")?;

    let source = match quality.cost_source {
        CostSource::Configured => "configurado".normal(),
        CostSource::Fallback => "por defecto (configure FIXED_COSTS_MONTHLY y OPERATIONAL_HOURS_MONTHLY)".yellow(),
    };
    writeln!(out, "  Costo por minuto: {}/min, {}", quality.cost_per_minute.round_dp(4), source)?;
    writeln!(out, "  Tabla de alias: v{}", quality.alias_version)?;
    if quality.fallback_commissions > 0 {
        writeln!(
            out,
            "  {} transacciones sin regla de comisión (tasa por defecto)",
            quality.fallback_commissions.to_string().yellow()
        )?;
    }
    if quality.shadowed > 0 || quality.skipped_non_income > 0 {
        writeln!(
            out,
            "  Pagos externos reemplazados: {}, omitidos por no ser ingreso: {}",
            quality.shadowed, quality.skipped_non_income
        )?;
    }
    for item in &quality.needs_review {
        writeln!(
            out,
            "  {} {} {} \"{}\" ({:?})",
            "revisar".yellow(),
            item.date,
            item.id,
            text(item.treatment.as_deref()),
            item.match_quality
        )?;
    }
    for rejected in &quality.rejected {
        writeln!(
            out,
            "  {} {} {}: {}",
            "rechazado".red(),
            rejected.source.as_str(),
            text(rejected.id.as_deref()),
            rejected.reason
        )?;
    }
    Ok(())
}

/// One-line description used after create/edit
pub fn transaction_line(tx: &Transaction) -> String {
    let kind = match tx.kind {
        TransactionKind::Income => "ingreso".green(),
        TransactionKind::Expense => "gasto".red(),
    };
    format!(
        "{} {} {} {} {} [{}]",
        tx.id.bold(),
        tx.date,
        kind,
        money(tx.amount),
        text(tx.treatment_text().or(tx.category.as_deref())),
        tx.status
    )
}

pub fn transactions<W: Write>(out: &mut W, records: &[Transaction]) -> io::Result<()> {
    let mut table = Table::new(&[
        "Fecha", "Hora", "Id", "Tipo", "Monto", "Doctor", "Paciente", "Detalle", "Estado", "Origen",
    ]);
    for tx in records {
        table.row(vec![
            tx.date.to_string(),
            tx.time.map_or_else(|| BLANK.to_string(), |t| t.format("%H:%M").to_string()),
            tx.id.clone(),
            tx.kind.as_str().to_string(),
            money(tx.amount),
            text(tx.doctor.as_deref()),
            text(tx.patient.as_deref()),
            text(tx.treatment_text().or(tx.category.as_deref())),
            tx.status.to_string(),
            tx.source.as_str().to_string(),
        ]);
    }
    table.write(out)?;
    writeln!(out, "  {} transacciones", records.len())
}

pub fn commission_rules<W: Write>(out: &mut W, rules: &[CommissionRule]) -> io::Result<()> {
    let mut table = Table::new(&["Doctor", "Clave", "Tasa"]);
    for rule in rules {
        table.row(vec![rule.doctor.clone(), rule.key.clone(), percent(rule.rate_percent)]);
    }
    table.write(out)
}

pub fn treatment_cost<W: Write>(out: &mut W, cost: &TreatmentCost) -> io::Result<()> {
    writeln!(
        out,
        "{} {}: insumos {}, laboratorio {}",
        "Costo guardado".green(),
        cost.key.bold(),
        money(cost.supply_cost),
        money(cost.lab_cost)
    )
}

pub fn clinic_config<W: Write>(out: &mut W, config: &ClinicConfig) -> io::Result<()> {
    let mut table = Table::new(&["Clave", "Valor"]);
    for (key, value) in config.entries() {
        table.row(vec![key.to_string(), value.normalize().to_string()]);
    }
    table.write(out)?;
    match (config.fixed_costs_monthly(), config.operational_hours_monthly()) {
        (Some(fixed), Some(hours)) => writeln!(out, "  Costos fijos {} sobre {} horas", money(fixed), hours.normalize()),
        _ => writeln!(out, "  {}", "Costos fijos u horas operativas sin configurar".yellow()),
    }
}

pub fn goals<W: Write>(out: &mut W, goals: &[Goal]) -> io::Result<()> {
    let mut table = Table::new(&["Categoría", "Métrica", "Objetivo"]);
    for goal in goals {
        table.row(vec![
            goal.category.as_str().to_string(),
            goal.metric.as_str().to_string(),
            money(goal.target),
        ]);
    }
    table.write(out)
}
