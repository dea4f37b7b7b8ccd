// Rollups by chair, doctor and treatment, plus the period summary
use crate::models::{
    ChairSummary, DoctorSummary, EnrichedTransaction, FinancialSummary, Transaction, TransactionKind,
    TreatmentSummary,
};
use crate::normalize::normalize;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub const NO_CHAIR: &str = "Sin sillón";
pub const NO_DOCTOR: &str = "Sin doctor";
pub const NO_TREATMENT: &str = "Sin tratamiento";
const UNSPECIFIED: &str = "Sin especificar";

/// Group by normalized label; the first spelling seen is kept for display
fn group_by_label<'a, F>(records: &[&'a EnrichedTransaction], fallback: &str, label: F) -> Vec<(String, Vec<&'a EnrichedTransaction>)>
where
    F: Fn(&'a EnrichedTransaction) -> Option<&'a str>,
{
    records
        .iter()
        .map(|&r| {
            let display = label(r).map(str::trim).filter(|s| !s.is_empty()).unwrap_or(fallback);
            (normalize(display), display.to_string(), r)
        })
        .into_group_map_by(|(key, _, _)| key.clone())
        .into_values()
        .filter_map(|members| {
            let display = members.first()?.1.clone();
            Some((display, members.into_iter().map(|(_, _, r)| r).collect()))
        })
        .collect()
}

fn sum_by<F>(records: &[&EnrichedTransaction], field: F) -> Decimal
where
    F: Fn(&EnrichedTransaction) -> Decimal,
{
    records.iter().map(|r| field(r)).sum()
}

fn desc_then_name(a: Decimal, b: Decimal, name_a: &str, name_b: &str) -> Ordering {
    b.cmp(&a).then_with(|| name_a.cmp(name_b))
}

/// Chair rollup sorted by billing, highest first
pub fn aggregate_by_chair(records: &[EnrichedTransaction], hours_per_transaction: Decimal) -> Vec<ChairSummary> {
    let all: Vec<&EnrichedTransaction> = records.iter().collect();

    group_by_label(&all, NO_CHAIR, |r| r.transaction.chair.as_deref())
        .into_iter()
        .map(|(chair, members)| {
            let billing = sum_by(&members, |r| r.transaction.amount);
            let hours = hours_per_transaction * Decimal::from(members.len());
            ChairSummary {
                chair,
                billing,
                commission: sum_by(&members, |r| r.commission_amount),
                utility: sum_by(&members, |r| r.net_utility),
                count: members.len(),
                hours,
                revenue_per_hour: if hours > Decimal::ZERO { billing / hours } else { Decimal::ZERO },
            }
        })
        .sorted_by(|a, b| desc_then_name(a.billing, b.billing, &a.chair, &b.chair))
        .collect()
}

/// Doctor rollup over settled income only, sorted by net contribution
pub fn aggregate_by_doctor(records: &[EnrichedTransaction]) -> Vec<DoctorSummary> {
    let settled: Vec<&EnrichedTransaction> = records
        .iter()
        .filter(|r| r.transaction.status.is_settled())
        .collect();

    group_by_label(&settled, NO_DOCTOR, |r| r.transaction.doctor.as_deref())
        .into_iter()
        .map(|(doctor, members)| {
            let billing = sum_by(&members, |r| r.transaction.amount);
            let commission = sum_by(&members, |r| r.commission_amount);
            let operational_cost = sum_by(&members, |r| r.operational_cost);
            DoctorSummary {
                doctor,
                billing,
                commission,
                operational_cost,
                net_contribution: billing - commission - operational_cost,
                count: members.len(),
            }
        })
        .sorted_by(|a, b| desc_then_name(a.net_contribution, b.net_contribution, &a.doctor, &b.doctor))
        .collect()
}

/// Treatment rollup sorted by utility; unmatched records group under their raw text
pub fn aggregate_by_treatment(records: &[EnrichedTransaction]) -> Vec<TreatmentSummary> {
    let all: Vec<&EnrichedTransaction> = records.iter().collect();

    group_by_label(&all, NO_TREATMENT, |r| {
        r.matched_treatment.as_deref().or_else(|| r.transaction.treatment_text())
    })
    .into_iter()
    .map(|(treatment, members)| {
        let price = sum_by(&members, |r| r.transaction.amount);
        let utility = sum_by(&members, |r| r.net_utility);
        TreatmentSummary {
            treatment,
            count: members.len(),
            price,
            commission: sum_by(&members, |r| r.commission_amount),
            supplies: sum_by(&members, |r| r.supplies_cost),
            operational_cost: sum_by(&members, |r| r.operational_cost),
            utility,
            margin_percent: if price > Decimal::ZERO {
                utility / price * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            },
        }
    })
    .sorted_by(|a, b| desc_then_name(a.utility, b.utility, &a.treatment, &b.treatment))
    .collect()
}

/// Cash totals over every transaction plus commission/utility totals over enriched income
pub fn summarize(transactions: &[Transaction], enriched: &[EnrichedTransaction]) -> FinancialSummary {
    let mut summary = FinancialSummary::default();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => {
                summary.total_income += tx.amount;
                summary.income_count += 1;
                *summary
                    .income_by_method
                    .entry(label_or(tx.payment_method.as_deref(), UNSPECIFIED))
                    .or_default() += tx.amount;
            }
            TransactionKind::Expense => {
                summary.total_expenses += tx.amount;
                summary.expense_count += 1;
                *summary
                    .expenses_by_category
                    .entry(label_or(tx.category.as_deref(), UNSPECIFIED))
                    .or_default() += tx.amount;
            }
        }
    }

    summary.net_cash = summary.total_income - summary.total_expenses;
    if summary.income_count > 0 {
        summary.average_ticket = summary.total_income / Decimal::from(summary.income_count);
    }
    summary.total_commission = enriched.iter().map(|r| r.commission_amount).sum();
    summary.total_utility = enriched.iter().map(|r| r.net_utility).sum();
    summary
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
