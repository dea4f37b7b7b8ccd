// Month-end projection and goal alerts
use crate::models::{ChairSummary, GoalCategory, GoalMetric, Goals};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Descriptive alert for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
    pub shortfall: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub category: GoalCategory,
    pub metric: GoalMetric,
    pub target: Decimal,
    pub actual: Decimal,
    pub projected: Decimal,
    /// Projected value as a percentage of the target
    pub percent_of_target: Decimal,
    pub on_track: bool,
}

/// Position within the projected period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthToDate {
    pub days_elapsed: u32,
    pub days_in_month: u32,
}

impl MonthToDate {
    /// Day `date.day()` of the month containing `date`
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            days_elapsed: date.day(),
            days_in_month: days_in_month(date.year(), date.month()),
        }
    }

    /// Days of `[start, end]` elapsed by `today`, clamped to the range
    pub fn for_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Self {
        let total = u32::try_from((end - start).num_days() + 1).unwrap_or(1).max(1);
        let elapsed = u32::try_from((today - start).num_days() + 1).unwrap_or(1).clamp(1, total);
        Self {
            days_elapsed: elapsed,
            days_in_month: total,
        }
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => u32::try_from((next - first).num_days()).unwrap_or(30),
        _ => 30,
    }
}

/// Straight-line run-rate projection to the end of the period
pub fn project(actual: Decimal, days_elapsed: u32, days_in_month: u32) -> Decimal {
    let days_in_month = days_in_month.max(1);
    let elapsed = days_elapsed.clamp(1, days_in_month);
    actual * Decimal::from(days_in_month) / Decimal::from(elapsed)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalEvaluation {
    pub progress: Vec<GoalProgress>,
    pub alerts: Vec<Alert>,
}

fn progress(category: GoalCategory, target: Decimal, actual: Decimal, mtd: MonthToDate) -> GoalProgress {
    let projected = project(actual, mtd.days_elapsed, mtd.days_in_month);
    GoalProgress {
        category,
        metric: GoalMetric::Monthly,
        target,
        actual,
        projected,
        percent_of_target: if target > Decimal::ZERO {
            (projected / target * Decimal::ONE_HUNDRED).round_dp(1)
        } else {
            Decimal::ZERO
        },
        on_track: projected >= target,
    }
}

/// Compare projected billing and utility against the monthly goals and flag weak chairs
pub fn evaluate_goals(
    billing: Decimal,
    utility: Decimal,
    chairs: &[ChairSummary],
    goals: &Goals,
    mtd: MonthToDate,
) -> GoalEvaluation {
    let mut evaluation = GoalEvaluation::default();

    if let Some(target) = goals.target(GoalCategory::Billing, GoalMetric::Monthly) {
        let billing = progress(GoalCategory::Billing, target, billing, mtd);
        if !billing.on_track {
            let shortfall = (target - billing.projected).round_dp(2);
            evaluation.alerts.push(Alert {
                severity: Severity::Critical,
                message: format!(
                    "Facturación proyectada ${} por debajo de la meta ${} (faltan ${})",
                    billing.projected.round_dp(2),
                    target,
                    shortfall
                ),
                shortfall: Some(shortfall),
            });
        }
        evaluation.progress.push(billing);
    }

    if let Some(target) = goals.target(GoalCategory::Utility, GoalMetric::Monthly) {
        let utility = progress(GoalCategory::Utility, target, utility, mtd);
        if !utility.on_track {
            let shortfall = (target - utility.projected).round_dp(2);
            evaluation.alerts.push(Alert {
                severity: Severity::Warning,
                message: format!(
                    "Utilidad proyectada ${} por debajo de la meta ${} (faltan ${})",
                    utility.projected.round_dp(2),
                    target,
                    shortfall
                ),
                shortfall: Some(shortfall),
            });
        }
        evaluation.progress.push(utility);
    }

    if let Some(daily_target) = goals.target(GoalCategory::Chair, GoalMetric::Daily) {
        let weak: Vec<&str> = chairs
            .iter()
            .filter(|c| c.count > 0 && c.billing / Decimal::from(c.count) < daily_target)
            .map(|c| c.chair.as_str())
            .collect();
        if !weak.is_empty() {
            evaluation.alerts.push(Alert {
                severity: Severity::Info,
                message: format!(
                    "Sillones bajo la meta diaria de ${}: {}",
                    daily_target,
                    weak.join(", ")
                ),
                shortfall: None,
            });
        }
    }

    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Goal;

    fn chair(name: &str, billing: i64, count: usize) -> ChairSummary {
        ChairSummary {
            chair: name.to_string(),
            billing: Decimal::new(billing, 0),
            commission: Decimal::ZERO,
            utility: Decimal::ZERO,
            count,
            hours: Decimal::ZERO,
            revenue_per_hour: Decimal::ZERO,
        }
    }

    #[test]
    fn test_linear_projection() {
        assert_eq!(project(Decimal::new(10_000, 0), 10, 30), Decimal::new(30_000, 0));
        // Day zero is treated as day one
        assert_eq!(project(Decimal::new(500, 0), 0, 30), Decimal::new(15_000, 0));
        assert_eq!(project(Decimal::new(500, 0), 45, 30), Decimal::new(500, 0));
    }

    #[test]
    fn test_month_to_date() {
        let mtd = MonthToDate::for_date(NaiveDate::from_ymd_opt(2028, 2, 10).unwrap());
        assert_eq!(mtd.days_elapsed, 10);
        assert_eq!(mtd.days_in_month, 29);
        assert_eq!(days_in_month(2026, 12), 31);
    }

    #[test]
    fn test_range_clamps_future_and_past() {
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();

        let after = MonthToDate::for_range(start, end, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(after.days_elapsed, 30);
        let before = MonthToDate::for_range(start, end, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(before.days_elapsed, 1);
    }

    #[test]
    fn test_no_critical_when_projection_meets_goal() {
        let goals = Goals::new(vec![Goal {
            category: GoalCategory::Billing,
            metric: GoalMetric::Monthly,
            target: Decimal::new(25_000, 0),
        }]);
        let mtd = MonthToDate {
            days_elapsed: 10,
            days_in_month: 30,
        };

        let evaluation = evaluate_goals(Decimal::new(10_000, 0), Decimal::new(5_000, 0), &[], &goals, mtd);
        assert!(evaluation.alerts.iter().all(|a| a.severity != Severity::Critical));
        assert_eq!(evaluation.progress[0].projected, Decimal::new(30_000, 0));
        assert!(evaluation.progress[0].on_track);
        // Utility projects to 15000 against the 12000 default
        assert!(evaluation.alerts.is_empty());
    }

    #[test]
    fn test_shortfall_alerts() {
        let mtd = MonthToDate {
            days_elapsed: 15,
            days_in_month: 30,
        };
        let chairs = vec![chair("Sillón 1", 600, 3), chair("Sillón 2", 200, 2)];

        let evaluation = evaluate_goals(Decimal::new(10_000, 0), Decimal::new(4_000, 0), &chairs, &Goals::default(), mtd);

        let critical = evaluation.alerts.iter().find(|a| a.severity == Severity::Critical).unwrap();
        assert_eq!(critical.shortfall, Some(Decimal::new(10_000, 0)));
        let warning = evaluation.alerts.iter().find(|a| a.severity == Severity::Warning).unwrap();
        assert_eq!(warning.shortfall, Some(Decimal::new(4_000, 0)));
        let info = evaluation.alerts.iter().find(|a| a.severity == Severity::Info).unwrap();
        assert!(info.message.contains("Sillón 2"));
        assert!(!info.message.contains("Sillón 1"));
    }
}
