//! Property tests for the pure parts of the engine

use chrono::NaiveDate;
use config_engine::EngineSettings;
use finance_service::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn catalog() -> TreatmentMatcher {
    TreatmentMatcher::new(
        vec![
            Treatment {
                name: "Corona".to_string(),
                category: Some("Rehabilitación".to_string()),
                duration_minutes: Some(60),
                price: Decimal::new(400, 0),
            },
            Treatment {
                name: "Profilaxis".to_string(),
                category: Some("Preventiva".to_string()),
                duration_minutes: Some(30),
                price: Decimal::new(35, 0),
            },
        ],
        vec![TreatmentCost {
            key: "corona".to_string(),
            supply_cost: Decimal::new(30, 0),
            lab_cost: Decimal::new(250, 0),
        }],
        AliasTable::builtin(),
    )
}

fn income(cents: i64, treatment: &str, doctor: &str) -> Transaction {
    Transaction {
        id: "p".to_string(),
        amount: Decimal::new(cents, 2),
        date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        time: None,
        kind: TransactionKind::Income,
        doctor: Some(doctor.to_string()),
        patient: None,
        treatment: Some(treatment.to_string()),
        chair: None,
        payment_method: None,
        invoice_number: None,
        status: PaymentStatus::Pagado,
        source: TransactionSource::Local,
        description: None,
        category: None,
    }
}

fn rule_strategy() -> impl Strategy<Value = CommissionRule> {
    (
        prop::sample::select(vec!["Dra. Paez", "DRA. PÁEZ", "Dr. Vera"]),
        prop::sample::select(vec!["_default", "Ortodoncia", "Corona", "corona"]),
        0i64..=100,
    )
        .prop_map(|(doctor, key, percent)| CommissionRule {
            doctor: doctor.to_string(),
            key: key.to_string(),
            rate_percent: Decimal::new(percent, 0),
        })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(input in "[a-zA-ZáéíóúÁÉÍÓÚñÑüÜ .\t]{0,40}") {
        let once = normalize(&input);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert_eq!(normalize(&input.to_uppercase()), once);
    }

    #[test]
    fn net_utility_stays_within_amount(
        cents in 0i64..2_000_000,
        treatment in prop::sample::select(vec!["Corona", "Profilaxis", "limpieza", "Endodoncia", ""]),
        doctor in prop::sample::select(vec!["Dra. Paez", "Dr. Vera"]),
        percent in 0i64..=100,
        minutes_per_month in 1i64..20_000,
    ) {
        let enricher = Enricher::new(
            catalog(),
            CommissionResolver::new(
                &[CommissionRule {
                    doctor: "Dra. Paez".to_string(),
                    key: "_default".to_string(),
                    rate_percent: Decimal::new(percent, 0),
                }],
                Decimal::new(33, 2),
            ),
            CostResolver::from_config(
                &ClinicConfig::new()
                    .with(ClinicConfig::FIXED_COSTS_MONTHLY, Decimal::new(2000, 0))
                    .with(ClinicConfig::OPERATIONAL_HOURS_MONTHLY, Decimal::new(minutes_per_month, 2)),
                Decimal::new(33, 2),
            ),
            EngineSettings::default(),
        );

        let tx = income(cents, treatment, doctor);
        let enriched = enricher.enrich(&tx).unwrap();
        prop_assert!(enriched.net_utility >= Decimal::ZERO);
        prop_assert!(enriched.net_utility <= tx.amount);
    }

    #[test]
    fn commission_ignores_rule_order(
        rules in prop::collection::vec(rule_strategy(), 0..12),
        doctor in prop::sample::select(vec!["Dra. Paez", "Dr. Vera", "Dr. Nadie"]),
        category in prop::option::of(prop::sample::select(vec!["Ortodoncia", "Rehabilitación"])),
        treatment in prop::option::of(prop::sample::select(vec!["Corona", "Profilaxis"])),
    ) {
        let forward = CommissionResolver::new(&rules, Decimal::new(33, 2));
        let mut reversed_rules = rules.clone();
        reversed_rules.reverse();
        let reversed = CommissionResolver::new(&reversed_rules, Decimal::new(33, 2));

        let a = forward.resolve(Some(doctor), category, treatment);
        let b = reversed.resolve(Some(doctor), category, treatment);
        prop_assert_eq!(a, b);
        prop_assert!(a.rate >= Decimal::ZERO && a.rate <= Decimal::ONE);
    }

    #[test]
    fn csv_rows_have_ten_columns(
        cents in 0i64..1_000_000,
        treatment in prop::option::of("[a-zA-Z ,\"]{0,20}"),
        patient in prop::option::of("[a-zA-Z ]{0,20}"),
    ) {
        let mut tx = income(cents, "", "Dra. Paez");
        tx.treatment = treatment;
        tx.patient = patient;

        let mut out = Vec::new();
        export_income_csv(&[tx], &mut out).unwrap();

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(out.as_slice());
        let header = reader.headers().unwrap().clone();
        prop_assert_eq!(header.iter().collect::<Vec<_>>(), ENGLISH_HEADER.to_vec());
        for record in reader.records() {
            let record = record.unwrap();
            prop_assert_eq!(record.len(), 10);
            prop_assert!(record.iter().all(|field| !field.is_empty()));
        }
    }
}

#[test]
fn cost_per_minute_example() {
    let config = ClinicConfig::new()
        .with(ClinicConfig::FIXED_COSTS_MONTHLY, Decimal::new(2000, 0))
        .with(ClinicConfig::OPERATIONAL_HOURS_MONTHLY, Decimal::new(160, 0));
    let costs = CostResolver::from_config(&config, Decimal::new(33, 2));

    assert_eq!(costs.cost_per_minute().round_dp(4), Decimal::new(2083, 4));
    assert_eq!(costs.operational_cost(30), Decimal::new(625, 2));
}

#[test]
fn commission_cascade_example() {
    let rules = vec![
        CommissionRule { doctor: "Dra. Paez".to_string(), key: "_default".to_string(), rate_percent: Decimal::new(30, 0) },
        CommissionRule { doctor: "Dra. Paez".to_string(), key: "Ortodoncia".to_string(), rate_percent: Decimal::new(50, 0) },
        CommissionRule { doctor: "Dra. Paez".to_string(), key: "Control Autoligados".to_string(), rate_percent: Decimal::new(10, 0) },
    ];
    let resolver = CommissionResolver::new(&rules, Decimal::new(33, 2));

    assert_eq!(
        resolver.resolve_rate(Some("Dra. Paez"), Some("Ortodoncia"), Some("Control Autoligados")),
        Decimal::new(10, 2)
    );
}

#[test]
fn projection_example() {
    assert_eq!(project(Decimal::new(10_000, 0), 10, 30), Decimal::new(30_000, 0));

    let goals = Goals::new(vec![Goal {
        category: GoalCategory::Billing,
        metric: GoalMetric::Monthly,
        target: Decimal::new(25_000, 0),
    }]);
    let evaluation = evaluate_goals(
        Decimal::new(10_000, 0),
        Decimal::new(10_000, 0),
        &[],
        &goals,
        MonthToDate { days_elapsed: 10, days_in_month: 30 },
    );
    assert!(evaluation.alerts.iter().all(|a| a.severity != Severity::Critical));
}
