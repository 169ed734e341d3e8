//! End-to-end runs through SimEngine: statistical expectations, degenerate
//! cases, empty inputs and the pre-sampling guards.

use chrono::NaiveDate;
use shortfall_core::{
    aggregate::slot_expectations,
    config::{MissingRatePolicy, SimConfig},
    engine::{SimEngine, SimInputs},
    types::{AbsenteeismRate, DemandRow, ScheduleAssignment, YearMonth},
    SimError,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn assign(day: u32, branch: &str, role: &str, worker: &str) -> ScheduleAssignment {
    ScheduleAssignment {
        date: date(day),
        branch: branch.into(),
        role: role.into(),
        worker_id: worker.into(),
        marker: "E".into(),
    }
}

fn demand(day: u32, branch: &str, role: &str, band: &str, q: u32) -> DemandRow {
    DemandRow {
        date: date(day),
        branch: branch.into(),
        role: role.into(),
        time_band: band.into(),
        required_quantity: q,
    }
}

fn rate(worker: &str, r: f64) -> AbsenteeismRate {
    AbsenteeismRate {
        worker_id: worker.into(),
        month: YearMonth::new(2024, 3).unwrap(),
        absent_days: 0,
        rate: r,
    }
}

fn single_worker(r: f64) -> SimInputs {
    SimInputs {
        rates: vec![rate("ANA", r)],
        schedule: vec![assign(1, "101", "GUARD", "ANA")],
        demand: vec![demand(1, "101", "GUARD", "08-12", 1)],
    }
}

fn crew(r: f64) -> SimInputs {
    SimInputs {
        rates: ["ANA", "BRUNO", "CAIO"].iter().map(|w| rate(w, r)).collect(),
        schedule: vec![
            assign(1, "101", "GUARD", "ANA"),
            assign(1, "101", "GUARD", "BRUNO"),
            assign(2, "101", "GUARD", "ANA"),
            assign(1, "102", "DRIVER", "CAIO"),
        ],
        demand: vec![
            demand(1, "101", "GUARD", "08-12", 3),
            demand(1, "101", "GUARD", "12-18", 1),
            demand(2, "101", "GUARD", "08-12", 2),
            demand(1, "102", "DRIVER", "08-12", 1),
            demand(1, "103", "DRIVER", "08-12", 2),
        ],
    }
}

fn run(config: SimConfig, inputs: &SimInputs) -> shortfall_core::SimulationReport {
    SimEngine::new(config).run(inputs).expect("run")
}

// ── Expectations ─────────────────────────────────────────────────────────────

#[test]
fn coin_flip_worker_leaves_half_a_slot_unmet() {
    let report = run(SimConfig::default_test(2024).with_scenarios(10_000), &single_worker(0.5));

    assert_eq!(report.aggregates.slots.len(), 1);
    let e = report.aggregates.slots[0].expected_unmet;
    assert!((e - 0.5).abs() < 0.02, "expected_unmet={e}, want ~0.5");
}

#[test]
fn zero_absence_gives_deterministic_shortfall() {
    let report = run(SimConfig::default_test(1).with_scenarios(300), &crew(0.0));
    let slots = &report.aggregates.slots;

    let by_key = |day: u32, branch: &str, band: &str| {
        slots
            .iter()
            .find(|s| s.date == date(day) && s.branch == branch && s.time_band == band)
            .unwrap()
            .expected_unmet
    };
    // 2 scheduled vs 3 and 1 required; 1 vs 2; 1 vs 1; nobody vs 2.
    assert_eq!(by_key(1, "101", "08-12"), 1.0);
    assert_eq!(by_key(1, "101", "12-18"), 0.0);
    assert_eq!(by_key(2, "101", "08-12"), 1.0);
    assert_eq!(by_key(1, "102", "08-12"), 0.0);
    assert_eq!(by_key(1, "103", "08-12"), 2.0);
}

#[test]
fn full_absence_leaves_all_demand_unmet() {
    let report = run(SimConfig::default_test(1).with_scenarios(300), &crew(1.0));

    for s in &report.aggregates.slots {
        assert_eq!(s.expected_unmet, s.required_quantity as f64);
    }
}

#[test]
fn estimates_tighten_as_scenarios_grow() {
    let spread = |n: u32| {
        let estimates: Vec<f64> = (0..20u64)
            .map(|seed| {
                run(SimConfig::default_test(seed).with_scenarios(n), &single_worker(0.3))
                    .aggregates
                    .slots[0]
                    .expected_unmet
            })
            .collect();
        let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
        estimates.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / estimates.len() as f64
    };

    let coarse = spread(50);
    let fine = spread(5_000);
    assert!(fine < coarse, "variance should shrink: N=50 -> {coarse}, N=5000 -> {fine}");
}

// ── Empty inputs ─────────────────────────────────────────────────────────────

#[test]
fn no_demand_gives_empty_tables_without_error() {
    let mut inputs = crew(0.2);
    inputs.demand.clear();

    let report = run(SimConfig::default_test(1), &inputs);

    assert_eq!(report.presence_expected, 0, "no demand dates means no presence-expected rows");
    assert!(report.aggregates.slots.is_empty());
    assert!(report.aggregates.role_days.is_empty());
    assert!(report.aggregates.roles.is_empty());
    assert!(report.aggregates.branches.is_empty());
}

#[test]
fn empty_inputs_can_be_rejected() {
    let mut inputs = crew(0.2);
    inputs.demand.clear();
    let config = SimConfig { reject_empty_inputs: true, ..SimConfig::default_test(1) };

    let err = SimEngine::new(config).run(&inputs).unwrap_err();
    assert!(matches!(err, SimError::EmptyInput { .. }), "got {err:?}");
}

#[test]
fn nobody_scheduled_means_required_is_unmet() {
    let mut inputs = crew(0.2);
    inputs.schedule.clear();

    let report = run(SimConfig::default_test(1).with_scenarios(10), &inputs);
    assert_eq!(report.aggregates.slots.len(), 5);
    for s in &report.aggregates.slots {
        assert_eq!(s.expected_unmet, s.required_quantity as f64);
    }
}

// ── Guards ───────────────────────────────────────────────────────────────────

#[test]
fn scenario_count_is_validated() {
    for scenarios in [0, 10_001] {
        let err = SimEngine::new(SimConfig::default_test(1).with_scenarios(scenarios))
            .run(&crew(0.1))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { .. }), "N={scenarios}: got {err:?}");
    }
}

#[test]
fn row_budget_is_enforced_before_sampling() {
    let config = SimConfig { max_scenario_rows: 100, ..SimConfig::default_test(1).with_scenarios(1000) };

    match SimEngine::new(config).run(&crew(0.1)) {
        Err(SimError::BudgetExceeded { rows, limit }) => {
            // 1000 * (4 presence-expected + 5 demand)
            assert_eq!(rows, 9_000);
            assert_eq!(limit, 100);
        }
        other => panic!("expected BudgetExceeded, got {other:?}"),
    }
}

#[test]
fn generous_time_budget_does_not_interfere() {
    let config = SimConfig { time_budget_ms: Some(600_000), ..SimConfig::default_test(5) };
    let report = run(config, &crew(0.3));
    assert_eq!(report.scenarios, 1000);
}

#[test]
fn missing_rate_aborts_the_run() {
    let mut inputs = crew(0.1);
    inputs.rates.retain(|r| r.worker_id != "CAIO");

    let err = SimEngine::new(SimConfig::default_test(1)).run(&inputs).unwrap_err();
    assert!(matches!(err, SimError::MissingRate { .. }), "got {err:?}");

    let lenient = SimConfig {
        missing_rate_policy: MissingRatePolicy::AssumeAbsent,
        ..SimConfig::default_test(1).with_scenarios(50)
    };
    let report = run(lenient, &inputs);
    let driver = report.aggregates.slots.iter().find(|s| s.branch == "102").unwrap();
    assert_eq!(driver.expected_unmet, 1.0);
}

// ── Scenario table ───────────────────────────────────────────────────────────

#[test]
fn materialized_scenarios_match_the_streamed_run() {
    let inputs = crew(0.35);
    let config = SimConfig { batch_size: 7, ..SimConfig::default_test(77).with_scenarios(120) };

    let report = run(config.clone(), &inputs);
    let table = SimEngine::new(config).reconcile(&inputs).unwrap();

    assert_eq!(table.rows.len(), 120 * inputs.demand.len());
    assert_eq!(table.presence_expected.len(), 4);
    assert_eq!(slot_expectations(&table.rows), report.aggregates.slots);
}

#[test]
fn unseeded_run_records_a_replayable_seed() {
    let inputs = crew(0.4);
    let first = run(SimConfig { seed: None, ..SimConfig::default().with_scenarios(200) }, &inputs);
    let replay = run(SimConfig::default_test(first.seed).with_scenarios(200), &inputs);

    assert_eq!(first.aggregates, replay.aggregates);
}
