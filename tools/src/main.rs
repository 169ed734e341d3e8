//! shortfall-runner: headless runner for the staffing shortfall simulation.
//!
//! Usage:
//!   shortfall-runner --attendance ponto.csv --schedule escala.csv --demand demanda.csv
//!   shortfall-runner --rates absenteeism.csv --schedule escala.csv --demand demanda.csv \
//!       --scenarios 5000 --seed 42 --out-dir ./outputs --export-scenarios

use anyhow::{bail, Context, Result};
use shortfall_core::{
    absenteeism::calculate_absenteeism,
    config::{MissingRatePolicy, RateMatching, SimConfig},
    engine::{SimEngine, SimInputs, SimulationReport},
    export,
    ingest,
};
use std::env;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.scenarios = parse_arg(&args, "--scenarios", config.scenarios)?;
    if let Some(seed) = flag_value(&args, "--seed") {
        config.seed = Some(seed.parse().with_context(|| format!("invalid --seed {seed}"))?);
    }
    if has_flag(&args, "--month-aware") {
        config.rate_matching = RateMatching::WorkerAndMonth;
    }
    if let Some(policy) = flag_value(&args, "--missing-rate") {
        config.missing_rate_policy = parse_policy(policy)?;
    }
    config.validate()?;

    let out_dir = Path::new(flag_value(&args, "--out-dir").unwrap_or("./outputs"));
    let schedule_path = require(&args, "--schedule")?;
    let demand_path = require(&args, "--demand")?;

    println!("Staffing shortfall - shortfall-runner");
    println!("  scenarios:  {}", config.scenarios);
    println!("  seed:       {}", config.seed.map_or("random".to_string(), |s| s.to_string()));
    println!("  matching:   {:?}", config.rate_matching);
    println!("  missing:    {:?}", config.missing_rate_policy);
    println!("  out_dir:    {}", out_dir.display());
    println!();

    std::fs::create_dir_all(out_dir)?;
    let rates = load_rates(&args, &config, out_dir)?;
    let inputs = SimInputs {
        rates,
        schedule: ingest::read_schedule(open(schedule_path)?, &config)?,
        demand: ingest::read_demand(open(demand_path)?, &config)?,
    };

    let engine = SimEngine::new(config);
    let report = engine.run(&inputs)?;
    export::write_aggregates(out_dir, &report.aggregates)?;

    if has_flag(&args, "--export-scenarios") {
        // Same seed, so the scenario rows match the aggregates above.
        let mut replay = engine.config().clone();
        replay.seed = Some(report.seed);
        let table = SimEngine::new(replay).reconcile(&inputs)?;
        let path = out_dir.join(export::SCENARIO_FILE);
        export::write_scenarios(File::create(&path)?, &table.rows)?;
        log::info!("wrote {} scenario rows to {}", table.rows.len(), path.display());
    }

    print_summary(&report)?;
    Ok(())
}

/// Rates come either precomputed (`--rates`) or from raw attendance (`--attendance`).
fn load_rates(
    args: &[String],
    config: &SimConfig,
    out_dir: &Path,
) -> Result<Vec<shortfall_core::types::AbsenteeismRate>> {
    if let Some(path) = flag_value(args, "--rates") {
        return Ok(ingest::read_rates(open(path)?, config)?);
    }
    let Some(path) = flag_value(args, "--attendance") else {
        bail!("one of --rates or --attendance is required");
    };
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read {path}"))?;
    let text = if has_flag(args, "--latin1") {
        ingest::decode_latin1(&bytes)
    } else {
        String::from_utf8(bytes).with_context(|| format!("{path} is not UTF-8; try --latin1"))?
    };
    let days = ingest::read_attendance(Cursor::new(text), config)?;
    let rates = calculate_absenteeism(&days, config.working_days_per_month);

    let rates_path = out_dir.join(export::ABSENTEEISM_FILE);
    export::write_absenteeism(File::create(&rates_path)?, &rates, config)?;
    println!("Absenteeism: {} worker-month rates -> {}", rates.len(), rates_path.display());
    for r in rates.iter().take(5) {
        println!("  {} {} absent={} rate={:.3}", r.worker_id, r.month, r.absent_days, r.rate);
    }
    println!();
    Ok(rates)
}

fn print_summary(report: &SimulationReport) -> Result<()> {
    let agg = &report.aggregates;
    println!("=== RUN SUMMARY ===");
    println!("  run_id:             {}", report.run_id);
    println!("  seed:               {}", report.seed);
    println!("  scenarios:          {}", report.scenarios);
    println!("  presence expected:  {}", report.presence_expected);
    println!("  demand rows:        {}", report.demand_rows);
    println!("  elapsed:            {} ms", report.elapsed_ms);
    println!();
    println!("=== BRANCH EXPECTATION ===");
    if agg.branches.is_empty() {
        println!("  (No demand rows)");
    }
    for b in &agg.branches {
        println!(
            "  {} | required/day: {:.2} | expected unmet/day: {:.3} | total: {:.2}",
            b.branch, b.mean_required, b.mean_expected_unmet, b.sum_expected_unmet
        );
    }

    let header = serde_json::json!({
        "run_id": report.run_id,
        "seed": report.seed,
        "scenarios": report.scenarios,
        "presence_expected": report.presence_expected,
        "demand_rows": report.demand_rows,
        "elapsed_ms": report.elapsed_ms,
        "slots": agg.slots.len(),
        "roles": agg.roles.len(),
        "branches": agg.branches.len(),
    });
    println!();
    println!("{}", serde_json::to_string_pretty(&header)?);
    Ok(())
}

fn parse_policy(raw: &str) -> Result<MissingRatePolicy> {
    Ok(match raw {
        "reject"         => MissingRatePolicy::Reject,
        "assume_present" => MissingRatePolicy::AssumePresent,
        "assume_absent"  => MissingRatePolicy::AssumeAbsent,
        other => bail!("unknown --missing-rate '{other}' (reject|assume_present|assume_absent)"),
    })
}

fn open(path: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Cannot open {path}"))
}

fn require<'a>(args: &'a [String], flag: &str) -> Result<&'a str> {
    flag_value(args, flag).with_context(|| format!("{flag} <file> is required"))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T>(args: &[String], flag: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match flag_value(args, flag) {
        Some(raw) => raw.parse().with_context(|| format!("invalid {flag} {raw}")),
        None => Ok(default),
    }
}
