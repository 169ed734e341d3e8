//! CSV export of run outputs.
//!
//! Flat tables only; headers are the field names. Dates render as ISO
//! `YYYY-MM-DD`, months as `YYYY-MM`.
//!
//! Result tables are comma-separated. The absenteeism table is also an
//! input (`read_rates`), so it is written with the configured input delimiter.

use crate::{
    aggregate::Aggregates,
    config::SimConfig,
    error::SimResult,
    sampler::ReconciledSlot,
    types::{AbsenteeismRate, BranchCode, Role, Scenario, TimeBand},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SLOT_FILE: &str = "slot_expectation.csv";
pub const ROLE_DAY_FILE: &str = "role_day_expectation.csv";
pub const ROLE_FILE: &str = "role_expectation.csv";
pub const BRANCH_FILE: &str = "branch_expectation.csv";
pub const SCENARIO_FILE: &str = "scenarios.csv";
pub const ABSENTEEISM_FILE: &str = "absenteeism.csv";

/// Flat form of a reconciled scenario row.
#[derive(Debug, Serialize)]
struct ScenarioRecord<'a> {
    scenario: Scenario,
    date: NaiveDate,
    branch: &'a BranchCode,
    role: &'a Role,
    time_band: &'a TimeBand,
    required_quantity: u32,
    n_present: u32,
    unmet: u32,
}

/// Write any serializable rows as CSV with a header line.
pub fn write_table<W: Write, T: Serialize>(out: W, rows: &[T]) -> SimResult<()> {
    write_delimited(out, rows, b',')
}

fn write_delimited<W: Write, T: Serialize>(out: W, rows: &[T], delimiter: u8) -> SimResult<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_scenarios<W: Write>(out: W, rows: &[ReconciledSlot<'_>]) -> SimResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    for r in rows {
        writer.serialize(ScenarioRecord {
            scenario:          r.scenario,
            date:              r.demand.date,
            branch:            &r.demand.branch,
            role:              &r.demand.role,
            time_band:         &r.demand.time_band,
            required_quantity: r.required_quantity(),
            n_present:         r.n_present,
            unmet:             r.unmet,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Readable back with `ingest::read_rates` under the same config.
pub fn write_absenteeism<W: Write>(
    out: W,
    rates: &[AbsenteeismRate],
    config: &SimConfig,
) -> SimResult<()> {
    write_delimited(out, rates, config.csv_delimiter_byte())
}

/// Write the four aggregate tables into `dir`. Returns the written paths.
pub fn write_aggregates(dir: &Path, aggregates: &Aggregates) -> SimResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let targets = [SLOT_FILE, ROLE_DAY_FILE, ROLE_FILE, BRANCH_FILE].map(|f| dir.join(f));
    write_table(std::fs::File::create(&targets[0])?, &aggregates.slots)?;
    write_table(std::fs::File::create(&targets[1])?, &aggregates.role_days)?;
    write_table(std::fs::File::create(&targets[2])?, &aggregates.roles)?;
    write_table(std::fs::File::create(&targets[3])?, &aggregates.branches)?;
    log::info!("export: wrote {} aggregate tables to {}", targets.len(), dir.display());
    Ok(targets.to_vec())
}
