//! CSV ingestion for the simulation's input tables.
//!
//! RULE: Only ingest.rs parses input files.
//! Everything downstream works on typed rows with normalized worker ids
//! and calendar dates.
//!
//! Column headers are matched by name. The English names are canonical;
//! the names used by the source exports are accepted as aliases.

use crate::{
    absenteeism::{indicator_is_set, AttendanceDay, ABSENCE_FIELDS},
    config::SimConfig,
    error::{SimError, SimResult},
    types::{normalize_worker_id, AbsenteeismRate, DemandRow, ScheduleAssignment, YearMonth},
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

pub const RATES_TABLE: &str = "absenteeism rate";
pub const SCHEDULE_TABLE: &str = "schedule";
pub const DEMAND_TABLE: &str = "demand";
pub const ATTENDANCE_TABLE: &str = "attendance";

const ATTENDANCE_DATE_COLUMN: &str = "DFOCODATA";
const ATTENDANCE_NAME_COLUMN: &str = "NOME";

#[derive(Debug, Deserialize)]
struct RawRateRow {
    #[serde(alias = "nome")]
    worker_id: String,
    #[serde(alias = "mes")]
    month: YearMonth,
    #[serde(default, alias = "falta")]
    absent_days: u32,
    #[serde(alias = "tx_absenteismo")]
    rate: f64,
}

#[derive(Debug, Deserialize)]
struct RawScheduleRow {
    #[serde(alias = "data")]
    date: String,
    #[serde(alias = "cod_filial")]
    branch: String,
    #[serde(alias = "cargo")]
    role: String,
    #[serde(alias = "nome")]
    worker_id: String,
    #[serde(alias = "marcacao")]
    marker: String,
}

#[derive(Debug, Deserialize)]
struct RawDemandRow {
    #[serde(alias = "data")]
    date: String,
    #[serde(alias = "cod_filial")]
    branch: String,
    #[serde(alias = "cargo")]
    role: String,
    #[serde(alias = "faixa")]
    time_band: String,
    #[serde(alias = "quantidade")]
    required_quantity: String,
}

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn read_rates<R: Read>(input: R, config: &SimConfig) -> SimResult<Vec<AbsenteeismRate>> {
    let mut reader = csv_reader(input, config);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawRateRow>() {
        let raw = result.map_err(|e| csv_failure(RATES_TABLE, e))?;
        rows.push(AbsenteeismRate {
            worker_id:   normalize_worker_id(&raw.worker_id),
            month:       raw.month,
            absent_days: raw.absent_days,
            rate:        raw.rate,
        });
    }
    log::debug!("ingest: {} {RATES_TABLE} rows", rows.len());
    Ok(rows)
}

pub fn read_schedule<R: Read>(input: R, config: &SimConfig) -> SimResult<Vec<ScheduleAssignment>> {
    let mut reader = csv_reader(input, config);
    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<RawScheduleRow>().enumerate() {
        let line = data_line(i);
        let raw = result.map_err(|e| csv_failure(SCHEDULE_TABLE, e))?;
        rows.push(ScheduleAssignment {
            date:      parse_date(&raw.date, config, SCHEDULE_TABLE, line)?,
            branch:    raw.branch,
            role:      raw.role,
            worker_id: normalize_worker_id(&raw.worker_id),
            marker:    raw.marker,
        });
    }
    log::debug!("ingest: {} {SCHEDULE_TABLE} rows", rows.len());
    Ok(rows)
}

pub fn read_demand<R: Read>(input: R, config: &SimConfig) -> SimResult<Vec<DemandRow>> {
    let mut reader = csv_reader(input, config);
    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<RawDemandRow>().enumerate() {
        let line = data_line(i);
        let raw = result.map_err(|e| csv_failure(DEMAND_TABLE, e))?;
        rows.push(DemandRow {
            date:              parse_date(&raw.date, config, DEMAND_TABLE, line)?,
            branch:            raw.branch,
            role:              raw.role,
            time_band:         raw.time_band,
            required_quantity: parse_quantity(&raw.required_quantity, line)?,
        });
    }
    log::debug!("ingest: {} {DEMAND_TABLE} rows", rows.len());
    Ok(rows)
}

/// Read raw daily attendance, reducing each row to an absence flag.
/// Indicator columns missing from the file are skipped; at least one must exist.
pub fn read_attendance<R: Read>(input: R, config: &SimConfig) -> SimResult<Vec<AttendanceDay>> {
    let mut reader = csv_reader(input, config);
    let headers = reader.headers().map_err(|e| csv_failure(ATTENDANCE_TABLE, e))?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let date_idx = column(ATTENDANCE_DATE_COLUMN).ok_or_else(|| {
        SimError::malformed(ATTENDANCE_TABLE, Some(1), format!("missing column {ATTENDANCE_DATE_COLUMN}"))
    })?;
    let name_idx = column(ATTENDANCE_NAME_COLUMN).ok_or_else(|| {
        SimError::malformed(ATTENDANCE_TABLE, Some(1), format!("missing column {ATTENDANCE_NAME_COLUMN}"))
    })?;
    let indicator_idx: Vec<usize> = ABSENCE_FIELDS.iter().filter_map(|f| column(*f)).collect();
    if indicator_idx.is_empty() {
        return Err(SimError::malformed(
            ATTENDANCE_TABLE,
            Some(1),
            "no absence-indicator columns present",
        ));
    }

    let mut days = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let line = data_line(i);
        let record = result.map_err(|e| csv_failure(ATTENDANCE_TABLE, e))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        days.push(AttendanceDay {
            worker_id: normalize_worker_id(field(name_idx)),
            date:      parse_date(field(date_idx), config, ATTENDANCE_TABLE, line)?,
            absent:    indicator_idx.iter().any(|&idx| indicator_is_set(field(idx))),
        });
    }
    log::debug!(
        "ingest: {} {ATTENDANCE_TABLE} rows, {} indicator columns",
        days.len(),
        indicator_idx.len()
    );
    Ok(days)
}

// ── Helpers ────────────────────────────────────────────────────

fn csv_reader<R: Read>(input: R, config: &SimConfig) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.csv_delimiter_byte())
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// File line of the i-th data record (line 1 is the header).
fn data_line(i: usize) -> u64 {
    i as u64 + 2
}

/// I/O failures stay I/O failures; everything else is a shape problem in the file.
fn csv_failure(table: &'static str, err: csv::Error) -> SimError {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        return SimError::Csv(err);
    }
    let line = err.position().map(|p| p.line());
    SimError::malformed(table, line, err.to_string())
}

fn parse_date(raw: &str, config: &SimConfig, table: &'static str, line: u64) -> SimResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), &config.date_format).map_err(|e| {
        SimError::malformed(
            table,
            Some(line),
            format!("cannot parse date '{raw}' with format '{}': {e}", config.date_format),
        )
    })
}

/// Quantities are non-negative integers; spreadsheet exports may write them as `3.0`.
fn parse_quantity(raw: &str, line: u64) -> SimResult<u32> {
    let bad = || SimError::malformed(DEMAND_TABLE, Some(line), format!("invalid required quantity '{raw}'"));
    if let Ok(q) = raw.parse::<u32>() {
        return Ok(q);
    }
    let value: f64 = raw.parse().map_err(|_| bad())?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(bad());
    }
    Ok(value as u32)
}
