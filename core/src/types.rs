//! Shared primitive types and input tables used across the simulation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Normalized worker identity (trimmed, upper-case).
pub type WorkerId = String;

/// Branch code as it appears in the schedule and demand files.
pub type BranchCode = String;

pub type Role = String;

/// Time-band label, e.g. `"08:00-12:00"`. Opaque to the simulation.
pub type TimeBand = String;

/// Dense scenario index in `0..N`.
pub type Scenario = u32;

/// The canonical run identifier.
pub type RunId = String;

/// Normalize a worker identity so that joins are case and whitespace insensitive.
pub fn normalize_worker_id(raw: &str) -> WorkerId {
    raw.trim().to_uppercase()
}

/// A calendar month. Renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = y.parse().map_err(|_| format!("bad year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("bad month in '{s}'"))?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Monthly absence rate for one worker, as produced by the absenteeism stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenteeismRate {
    pub worker_id: WorkerId,
    pub month: YearMonth,
    /// Days flagged absent in the month. Zero when the rate came from an
    /// external table that does not carry the count.
    #[serde(default)]
    pub absent_days: u32,
    pub rate: f64,
}

/// One worker's planned shift on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    pub date: NaiveDate,
    pub branch: BranchCode,
    pub role: Role,
    pub worker_id: WorkerId,
    pub marker: String,
}

/// Required headcount for one (date, branch, role, time_band).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRow {
    pub date: NaiveDate,
    pub branch: BranchCode,
    pub role: Role,
    pub time_band: TimeBand,
    pub required_quantity: u32,
}

impl DemandRow {
    pub fn role_day(&self) -> RoleDayKey<'_> {
        RoleDayKey { date: self.date, branch: &self.branch, role: &self.role }
    }
}

/// A schedule row where the worker is expected to be present, carrying the
/// absence probability resolved by the joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceExpected {
    pub date: NaiveDate,
    pub branch: BranchCode,
    pub role: Role,
    pub worker_id: WorkerId,
    pub rate: f64,
}

impl PresenceExpected {
    pub fn role_day(&self) -> RoleDayKey<'_> {
        RoleDayKey { date: self.date, branch: &self.branch, role: &self.role }
    }
}

/// Borrowed (date, branch, role) key. Presence is counted at this grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleDayKey<'a> {
    pub date: NaiveDate,
    pub branch: &'a str,
    pub role: &'a str,
}
