//! Absenteeism rates from raw daily attendance.
//!
//! One attendance row per worker per day. A day counts as absent when any
//! absence-indicator field carries a non-default duration. The monthly rate
//! is `absent_days / working_days_per_month`, with the denominator fixed by
//! configuration rather than by the calendar.

use crate::types::{AbsenteeismRate, WorkerId, YearMonth};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Attendance columns whose non-default value marks the day as an absence.
pub const ABSENCE_FIELDS: [&str; 21] = [
    "FALTAINTEGRAL",
    "DOENCATRABAL",
    "DOENCA",
    "SERVMILITAR",
    "LICENCPATERN",
    "AFASTEMPRE",
    "ATESTMEDICOINT",
    "FALECIMENTO",
    "AFASTAMENTO",
    "ABONOGREVE",
    "DISPJUSTICA",
    "DISPONUSEMPRESA",
    "AFASTSINDICANCIA",
    "ATESTMEDICACIDTRABA",
    "DISPFENONATUREZA",
    "ABONOACOMPANHAMENTO",
    "FENONATUREZA",
    "ATESTMEDICOPARC",
    "ATESTMEDICOS19",
    "ATESTMEDICOC19",
    "ABONOCOVID19",
];

/// One worker-day of attendance, already reduced to an absence flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceDay {
    pub worker_id: WorkerId,
    pub date: NaiveDate,
    pub absent: bool,
}

/// True when an indicator cell holds something other than a zero duration.
/// Any spelling of zero counts as unset: `0`, `0:00`, `00:00:00`, `0.0`.
/// Text that is not a duration counts as set.
pub fn indicator_is_set(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    !value
        .split(':')
        .all(|part| part.trim().parse::<f64>().map_or(false, |v| v == 0.0))
}

/// Aggregate attendance days into one rate per (worker, month), sorted by
/// worker then month.
pub fn calculate_absenteeism(
    days: &[AttendanceDay],
    working_days_per_month: u32,
) -> Vec<AbsenteeismRate> {
    let mut absences: BTreeMap<(&str, YearMonth), u32> = BTreeMap::new();
    for day in days {
        let count = absences
            .entry((day.worker_id.as_str(), YearMonth::of(day.date)))
            .or_insert(0);
        if day.absent {
            *count += 1;
        }
    }

    let denominator = working_days_per_month.max(1) as f64;
    let rates: Vec<AbsenteeismRate> = absences
        .into_iter()
        .map(|((worker_id, month), absent_days)| {
            let raw = absent_days as f64 / denominator;
            if raw > 1.0 {
                log::warn!(
                    "worker={worker_id} month={month}: {absent_days} absences exceed \
                     {working_days_per_month} working days; rate clamped to 1.0"
                );
            }
            AbsenteeismRate {
                worker_id: worker_id.to_string(),
                month,
                absent_days,
                rate: raw.min(1.0),
            }
        })
        .collect();

    log::info!(
        "absenteeism: {} attendance rows -> {} worker-month rates",
        days.len(),
        rates.len()
    );
    rates
}
