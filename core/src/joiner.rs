//! Schedule joiner: the validation boundary of a run.
//!
//! Produces the presence-expected set: schedule rows carrying the
//! "scheduled to work" marker on a date the demand table covers, each
//! with the worker's absence rate attached.
//!
//! RULE: Every input-shape failure is raised here, before any sampling.

use crate::{
    config::{MissingRatePolicy, RateMatching, SimConfig},
    error::{SimError, SimResult},
    ingest::{DEMAND_TABLE, RATES_TABLE},
    types::{AbsenteeismRate, DemandRow, PresenceExpected, ScheduleAssignment, WorkerId, YearMonth},
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Join options, usually taken from `SimConfig`.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub scheduled_marker: String,
    pub missing_rate_policy: MissingRatePolicy,
    pub rate_matching: RateMatching,
}

impl JoinOptions {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            scheduled_marker:    config.scheduled_marker.clone(),
            missing_rate_policy: config.missing_rate_policy,
            rate_matching:       config.rate_matching,
        }
    }
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

/// Rate lookup built once per join.
enum RateIndex<'a> {
    ByWorker(HashMap<&'a str, f64>),
    ByWorkerMonth(HashMap<(&'a str, YearMonth), f64>),
}

impl<'a> RateIndex<'a> {
    fn build(rates: &'a [AbsenteeismRate], matching: RateMatching) -> Self {
        match matching {
            RateMatching::WorkerOnly => {
                let mut acc: HashMap<&str, (f64, u32)> = HashMap::new();
                for r in rates {
                    let entry = acc.entry(r.worker_id.as_str()).or_insert((0.0, 0));
                    entry.0 += r.rate;
                    entry.1 += 1;
                }
                let multi_month = acc.values().filter(|(_, n)| *n > 1).count();
                if multi_month > 0 {
                    log::debug!(
                        "joiner: {multi_month} worker(s) have several monthly rates; using their mean"
                    );
                }
                RateIndex::ByWorker(
                    acc.into_iter().map(|(w, (sum, n))| (w, sum / n as f64)).collect(),
                )
            }
            RateMatching::WorkerAndMonth => RateIndex::ByWorkerMonth(
                rates
                    .iter()
                    .map(|r| ((r.worker_id.as_str(), r.month), r.rate))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, worker_id: &str, date: NaiveDate) -> Option<f64> {
        match self {
            RateIndex::ByWorker(map) => map.get(worker_id).copied(),
            RateIndex::ByWorkerMonth(map) => map.get(&(worker_id, YearMonth::of(date))).copied(),
        }
    }
}

/// Build the presence-expected set.
///
/// Fails with `MissingRate` (listing every unmatched worker) when a
/// scheduled worker has no rate and the policy is `Reject`.
pub fn join_schedule(
    schedule: &[ScheduleAssignment],
    demand: &[DemandRow],
    rates: &[AbsenteeismRate],
    options: &JoinOptions,
) -> SimResult<Vec<PresenceExpected>> {
    validate_rates(rates)?;
    validate_demand(demand)?;

    let demand_dates: HashSet<NaiveDate> = demand.iter().map(|d| d.date).collect();
    let index = RateIndex::build(rates, options.rate_matching);
    let fallback = options.missing_rate_policy.default_rate();

    let mut missing: BTreeSet<&WorkerId> = BTreeSet::new();
    let mut defaulted = 0usize;
    let mut joined = Vec::new();

    for row in schedule {
        if row.marker != options.scheduled_marker || !demand_dates.contains(&row.date) {
            continue;
        }
        let rate = match (index.lookup(&row.worker_id, row.date), fallback) {
            (Some(rate), _) => rate,
            (None, Some(default)) => {
                defaulted += 1;
                default
            }
            (None, None) => {
                missing.insert(&row.worker_id);
                continue;
            }
        };
        joined.push(PresenceExpected {
            date:      row.date,
            branch:    row.branch.clone(),
            role:      row.role.clone(),
            worker_id: row.worker_id.clone(),
            rate,
        });
    }

    if !missing.is_empty() {
        return Err(SimError::MissingRate {
            worker_ids: missing.into_iter().cloned().collect(),
        });
    }
    if defaulted > 0 {
        log::warn!(
            "joiner: {defaulted} assignment(s) had no absence rate; applied {:?}",
            options.missing_rate_policy
        );
    }
    log::info!(
        "joiner: {} schedule rows -> {} presence-expected over {} demand dates",
        schedule.len(),
        joined.len(),
        demand_dates.len()
    );
    Ok(joined)
}

/// Rates are probabilities, one per (worker, month).
pub fn validate_rates(rates: &[AbsenteeismRate]) -> SimResult<()> {
    if let Some(bad) = rates.iter().find(|r| !r.rate.is_finite() || !(0.0..=1.0).contains(&r.rate)) {
        return Err(SimError::malformed(
            RATES_TABLE,
            None,
            format!(
                "rate {} for worker {} in {} is outside [0, 1]",
                bad.rate, bad.worker_id, bad.month
            ),
        ));
    }
    let mut seen = HashSet::with_capacity(rates.len());
    for r in rates {
        if !seen.insert((r.worker_id.as_str(), r.month)) {
            return Err(SimError::malformed(
                RATES_TABLE,
                None,
                format!("duplicate rate for worker {} in {}", r.worker_id, r.month),
            ));
        }
    }
    Ok(())
}

/// Demand must hold one row per (date, branch, role, time_band).
pub fn validate_demand(demand: &[DemandRow]) -> SimResult<()> {
    let mut seen = HashSet::with_capacity(demand.len());
    for d in demand {
        if !seen.insert((d.date, d.branch.as_str(), d.role.as_str(), d.time_band.as_str())) {
            return Err(SimError::malformed(
                DEMAND_TABLE,
                None,
                format!(
                    "duplicate demand for {} / {} / {} / {}",
                    d.date, d.branch, d.role, d.time_band
                ),
            ));
        }
    }
    Ok(())
}
