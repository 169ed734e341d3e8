//! Aggregator: four-stage roll-up of scenario-level unmet demand.
//!
//!   1. SlotExpectation   : mean unmet over scenarios, per (date, branch, role, time_band)
//!   2. RoleDayExpectation: sum over time bands, per (date, branch, role)
//!   3. RoleExpectation   : mean and sum over days, per (branch, role)
//!   4. BranchExpectation : mean and sum over roles, per branch
//!
//! RULES:
//!   - Each stage reads only the previous stage's output.
//!   - No input rows means no output rows. Never a synthetic zero row.
//!   - Output is sorted by the grouping key.

use crate::{
    sampler::ReconciledSlot,
    types::{BranchCode, Role, TimeBand, YearMonth},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotExpectation {
    pub month: YearMonth,
    pub date: NaiveDate,
    pub branch: BranchCode,
    pub role: Role,
    pub time_band: TimeBand,
    pub required_quantity: u32,
    pub expected_unmet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDayExpectation {
    pub month: YearMonth,
    pub date: NaiveDate,
    pub branch: BranchCode,
    pub role: Role,
    pub total_required: u64,
    pub total_expected_unmet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleExpectation {
    pub branch: BranchCode,
    pub role: Role,
    /// Mean daily required headcount.
    pub mean_required: f64,
    /// Expected daily shortfall.
    pub mean_expected_unmet: f64,
    /// Expected shortfall over every simulated day.
    pub sum_expected_unmet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchExpectation {
    pub branch: BranchCode,
    pub mean_required: f64,
    pub mean_expected_unmet: f64,
    pub sum_expected_unmet: f64,
}

/// All four levels of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub slots: Vec<SlotExpectation>,
    pub role_days: Vec<RoleDayExpectation>,
    pub roles: Vec<RoleExpectation>,
    pub branches: Vec<BranchExpectation>,
}

impl Aggregates {
    /// Run stages 2–4 on top of finished slot expectations.
    pub fn from_slots(slots: Vec<SlotExpectation>) -> Self {
        let role_days = role_day_expectations(&slots);
        let roles = role_expectations(&role_days);
        let branches = branch_expectations(&roles);
        Self { slots, role_days, roles, branches }
    }

    pub fn from_reconciled(slots: &[ReconciledSlot<'_>]) -> Self {
        Self::from_slots(slot_expectations(slots))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ── Stage 1 ────────────────────────────────────────────────────

type SlotKey<'a> = (NaiveDate, &'a str, &'a str, &'a str);

#[derive(Debug, Clone, Copy, Default)]
struct SlotTally {
    required: u32,
    unmet_sum: u64,
    rows: u64,
}

/// Incremental stage 1. Scenario batches can be folded in one at a time
/// and dropped; mean and sum do not care about arrival order.
#[derive(Debug, Default)]
pub struct SlotAccumulator<'a> {
    tallies: BTreeMap<SlotKey<'a>, SlotTally>,
}

impl<'a> SlotAccumulator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, slot: &ReconciledSlot<'a>) {
        let d = slot.demand;
        let tally = self
            .tallies
            .entry((d.date, d.branch.as_str(), d.role.as_str(), d.time_band.as_str()))
            .or_insert(SlotTally { required: d.required_quantity, ..SlotTally::default() });
        tally.unmet_sum += slot.unmet as u64;
        tally.rows += 1;
    }

    pub fn extend<'s, I>(&mut self, slots: I)
    where
        I: IntoIterator<Item = &'s ReconciledSlot<'a>>,
        'a: 's,
    {
        for slot in slots {
            self.add(slot);
        }
    }

    /// Scenario rows folded in for the slot with the fewest rows.
    pub fn min_rows_per_slot(&self) -> Option<u64> {
        self.tallies.values().map(|t| t.rows).min()
    }

    pub fn finish(self) -> Vec<SlotExpectation> {
        self.tallies
            .into_iter()
            .map(|((date, branch, role, time_band), t)| SlotExpectation {
                month: YearMonth::of(date),
                date,
                branch: branch.to_string(),
                role: role.to_string(),
                time_band: time_band.to_string(),
                required_quantity: t.required,
                expected_unmet: t.unmet_sum as f64 / t.rows as f64,
            })
            .collect()
    }
}

pub fn slot_expectations(slots: &[ReconciledSlot<'_>]) -> Vec<SlotExpectation> {
    let mut acc = SlotAccumulator::new();
    acc.extend(slots);
    acc.finish()
}

// ── Stage 2 ────────────────────────────────────────────────────

pub fn role_day_expectations(slots: &[SlotExpectation]) -> Vec<RoleDayExpectation> {
    let mut groups: BTreeMap<(NaiveDate, &str, &str), (u64, f64)> = BTreeMap::new();
    for s in slots {
        let entry = groups
            .entry((s.date, s.branch.as_str(), s.role.as_str()))
            .or_insert((0, 0.0));
        entry.0 += s.required_quantity as u64;
        entry.1 += s.expected_unmet;
    }
    groups
        .into_iter()
        .map(|((date, branch, role), (total_required, total_expected_unmet))| RoleDayExpectation {
            month: YearMonth::of(date),
            date,
            branch: branch.to_string(),
            role: role.to_string(),
            total_required,
            total_expected_unmet,
        })
        .collect()
}

// ── Stage 3 ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MeanSum {
    required_sum: f64,
    unmet_sum: f64,
    n: u32,
}

impl MeanSum {
    fn push(&mut self, required: f64, unmet: f64) {
        self.required_sum += required;
        self.unmet_sum += unmet;
        self.n += 1;
    }

    fn mean_required(&self) -> f64 {
        self.required_sum / self.n as f64
    }

    fn mean_unmet(&self) -> f64 {
        self.unmet_sum / self.n as f64
    }
}

pub fn role_expectations(days: &[RoleDayExpectation]) -> Vec<RoleExpectation> {
    let mut groups: BTreeMap<(&str, &str), MeanSum> = BTreeMap::new();
    for d in days {
        groups
            .entry((d.branch.as_str(), d.role.as_str()))
            .or_default()
            .push(d.total_required as f64, d.total_expected_unmet);
    }
    groups
        .into_iter()
        .map(|((branch, role), m)| RoleExpectation {
            branch: branch.to_string(),
            role: role.to_string(),
            mean_required: m.mean_required(),
            mean_expected_unmet: m.mean_unmet(),
            sum_expected_unmet: m.unmet_sum,
        })
        .collect()
}

// ── Stage 4 ────────────────────────────────────────────────────

pub fn branch_expectations(roles: &[RoleExpectation]) -> Vec<BranchExpectation> {
    let mut groups: BTreeMap<&str, (MeanSum, f64)> = BTreeMap::new();
    for r in roles {
        let (means, total) = groups.entry(r.branch.as_str()).or_default();
        means.push(r.mean_required, r.mean_expected_unmet);
        *total += r.sum_expected_unmet;
    }
    groups
        .into_iter()
        .map(|(branch, (m, total))| BranchExpectation {
            branch: branch.to_string(),
            mean_required: m.mean_required(),
            mean_expected_unmet: m.mean_unmet(),
            sum_expected_unmet: total,
        })
        .collect()
}
