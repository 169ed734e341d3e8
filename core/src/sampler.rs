//! Scenario sampler and reconciler: the Monte Carlo core.
//!
//! Per scenario:
//!   1. One uniform draw per presence-expected assignment; present iff u > rate.
//!   2. Presences counted per (date, branch, role).
//!   3. Every demand row reconciled against its count:
//!      unmet = max(required - present, 0), with a missing count meaning 0.
//!
//! Assignments and demand rows are resolved to dense role-day group indices
//! once, so each scenario is a pass over two flat arrays.
//!
//! RULES:
//!   - Draw order within a scenario is the assignment order. Never reorder.
//!   - Scenarios share nothing but the read-only tables; each draws from
//!     its own stream in the RngBank.

use crate::{
    rng::{RngBank, ScenarioRng},
    types::{DemandRow, PresenceExpected, RoleDayKey, Scenario},
};
use rayon::prelude::*;
use std::collections::HashMap;
use std::ops::Range;

/// Presence draw for one assignment in one scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceOutcome<'a> {
    pub scenario: Scenario,
    pub assignment: &'a PresenceExpected,
    pub present: bool,
}

/// Unmet demand for one demand row in one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciledSlot<'a> {
    pub scenario: Scenario,
    pub demand: &'a DemandRow,
    /// Shared by every time band of the same (scenario, date, branch, role).
    pub n_present: u32,
    pub unmet: u32,
}

impl ReconciledSlot<'_> {
    pub fn required_quantity(&self) -> u32 {
        self.demand.required_quantity
    }
}

/// `max(required - present, 0)`.
pub fn unmet_demand(required: u32, present: u32) -> u32 {
    required.saturating_sub(present)
}

/// `'s` borrows the presence-expected set, `'a` the demand table that
/// reconciled rows point into.
pub struct ScenarioSampler<'s, 'a> {
    assignments: &'s [PresenceExpected],
    demand: &'a [DemandRow],
    assignment_group: Vec<usize>,
    /// `None` when no presence-expected assignment shares the row's role-day.
    demand_group: Vec<Option<usize>>,
    group_count: usize,
}

impl<'s, 'a> ScenarioSampler<'s, 'a> {
    pub fn new(assignments: &'s [PresenceExpected], demand: &'a [DemandRow]) -> Self {
        let mut groups: HashMap<RoleDayKey<'_>, usize> = HashMap::new();
        let assignment_group = assignments
            .iter()
            .map(|a| {
                let next = groups.len();
                *groups.entry(a.role_day()).or_insert(next)
            })
            .collect();
        let demand_group = demand
            .iter()
            .map(|d| groups.get(&d.role_day()).copied())
            .collect();
        let group_count = groups.len();

        log::debug!(
            "sampler: {} assignments in {group_count} role-day groups, {} demand rows",
            assignments.len(),
            demand.len()
        );
        Self { assignments, demand, assignment_group, demand_group, group_count }
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn demand_count(&self) -> usize {
        self.demand.len()
    }

    /// Scheduled headcount per demand row: the ceiling on `n_present`.
    pub fn scheduled_for_demand(&self) -> Vec<u32> {
        let mut per_group = vec![0u32; self.group_count];
        for &g in &self.assignment_group {
            per_group[g] += 1;
        }
        self.demand_group
            .iter()
            .map(|g| g.map_or(0, |g| per_group[g]))
            .collect()
    }

    /// One presence draw per assignment, in assignment order.
    pub fn presence_flags(&self, rng: &mut ScenarioRng) -> Vec<bool> {
        self.assignments.iter().map(|a| rng.present(a.rate)).collect()
    }

    pub fn outcomes(&self, scenario: Scenario, bank: &RngBank) -> Vec<PresenceOutcome<'s>> {
        let mut rng = bank.for_scenario(scenario);
        let assignments = self.assignments;
        self.presence_flags(&mut rng)
            .into_iter()
            .zip(assignments)
            .map(|(present, assignment)| PresenceOutcome { scenario, assignment, present })
            .collect()
    }

    /// Presence counts per role-day group for one scenario.
    pub fn sample_presence(&self, rng: &mut ScenarioRng) -> Vec<u32> {
        let mut counts = vec![0u32; self.group_count];
        for (a, &g) in self.assignments.iter().zip(&self.assignment_group) {
            if rng.present(a.rate) {
                counts[g] += 1;
            }
        }
        counts
    }

    /// Reconcile every demand row for one scenario.
    pub fn reconcile_scenario(&self, scenario: Scenario, bank: &RngBank) -> Vec<ReconciledSlot<'a>> {
        let mut rng = bank.for_scenario(scenario);
        let counts = self.sample_presence(&mut rng);
        self.demand
            .iter()
            .zip(&self.demand_group)
            .map(|(demand, group)| {
                let n_present = group.map_or(0, |g| counts[g]);
                ReconciledSlot {
                    scenario,
                    demand,
                    n_present,
                    unmet: unmet_demand(demand.required_quantity, n_present),
                }
            })
            .collect()
    }

    /// Reconcile a contiguous range of scenarios. Output is ordered by
    /// scenario then demand row whether or not it runs in parallel.
    pub fn reconcile_range(
        &self,
        scenarios: Range<Scenario>,
        bank: &RngBank,
        parallel: bool,
    ) -> Vec<ReconciledSlot<'a>> {
        let per_scenario: Vec<Vec<ReconciledSlot<'a>>> = if parallel {
            scenarios
                .into_par_iter()
                .map(|s| self.reconcile_scenario(s, bank))
                .collect()
        } else {
            scenarios.map(|s| self.reconcile_scenario(s, bank)).collect()
        };
        per_scenario.into_iter().flatten().collect()
    }
}
