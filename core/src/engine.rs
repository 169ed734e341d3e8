//! The simulation engine: orchestrates one stateless run.
//!
//! EXECUTION ORDER (fixed):
//!   1. Config validation
//!   2. Schedule joiner       (all input validation happens here)
//!   3. Empty-input policy
//!   4. Budget check          (scenario rows, before any sampling)
//!   5. Sampler + reconciler  (scenario batches, optionally parallel)
//!   6. Aggregator            (stage 1 folded per batch, stages 2–4 at the end)
//!
//! RULES:
//!   - A run is a pure function of its inputs and master seed.
//!   - Nothing is carried between runs.
//!   - Any failure aborts the whole run. There is no partial result.

use crate::{
    aggregate::{Aggregates, SlotAccumulator},
    config::SimConfig,
    error::{SimError, SimResult},
    ingest::{DEMAND_TABLE, SCHEDULE_TABLE},
    joiner::{join_schedule, JoinOptions},
    rng::RngBank,
    sampler::{ReconciledSlot, ScenarioSampler},
    types::{AbsenteeismRate, DemandRow, PresenceExpected, RunId, ScheduleAssignment},
};
use serde::Serialize;
use std::time::Instant;

/// The three input tables of a run.
#[derive(Debug, Clone, Default)]
pub struct SimInputs {
    pub rates: Vec<AbsenteeismRate>,
    pub schedule: Vec<ScheduleAssignment>,
    pub demand: Vec<DemandRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: RunId,
    /// Effective master seed; replaying with it reproduces the run.
    pub seed: u64,
    pub scenarios: u32,
    pub presence_expected: usize,
    pub demand_rows: usize,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub aggregates: Aggregates,
}

/// Scenario-level output: one row per (scenario, demand row).
#[derive(Debug, Clone)]
pub struct ScenarioTable<'a> {
    pub seed: u64,
    pub scenarios: u32,
    pub presence_expected: Vec<PresenceExpected>,
    pub rows: Vec<ReconciledSlot<'a>>,
}

pub struct SimEngine {
    config: SimConfig,
}

impl SimEngine {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run the full pipeline and return the four aggregate tables.
    pub fn run(&self, inputs: &SimInputs) -> SimResult<SimulationReport> {
        let started = Instant::now();
        let run_id: RunId = uuid::Uuid::new_v4().to_string();
        let assignments = self.prepare(inputs)?;
        let bank = self.rng_bank(&run_id);
        let scenarios = self.config.scenarios;

        let sampler = ScenarioSampler::new(&assignments, &inputs.demand);
        let mut acc = SlotAccumulator::new();
        let mut next: u32 = 0;
        while next < scenarios {
            let end = next.saturating_add(self.config.batch_size).min(scenarios);
            let batch = sampler.reconcile_range(next..end, &bank, self.config.parallel);
            acc.extend(&batch);
            log::debug!("run={run_id} scenarios {next}..{end} folded ({} rows)", batch.len());
            next = end;
            self.check_deadline(started, next)?;
        }

        let aggregates = Aggregates::from_slots(acc.finish());
        let elapsed_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "run={run_id} done: {} slots, {} roles, {} branches in {elapsed_ms} ms",
            aggregates.slots.len(),
            aggregates.roles.len(),
            aggregates.branches.len()
        );

        Ok(SimulationReport {
            run_id,
            seed: bank.master_seed(),
            scenarios,
            presence_expected: assignments.len(),
            demand_rows: inputs.demand.len(),
            elapsed_ms,
            aggregates,
        })
    }

    /// Materialize every reconciled scenario row. Same validation and
    /// budget rules as `run`, but holds `N x |demand|` rows in memory.
    pub fn reconcile<'a>(&self, inputs: &'a SimInputs) -> SimResult<ScenarioTable<'a>> {
        let started = Instant::now();
        let assignments = self.prepare(inputs)?;
        let bank = self.rng_bank("reconcile");
        let scenarios = self.config.scenarios;

        let rows = {
            let sampler = ScenarioSampler::new(&assignments, &inputs.demand);
            sampler.reconcile_range(0..scenarios, &bank, self.config.parallel)
        };
        self.check_deadline(started, scenarios)?;

        Ok(ScenarioTable {
            seed: bank.master_seed(),
            scenarios,
            presence_expected: assignments,
            rows,
        })
    }

    // ── Pre-sampling ───────────────────────────────────────────

    /// Validate, join and budget-check. Nothing is sampled before this returns.
    fn prepare(&self, inputs: &SimInputs) -> SimResult<Vec<PresenceExpected>> {
        self.config.validate()?;
        let options = JoinOptions::from_config(&self.config);
        let assignments = join_schedule(&inputs.schedule, &inputs.demand, &inputs.rates, &options)?;

        if inputs.demand.is_empty() {
            self.empty_input(DEMAND_TABLE)?;
        }
        if assignments.is_empty() {
            self.empty_input(SCHEDULE_TABLE)?;
        }

        let rows = self.config.scenarios as u64 * (assignments.len() as u64 + inputs.demand.len() as u64);
        if rows > self.config.max_scenario_rows {
            return Err(SimError::BudgetExceeded { rows, limit: self.config.max_scenario_rows });
        }
        Ok(assignments)
    }

    fn empty_input(&self, table: &'static str) -> SimResult<()> {
        if self.config.reject_empty_inputs {
            return Err(SimError::EmptyInput { table });
        }
        log::warn!("{table} input is empty after filtering; results may be empty");
        Ok(())
    }

    fn rng_bank(&self, run_id: &str) -> RngBank {
        let seed = self.config.seed.unwrap_or_else(|| {
            let seed = RngBank::random_seed();
            log::info!("run={run_id} no seed supplied; drew seed={seed}");
            seed
        });
        RngBank::new(seed)
    }

    fn check_deadline(&self, started: Instant, completed: u32) -> SimResult<()> {
        let Some(budget_ms) = self.config.time_budget_ms else {
            return Ok(());
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > budget_ms {
            return Err(SimError::TimeBudgetExceeded {
                elapsed_ms,
                completed,
                scenarios: self.config.scenarios,
            });
        }
        Ok(())
    }
}
