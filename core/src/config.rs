use crate::error::{SimError, SimResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Scenario count used by the host tooling when none is given.
pub const DEFAULT_SCENARIOS: u32 = 1000;
/// Upper bound on scenarios accepted from callers.
pub const MAX_SCENARIOS: u32 = 10_000;
/// Fixed absence-rate denominator: working days in a month.
pub const DEFAULT_WORKING_DAYS_PER_MONTH: u32 = 21;

/// What to do with a scheduled worker that has no absence-rate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatePolicy {
    /// Fail the run with `SimError::MissingRate`.
    #[default]
    Reject,
    /// Treat the worker as never absent (rate 0).
    AssumePresent,
    /// Treat the worker as never present (rate 1).
    AssumeAbsent,
}

impl MissingRatePolicy {
    /// Rate substituted for a missing entry, or `None` when missing rates are rejected.
    pub fn default_rate(&self) -> Option<f64> {
        match self {
            Self::Reject        => None,
            Self::AssumePresent => Some(0.0),
            Self::AssumeAbsent  => Some(1.0),
        }
    }
}

/// How rates are matched onto schedule rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateMatching {
    /// Match by worker only; a worker's monthly rates are averaged into one.
    #[default]
    WorkerOnly,
    /// Match by worker and the calendar month of the scheduled date.
    WorkerAndMonth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub scenarios: u32,
    pub max_scenarios: u32,
    /// Master seed. `None` draws one per run; the report records it.
    pub seed: Option<u64>,
    pub working_days_per_month: u32,
    /// Schedule marker meaning "scheduled to work".
    pub scheduled_marker: String,
    /// chrono format string for every date column on ingestion.
    pub date_format: String,
    pub csv_delimiter: char,
    pub missing_rate_policy: MissingRatePolicy,
    pub rate_matching: RateMatching,
    pub parallel: bool,
    /// Scenarios sampled per batch before folding into the aggregates.
    pub batch_size: u32,
    /// Limit on `scenarios * (presence-expected rows + demand rows)`.
    pub max_scenario_rows: u64,
    /// Wall-clock limit, checked between batches.
    pub time_budget_ms: Option<u64>,
    /// Raise `EmptyInput` instead of returning empty tables.
    pub reject_empty_inputs: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            scenarios:              DEFAULT_SCENARIOS,
            max_scenarios:          MAX_SCENARIOS,
            seed:                   None,
            working_days_per_month: DEFAULT_WORKING_DAYS_PER_MONTH,
            scheduled_marker:       "E".to_string(),
            date_format:            "%d/%m/%Y".to_string(),
            csv_delimiter:          ';',
            missing_rate_policy:    MissingRatePolicy::default(),
            rate_matching:          RateMatching::default(),
            parallel:               true,
            batch_size:             256,
            max_scenario_rows:      50_000_000,
            time_budget_ms:         None,
            reject_empty_inputs:    false,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with a pinned seed and sequential sampling.
    pub fn default_test(seed: u64) -> Self {
        Self { seed: Some(seed), parallel: false, ..Self::default() }
    }

    pub fn with_scenarios(mut self, scenarios: u32) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |detail: String| Err(SimError::InvalidConfig { detail });
        if self.scenarios == 0 {
            return invalid("scenarios must be at least 1".into());
        }
        if self.scenarios > self.max_scenarios {
            return invalid(format!(
                "scenarios={} exceeds max_scenarios={}",
                self.scenarios, self.max_scenarios
            ));
        }
        if self.working_days_per_month == 0 {
            return invalid("working_days_per_month must be positive".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive".into());
        }
        if !self.csv_delimiter.is_ascii() {
            return invalid(format!("csv_delimiter '{}' is not ASCII", self.csv_delimiter));
        }
        // A format that cannot round-trip a known date is unusable.
        let probe = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap_or_default();
        let mut rendered = String::new();
        if write!(rendered, "{}", probe.format(&self.date_format)).is_err()
            || NaiveDate::parse_from_str(&rendered, &self.date_format) != Ok(probe) {
            return invalid(format!("date_format '{}' cannot parse dates", self.date_format));
        }
        Ok(())
    }

    pub fn csv_delimiter_byte(&self) -> u8 {
        self.csv_delimiter as u8
    }
}
