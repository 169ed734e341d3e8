use crate::types::WorkerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Malformed {table} input{}: {detail}", at_line(.line))]
    MalformedInput {
        table: &'static str,
        line: Option<u64>,
        detail: String,
    },

    #[error("No absence rate for {} scheduled worker(s): {}", .worker_ids.len(), .worker_ids.join(", "))]
    MissingRate { worker_ids: Vec<WorkerId> },

    #[error("Empty {table} input")]
    EmptyInput { table: &'static str },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("Scenario budget exceeded: {rows} rows requested, limit is {limit}")]
    BudgetExceeded { rows: u64, limit: u64 },

    #[error("Time budget exceeded after {elapsed_ms} ms ({completed}/{scenarios} scenarios done)")]
    TimeBudgetExceeded {
        elapsed_ms: u64,
        completed: u32,
        scenarios: u32,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn malformed(table: &'static str, line: Option<u64>, detail: impl Into<String>) -> Self {
        SimError::MalformedInput { table, line, detail: detail.into() }
    }
}

fn at_line(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

pub type SimResult<T> = Result<T, SimError>;
