//! Monte Carlo estimate of staffing shortfall under historical absenteeism.
//!
//! Pipeline: joiner -> sampler/reconciler -> aggregator, orchestrated by
//! `engine::SimEngine`. Ingestion, absenteeism rates and export sit at the edges.

pub mod absenteeism;
pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingest;
pub mod joiner;
pub mod rng;
pub mod sampler;
pub mod types;

pub use engine::{SimEngine, SimInputs, SimulationReport};
pub use error::{SimError, SimResult};
