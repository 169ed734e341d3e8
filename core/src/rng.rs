//! Deterministic random number generation.
//!
//! RULE: Sampling never calls a platform RNG directly.
//! All presence draws flow through ScenarioRng instances derived
//! from the single master seed of the run.
//!
//! Each scenario gets its own RNG stream, seeded deterministically
//! from (master_seed XOR scenario * golden ratio). This means:
//!   - Scenarios can be sampled on any thread, in any order.
//!   - Raising N never changes the draws of the first scenarios.

use crate::types::Scenario;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const STREAM_SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

/// A deterministic RNG for a single scenario.
pub struct ScenarioRng {
    pub scenario: Scenario,
    inner: Pcg64Mcg,
}

impl ScenarioRng {
    pub fn new(master_seed: u64, scenario: Scenario) -> Self {
        let derived_seed = master_seed ^ (scenario as u64).wrapping_mul(STREAM_SPREAD);
        Self {
            scenario,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in the open interval (0.0, 1.0).
    ///
    /// Neither endpoint is reachable, so `u > 0.0` and `u < 1.0` always hold.
    pub fn next_open_f64(&mut self) -> f64 {
        // 52 bits keep `bits + 0.5` exactly representable.
        let bits = self.inner.next_u64() >> 12;
        (bits as f64 + 0.5) * (1.0 / (1u64 << 52) as f64)
    }

    /// Presence trial: the worker shows up iff `u > absence_rate`.
    pub fn present(&mut self, absence_rate: f64) -> bool {
        self.next_open_f64() > absence_rate
    }
}

/// All scenario RNGs for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Draw a fresh master seed from the OS-seeded generator.
    /// Only used when the caller did not pin one.
    pub fn random_seed() -> u64 {
        rand::thread_rng().next_u64()
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_scenario(&self, scenario: Scenario) -> ScenarioRng {
        ScenarioRng::new(self.master_seed, scenario)
    }
}
