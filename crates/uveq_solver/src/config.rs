//! Solver tuning parameters.
//!
//! Constructed once at startup and passed by shared reference into every
//! session; nothing in the pipeline mutates it afterwards, so concurrent
//! `prove_eq` calls can share one instance freely.

use serde::{Deserialize, Serialize};

/// How eagerly the back end instantiates starred summations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstantiationMode {
    /// Unroll only when a bound can be derived.
    #[default]
    Conservative,
    /// Speculatively unroll up to the budget.
    Aggressive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock budget for one solver call, in milliseconds.
    pub timeout_ms: u64,
    /// Seed for any randomized heuristic, fixed for reproducible runs.
    pub random_seed: u64,
    pub instantiation: InstantiationMode,
    /// Nesting depth at which formula pretty-printing truncates.
    pub print_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            timeout_ms: 2_000,
            random_seed: 0,
            instantiation: InstantiationMode::Conservative,
            print_depth: 8,
        }
    }
}
