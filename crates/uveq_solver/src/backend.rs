//! The contract an arithmetic back end must satisfy.

use uveq_lia::LFormula;

use crate::config::SolverConfig;

/// Tri-state answer of a satisfiability check. The orchestrator never
/// inspects a model, only this verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverOutcome {
    Sat,
    Unsat,
    Unknown,
}

/// A LIA★ decision oracle. Implementations must treat timeouts, resource
/// exhaustion and internal errors as [`SolverOutcome::Unknown`]; `check`
/// must not panic on any well-formed formula.
pub trait LiaStarSolver {
    fn check(&mut self, formula: &LFormula, config: &SolverConfig) -> SolverOutcome;
}
