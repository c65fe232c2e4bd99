//! # Equivalence orchestration
//!
//! The outward face of the pipeline: [`Prover::prove_eq`] takes two
//! U-expressions with their designated output variables and answers
//! [`Verdict::Eq`], [`Verdict::Neq`], [`Verdict::Unknown`] or
//! [`Verdict::FastRejected`], never panicking on release builds.
//!
//! The arithmetic back end is abstract ([`LiaStarSolver`]); the bundled
//! [`BoundedSearchSolver`] is a small model-search oracle good enough for
//! ground formulas and the test suite, while a production deployment plugs
//! in an SMT-backed implementation.

pub mod backend;
pub mod bounded;
pub mod config;
pub mod prover;
pub mod verdict;

pub use backend::{LiaStarSolver, SolverOutcome};
pub use bounded::BoundedSearchSolver;
pub use config::{InstantiationMode, SolverConfig};
pub use prover::{Prover, QuerySide};
pub use verdict::Verdict;
