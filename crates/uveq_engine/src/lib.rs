//! # U-expression rewriting engine
//!
//! Everything between term construction and LIA★ compilation:
//!
//! - [`normalize`]: canonical sum-of-products form,
//! - [`preprocess`]: null propagation, constant propagation, concretization
//!   and the integrity-constraint fold,
//! - [`matcher`]: common-tuple alignment of the two sides' summations,
//! - [`eval`]: a naive multiset evaluator used as the semantics oracle in
//!   property tests.
//!
//! Every pass is a total function `TermId -> TermId` over a shared arena;
//! inputs are never mutated (interning makes "copy before rewrite" free).

pub mod analysis;
pub mod error;
pub mod eval;
pub mod integrity;
pub mod matcher;
pub mod normalize;
pub mod preprocess;
pub mod weak_eq;

pub use error::MatchError;
pub use matcher::{align_common_tuple, MatchResult, Side, SumSlot};
pub use normalize::normalize;
pub use preprocess::preprocess;
pub use weak_eq::weak_eq;
