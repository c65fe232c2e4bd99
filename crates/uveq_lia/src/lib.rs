//! # LIA★ target language
//!
//! Linear integer arithmetic extended with uninterpreted applications,
//! if-then-else and a Kleene-star summation construct, plus the compiler
//! from U-expressions into it and an algebraic simplifier run before the
//! formula reaches a solver.

pub mod compile;
pub mod formula;
pub mod simplify;

pub use compile::{compile_neq, CompileError, Compiler};
pub use formula::{CmpOp, LFormula, LTerm};
pub use simplify::simplify;
