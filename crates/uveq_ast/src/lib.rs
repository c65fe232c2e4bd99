//! # U-expression term algebra
//!
//! U-expressions are semiring-valued formulas over tuple variables: they map a
//! database instance to the multiplicity of each output tuple. This crate owns
//! the term representation and nothing else; normalization and compilation
//! live in `uveq_engine` and `uveq_lia`.
//!
//! ## Representation
//!
//! All nodes are interned in a [`Context`] arena. Two terms are structurally
//! equal exactly when their [`TermId`]s are equal, so "deep copy before
//! rewriting" is just copying an id and rewrites can never observe a
//! partially-mutated sibling tree.

pub mod context;
pub mod display;
pub mod ordering;
pub mod schema;
pub mod term;
pub mod traversal;
pub mod var;

pub use context::{Context, Symbol, TermId, VarId};
pub use schema::{Catalog, Column, ColumnType, Schema, TableSchema, UniqueKey};
pub use term::{PredKind, UTerm};
pub use var::{UVar, VarGen};
