//! The equivalence orchestrator.
//!
//! One [`Prover::prove_eq`] call runs the whole pipeline once: output check,
//! preprocessing, weak structural equality, summation alignment, LIA★
//! compilation, simplification, solver. Every failure mode maps to a
//! [`Verdict`]; nothing escapes as a panic in release builds. Re-driving the
//! pipeline with different integrity-constraint selections is the caller's
//! policy, not handled here.

use tracing::debug;
use uveq_ast::traversal::substitute_term;
use uveq_ast::{Catalog, Context, Symbol, TermId, UTerm, VarGen, VarId};
use uveq_engine::analysis::{collect_top_summations, var_tables};
use uveq_engine::{align_common_tuple, normalize, preprocess, weak_eq, Side, SumSlot};
use uveq_lia::{compile_neq, simplify, LFormula};

use crate::backend::{LiaStarSolver, SolverOutcome};
use crate::config::SolverConfig;
use crate::verdict::Verdict;

/// One side of an equivalence check: the expression and its designated
/// output (free) tuple variable.
#[derive(Debug, Clone, Copy)]
pub struct QuerySide {
    pub term: TermId,
    pub output: VarId,
}

/// Pipeline driver. Owns the immutable configuration and a solver session;
/// concurrent checks each use their own `Prover`.
pub struct Prover<S> {
    config: SolverConfig,
    solver: S,
}

impl<S: LiaStarSolver> Prover<S> {
    pub fn new(config: SolverConfig, solver: S) -> Self {
        Prover { config, solver }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn prove_eq(
        &mut self,
        ctx: &mut Context,
        catalog: Option<&Catalog>,
        left: QuerySide,
        right: QuerySide,
    ) -> Verdict {
        if left.output != right.output {
            // Different output widths are a schema mismatch; equal widths
            // with different designated variables are an immediate
            // inequivalence. Neither consults the solver.
            if ctx.bases_of(left.output).len() != ctx.bases_of(right.output).len() {
                debug!("output schemas differ, rejecting before any work");
                return Verdict::FastRejected;
            }
            debug!("output variables differ, refuting before any work");
            return Verdict::Neq;
        }

        let l = preprocess(ctx, left.term, catalog);
        let r = preprocess(ctx, right.term, catalog);
        if weak_eq(ctx, l, r) {
            debug!("weak structural equality hit");
            return Verdict::Eq;
        }

        let (l, r) = self.align(ctx, l, r, left.output);

        let formula = match compile_neq(ctx, l, r, catalog) {
            Ok(f) => f,
            Err(err) => {
                debug!(%err, "compilation has no rule for this term");
                return Verdict::Unknown;
            }
        };
        let formula = simplify(&formula);
        match formula {
            // The difference is contradictory before any solving.
            LFormula::False => return Verdict::Eq,
            LFormula::True => return Verdict::Neq,
            _ => {}
        }

        match self.solver.check(&formula, &self.config) {
            SolverOutcome::Unsat => Verdict::Eq,
            SolverOutcome::Sat => Verdict::Neq,
            SolverOutcome::Unknown => Verdict::Unknown,
        }
    }

    /// Rewrite both sides' summations onto a common tuple when their schemas
    /// overlap. Alignment never changes semantics, only names, so any
    /// failure just means compiling the sides as they stand.
    fn align(
        &self,
        ctx: &mut Context,
        l: TermId,
        r: TermId,
        output: VarId,
    ) -> (TermId, TermId) {
        let left_sums = collect_top_summations(ctx, l);
        let right_sums = collect_top_summations(ctx, r);
        if left_sums.is_empty() || right_sums.is_empty() {
            return (l, r);
        }
        // The matcher requires the two sides to scan a common relation.
        let lt = bound_tables(ctx, &left_sums);
        let rt = bound_tables(ctx, &right_sums);
        if !lt.iter().any(|t| rt.contains(t)) {
            debug!("summations scan disjoint schemas, skipping alignment");
            return (l, r);
        }

        let slots: Vec<SumSlot> = left_sums
            .iter()
            .map(|&term| SumSlot {
                side: Side::Left,
                term,
            })
            .chain(right_sums.iter().map(|&term| SumSlot {
                side: Side::Right,
                term,
            }))
            .collect();
        let mut gen = VarGen::new();
        match align_common_tuple(ctx, &slots, output, &mut gen) {
            Ok(result) => {
                let mut new_l = l;
                let mut new_r = r;
                for (orig, rewritten) in slots.iter().zip(&result.rewritten) {
                    if orig.term == rewritten.term {
                        continue;
                    }
                    match orig.side {
                        Side::Left => {
                            new_l = substitute_term(ctx, new_l, orig.term, rewritten.term)
                        }
                        Side::Right => {
                            new_r = substitute_term(ctx, new_r, orig.term, rewritten.term)
                        }
                    }
                }
                let new_l = normalize(ctx, new_l);
                let new_r = normalize(ctx, new_r);
                (new_l, new_r)
            }
            Err(err) => {
                debug!(%err, "alignment failed, compiling unaligned sides");
                (l, r)
            }
        }
    }
}

/// Relations scanned by the bound variables of the given summations.
fn bound_tables(ctx: &Context, sums: &[TermId]) -> Vec<Symbol> {
    let mut out = Vec::new();
    for &sum in sums {
        let UTerm::Sum { bound, body } = ctx.get(sum) else {
            continue;
        };
        let tables = var_tables(ctx, *body);
        for v in bound {
            if let Some(&t) = tables.get(v) {
                out.push(t);
            }
        }
    }
    out
}
