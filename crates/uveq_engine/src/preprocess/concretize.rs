//! Concretization of bound variables.
//!
//! A summation whose body forces a bound tuple variable equal to another
//! variable does not really quantify over that variable. `∑x,y([x = y]·E)`
//! becomes `∑y(E[y/x])`; when the partner is an outer (free) variable the
//! bound set shrinks toward empty and the summation may collapse entirely.
//!
//! Candidate selection prefers eliminating toward an outer variable; for a
//! bound-bound equality the kept variable is the one whose equivalence class
//! already reaches an outer variable (so later eliminations can finish the
//! job), with the structural order as the final tie-break.

use rustc_hash::FxHashMap;
use tracing::debug;
use uveq_ast::traversal::substitute_var;
use uveq_ast::{Context, PredKind, TermId, UTerm, UVar, VarId};

use crate::analysis::product_factors;

/// Apply concretization to every summation in the term.
pub fn concretize(ctx: &mut Context, term: TermId) -> TermId {
    let node = ctx.get(term).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. }
        | UTerm::Pred { .. } | UTerm::Func { .. } => term,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops.iter().map(|&op| concretize(ctx, op)).collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(ops) => {
            let new: Vec<TermId> = ops.iter().map(|&op| concretize(ctx, op)).collect();
            if new != ops {
                ctx.add(UTerm::Mul(new))
            } else {
                term
            }
        }
        UTerm::Squash(body) => {
            let nb = concretize(ctx, body);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = concretize(ctx, body);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => concretize_sum(ctx, bound, body),
    }
}

fn concretize_sum(ctx: &mut Context, mut bound: Vec<VarId>, body: TermId) -> TermId {
    // A squashed body hides its product; eliminating through the squash is
    // sound (∑x,y ‖[x=y]·E‖ = ∑y ‖E[y/x]‖).
    let (squashed, mut inner) = match ctx.get(body) {
        UTerm::Squash(b) => (true, *b),
        _ => (false, body),
    };
    loop {
        let Some((eliminate, keep)) = pick_elimination(ctx, &bound, inner) else {
            break;
        };
        debug!(
            eliminate = %ctx.display_var(eliminate),
            keep = %ctx.display_var(keep),
            "concretizing bound variable"
        );
        inner = substitute_var(ctx, inner, eliminate, keep);
        bound.retain(|&v| v != eliminate);
    }
    let inner = concretize(ctx, inner);
    let body = if squashed { ctx.squash(inner) } else { inner };
    ctx.sum(bound, body)
}

/// Choose `(eliminate, keep)` from the tuple-level equalities of the body
/// product, or `None` when no bound variable is forced.
fn pick_elimination(ctx: &Context, bound: &[VarId], body: TermId) -> Option<(VarId, VarId)> {
    let equalities = tuple_equalities(ctx, body);
    if equalities.is_empty() {
        return None;
    }

    // First preference: a bound variable equal to an outer variable.
    for &(a, b) in &equalities {
        if bound.contains(&a) && !bound.contains(&b) {
            return Some((a, b));
        }
        if bound.contains(&b) && !bound.contains(&a) {
            return Some((b, a));
        }
    }

    // Otherwise collapse a bound-bound pair. Keep the variable that sits in
    // the larger equivalence class (more equalities reach it, so later rounds
    // can keep eliminating toward it); structural order breaks ties.
    let mut degree: FxHashMap<VarId, usize> = FxHashMap::default();
    for &(a, b) in &equalities {
        *degree.entry(a).or_insert(0) += 1;
        *degree.entry(b).or_insert(0) += 1;
    }
    for &(a, b) in &equalities {
        if bound.contains(&a) && bound.contains(&b) && a != b {
            let da = degree.get(&a).copied().unwrap_or(0);
            let db = degree.get(&b).copied().unwrap_or(0);
            let a_first = match da.cmp(&db) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => {
                    uveq_ast::ordering::compare_var(ctx, a, b) == std::cmp::Ordering::Less
                }
            };
            let (keep, eliminate) = if a_first { (a, b) } else { (b, a) };
            return Some((eliminate, keep));
        }
    }
    None
}

/// Base-variable equalities `[x = y]` among the body's factors.
fn tuple_equalities(ctx: &Context, body: TermId) -> Vec<(VarId, VarId)> {
    let mut out = Vec::new();
    for factor in product_factors(ctx, body) {
        if let UTerm::Pred {
            kind: PredKind::Eq,
            args,
        } = ctx.get(factor)
        {
            if args.len() == 2 {
                if let (UTerm::Var(a), UTerm::Var(b)) = (ctx.get(args[0]), ctx.get(args[1])) {
                    let (a, b) = (*a, *b);
                    let a_base = matches!(ctx.var_node(a), UVar::Base(_));
                    let b_base = matches!(ctx.var_node(b), UVar::Base(_));
                    if a_base && b_base && a != b {
                        out.push((a, b));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn bound_outer_equality_eliminates_bound_var() {
        let mut ctx = Context::new();
        let x = ctx.base("x0"); // outer
        let y = ctx.base("x1"); // bound
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let link = ctx.eq(xv, yv);
        let ty = ctx.table("t0", y);
        let body = ctx.mul_of(vec![link, ty]);
        let s = ctx.sum(vec![y], body);
        let out = concretize(&mut ctx, s);
        let out = normalize(&mut ctx, out);
        // ∑y([x=y]·t0(y)) → [x=x]·t0(x) → t0(x)
        let expect = ctx.table("t0", x);
        assert_eq!(out, expect);
    }

    #[test]
    fn bound_bound_equality_collapses_one_var() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let link = ctx.eq(xv, yv);
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t0", y);
        let body = ctx.mul_of(vec![link, tx, ty]);
        let s = ctx.sum(vec![x, y], body);
        let out = concretize(&mut ctx, s);
        match ctx.get(out) {
            UTerm::Sum { bound, .. } => assert_eq!(bound.len(), 1),
            other => panic!("expected summation, got {:?}", other),
        }
    }

    #[test]
    fn no_equality_is_a_no_op() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let s = ctx.sum(vec![x], t);
        assert_eq!(concretize(&mut ctx, s), s);
    }
}
