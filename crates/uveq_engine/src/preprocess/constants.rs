//! Constant propagation through equality predicates.
//!
//! Within one product, `[v = 3]` binds `v` to 3; every further scalar
//! occurrence of `v` in the product is substituted. A second binding to a
//! different literal makes the product unsatisfiable and collapses it to 0.
//! The binding predicate itself is kept (it still constrains `v`).

use rustc_hash::FxHashMap;
use uveq_ast::traversal::substitute_scalar;
use uveq_ast::{Context, PredKind, TermId, UTerm, VarId};

use crate::analysis::product_factors;

/// Apply constant propagation everywhere in the term.
pub fn propagate_constants(ctx: &mut Context, term: TermId) -> TermId {
    let node = ctx.get(term).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. }
        | UTerm::Pred { .. } | UTerm::Func { .. } => term,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| propagate_constants(ctx, op))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(_) => propagate_in_product(ctx, term),
        UTerm::Squash(body) => {
            let nb = propagate_constants(ctx, body);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = propagate_constants(ctx, body);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => {
            let nb = propagate_constants(ctx, body);
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                term
            }
        }
    }
}

fn propagate_in_product(ctx: &mut Context, product: TermId) -> TermId {
    let factors = product_factors(ctx, product);

    // Solve bindings online, first factor wins; a conflicting second binding
    // kills the product.
    let mut bindings: FxHashMap<VarId, TermId> = FxHashMap::default();
    for &factor in &factors {
        if let Some((var, lit)) = as_literal_binding(ctx, factor) {
            match bindings.get(&var) {
                Some(&prev) if prev != lit => return ctx.zero(),
                Some(_) => {}
                None => {
                    bindings.insert(var, lit);
                }
            }
        }
    }

    let mut new_factors: Vec<TermId> = Vec::with_capacity(factors.len());
    for &factor in &factors {
        let mut f = propagate_constants(ctx, factor);
        if as_literal_binding(ctx, f).is_none() {
            for (&var, &lit) in &bindings {
                f = substitute_scalar(ctx, f, var, lit);
            }
        }
        new_factors.push(f);
    }
    ctx.mul_of(new_factors)
}

/// `[Var(v) = literal]` (arguments in either order).
fn as_literal_binding(ctx: &Context, term: TermId) -> Option<(VarId, TermId)> {
    if let UTerm::Pred { kind: PredKind::Eq, args } = ctx.get(term) {
        if args.len() != 2 {
            return None;
        }
        let (a, b) = (args[0], args[1]);
        match (ctx.get(a), ctx.get(b)) {
            (UTerm::Const(_) | UTerm::Str(_), UTerm::Var(v)) => return Some((*v, a)),
            (UTerm::Var(v), UTerm::Const(_) | UTerm::Str(_)) => return Some((*v, b)),
            _ => {}
        }
    }
    None
}
