//! Integrity-constraint folding.
//!
//! The caller decides *which* constraints apply (that discovery is part of
//! the external translation layer); this module folds the chosen uniqueness
//! facts into the term:
//!
//! - **key merge**: `t(x)·t(y)·[k(x) = k(y)]` with `t.k` unique admits the
//!   factor `[x = y]` (distinct rows of `t` cannot share a key value), which
//!   concretization then uses to eliminate a bound variable;
//! - **canonical squash**: a duplicate-free relation is 0/1-valued, so a
//!   summation body built only from 0/1-valued factors equals its own squash;
//!   wrapping it makes the two sides' reduced forms syntactically comparable.

use uveq_ast::{Catalog, Context, PredKind, TermId, UTerm, UVar, VarId};

use crate::analysis::product_factors;

/// Fold uniqueness facts everywhere in the term.
pub fn fold_unique_keys(ctx: &mut Context, term: TermId, catalog: &Catalog) -> TermId {
    let node = ctx.get(term).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. }
        | UTerm::Pred { .. } | UTerm::Func { .. } => term,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| fold_unique_keys(ctx, op, catalog))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(_) => key_merge(ctx, term, catalog),
        UTerm::Squash(body) => {
            let nb = fold_unique_keys(ctx, body, catalog);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = fold_unique_keys(ctx, body, catalog);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => {
            let mut nb = fold_unique_keys(ctx, body, catalog);
            if is_boolean(ctx, nb, catalog) && !matches!(ctx.get(nb), UTerm::Squash(_)) {
                nb = ctx.squash(nb);
            }
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                term
            }
        }
    }
}

/// Add `[x = y]` for every key-equated pair of scans of a uniquely-keyed
/// relation within one product.
fn key_merge(ctx: &mut Context, product: TermId, catalog: &Catalog) -> TermId {
    let factors = product_factors(ctx, product);

    // Relation scans: base var → table name.
    let mut scans: Vec<(VarId, String)> = Vec::new();
    for &f in &factors {
        if let UTerm::Table { name, var } = ctx.get(f) {
            let base = ctx.base_of(*var);
            scans.push((base, ctx.sym_name(*name).to_string()));
        }
    }

    let mut new_equalities: Vec<(VarId, VarId)> = Vec::new();
    for &f in &factors {
        let Some((attr, x, y)) = as_key_equality(ctx, f) else {
            continue;
        };
        if x == y {
            continue;
        }
        let table_of = |v: VarId| -> Option<&String> {
            scans.iter().find(|(s, _)| *s == v).map(|(_, t)| t)
        };
        let (Some(tx), Some(ty)) = (table_of(x), table_of(y)) else {
            continue;
        };
        if tx == ty && catalog.is_unique_key(tx, &attr) {
            new_equalities.push((x, y));
        }
    }
    if new_equalities.is_empty() {
        return product;
    }

    let mut out: Vec<TermId> = factors.to_vec();
    for (x, y) in new_equalities {
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let eq = ctx.eq(xv, yv);
        if !out.contains(&eq) {
            out.push(eq);
        }
    }
    ctx.mul_of(out)
}

/// `[k(x) = k(y)]` over the *same* attribute of two base tuples; returns
/// `(attribute, x, y)`.
fn as_key_equality(ctx: &Context, factor: TermId) -> Option<(String, VarId, VarId)> {
    let UTerm::Pred {
        kind: PredKind::Eq,
        args,
    } = ctx.get(factor)
    else {
        return None;
    };
    if args.len() != 2 {
        return None;
    }
    let (UTerm::Var(a), UTerm::Var(b)) = (ctx.get(args[0]), ctx.get(args[1])) else {
        return None;
    };
    let (
        UVar::Proj { attr: ka, of: xa },
        UVar::Proj { attr: kb, of: xb },
    ) = (ctx.var_node(*a), ctx.var_node(*b))
    else {
        return None;
    };
    if ka != kb {
        return None;
    }
    let (xa, xb) = (*xa, *xb);
    if !matches!(ctx.var_node(xa), UVar::Base(_)) || !matches!(ctx.var_node(xb), UVar::Base(_)) {
        return None;
    }
    Some((ctx.sym_name(*ka).to_string(), xa, xb))
}

/// Whether the term is provably 0/1-valued under the catalog: predicates,
/// complements and squashes always are; a relation scan is when the relation
/// is duplicate-free; a product of 0/1 factors is.
pub fn is_boolean(ctx: &Context, term: TermId, catalog: &Catalog) -> bool {
    match ctx.get(term) {
        UTerm::Const(c) => *c == 0 || *c == 1,
        UTerm::Pred { .. } | UTerm::Not(_) | UTerm::Squash(_) => true,
        UTerm::Table { name, .. } => catalog.is_duplicate_free(ctx.sym_name(*name)),
        UTerm::Mul(ops) => ops.iter().all(|&op| is_boolean(ctx, op, catalog)),
        _ => false,
    }
}
