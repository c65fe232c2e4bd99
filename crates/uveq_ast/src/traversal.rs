//! Tree walks: free-variable analysis and substitution.
//!
//! Substitution is capture-aware: a base variable re-bound by an inner
//! summation is never substituted inside that summation, and substituting a
//! target that an inner summation binds is a caller error (the matcher and
//! concretization always substitute toward fresh or outer variables).

use std::collections::BTreeSet;

use crate::context::{Context, TermId, VarId};
use crate::term::UTerm;
use crate::var::UVar;

/// Base variables occurring free in `term` (bound sets of summations are
/// subtracted). `BTreeSet` keeps iteration deterministic for the matcher.
pub fn free_vars(ctx: &Context, term: TermId) -> BTreeSet<VarId> {
    let mut out = BTreeSet::new();
    collect_free(ctx, term, &mut BTreeSet::new(), &mut out);
    out
}

fn collect_free(
    ctx: &Context,
    term: TermId,
    bound: &mut BTreeSet<VarId>,
    out: &mut BTreeSet<VarId>,
) {
    match ctx.get(term) {
        UTerm::Const(_) | UTerm::Str(_) => {}
        UTerm::Var(v) => {
            for base in ctx.bases_of(*v) {
                if !bound.contains(&base) {
                    out.insert(base);
                }
            }
        }
        UTerm::Table { var, .. } => {
            for base in ctx.bases_of(*var) {
                if !bound.contains(&base) {
                    out.insert(base);
                }
            }
        }
        UTerm::Add(ops) | UTerm::Mul(ops) => {
            for op in ops.clone() {
                collect_free(ctx, op, bound, out);
            }
        }
        UTerm::Pred { args, .. } | UTerm::Func { args, .. } => {
            for arg in args.clone() {
                collect_free(ctx, arg, bound, out);
            }
        }
        UTerm::Squash(body) | UTerm::Not(body) => collect_free(ctx, *body, bound, out),
        UTerm::Sum { bound: bs, body } => {
            let body = *body;
            let newly: Vec<VarId> = bs.iter().copied().filter(|v| bound.insert(*v)).collect();
            collect_free(ctx, body, bound, out);
            for v in newly {
                bound.remove(&v);
            }
        }
    }
}

/// Whether the base variable `var` occurs free in `term`.
pub fn uses_var(ctx: &Context, term: TermId, var: VarId) -> bool {
    free_vars(ctx, term).contains(&var)
}

/// Replace free occurrences of the base variable `from` with the variable
/// `to`, rewriting through `Proj`/`Concat` views. Returns a new term id (or
/// the original if nothing changed).
pub fn substitute_var(ctx: &mut Context, term: TermId, from: VarId, to: VarId) -> TermId {
    debug_assert!(matches!(ctx.var_node(from), UVar::Base(_)));
    let node = ctx.get(term).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) => term,
        UTerm::Var(v) => {
            let nv = substitute_in_var(ctx, v, from, to);
            if nv != v {
                ctx.scalar(nv)
            } else {
                term
            }
        }
        UTerm::Table { name, var } => {
            let nv = substitute_in_var(ctx, var, from, to);
            if nv != var {
                ctx.add(UTerm::Table { name, var: nv })
            } else {
                term
            }
        }
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_var(ctx, op, from, to))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_var(ctx, op, from, to))
                .collect();
            if new != ops {
                ctx.add(UTerm::Mul(new))
            } else {
                term
            }
        }
        UTerm::Pred { kind, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_var(ctx, arg, from, to))
                .collect();
            if new != args {
                ctx.add(UTerm::Pred { kind, args: new })
            } else {
                term
            }
        }
        UTerm::Func { name, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_var(ctx, arg, from, to))
                .collect();
            if new != args {
                ctx.add(UTerm::Func { name, args: new })
            } else {
                term
            }
        }
        UTerm::Squash(body) => {
            let nb = substitute_var(ctx, body, from, to);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = substitute_var(ctx, body, from, to);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => {
            if bound.contains(&from) {
                // `from` is re-bound here; its occurrences below are not free.
                return term;
            }
            debug_assert!(
                !ctx.bases_of(to).iter().any(|b| bound.contains(b)),
                "substitution target captured by an inner summation"
            );
            let nb = substitute_var(ctx, body, from, to);
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                term
            }
        }
    }
}

fn substitute_in_var(ctx: &mut Context, var: VarId, from: VarId, to: VarId) -> VarId {
    if var == from {
        return to;
    }
    match ctx.var_node(var).clone() {
        UVar::Base(_) => var,
        UVar::Proj { attr, of } => {
            let no = substitute_in_var(ctx, of, from, to);
            if no != of {
                ctx.var(UVar::Proj { attr, of: no })
            } else {
                var
            }
        }
        UVar::Concat(a, b) => {
            let na = substitute_in_var(ctx, a, from, to);
            let nb = substitute_in_var(ctx, b, from, to);
            if na != a || nb != b {
                ctx.var(UVar::Concat(na, nb))
            } else {
                var
            }
        }
    }
}

/// Replace every occurrence of the subterm `from` with `to` (id-based, like a
/// pointer-identity substitution; used by constant propagation).
pub fn substitute_term(ctx: &mut Context, root: TermId, from: TermId, to: TermId) -> TermId {
    if root == from {
        return to;
    }
    let node = ctx.get(root).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. } => root,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_term(ctx, op, from, to))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                root
            }
        }
        UTerm::Mul(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_term(ctx, op, from, to))
                .collect();
            if new != ops {
                ctx.add(UTerm::Mul(new))
            } else {
                root
            }
        }
        UTerm::Pred { kind, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_term(ctx, arg, from, to))
                .collect();
            if new != args {
                ctx.add(UTerm::Pred { kind, args: new })
            } else {
                root
            }
        }
        UTerm::Func { name, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_term(ctx, arg, from, to))
                .collect();
            if new != args {
                ctx.add(UTerm::Func { name, args: new })
            } else {
                root
            }
        }
        UTerm::Squash(body) => {
            let nb = substitute_term(ctx, body, from, to);
            if nb != body {
                ctx.squash(nb)
            } else {
                root
            }
        }
        UTerm::Not(body) => {
            let nb = substitute_term(ctx, body, from, to);
            if nb != body {
                ctx.negate(nb)
            } else {
                root
            }
        }
        UTerm::Sum { bound, body } => {
            let nb = substitute_term(ctx, body, from, to);
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                root
            }
        }
    }
}

/// Replace free scalar occurrences `Var(var)` with the literal term `lit`
/// (capture-aware, unlike [`substitute_term`]). Projections of `var` are left
/// alone; only the whole-variable scalar is a constant-propagation target.
pub fn substitute_scalar(ctx: &mut Context, term: TermId, var: VarId, lit: TermId) -> TermId {
    let base = ctx.base_of(var);
    let node = ctx.get(term).clone();
    match node {
        UTerm::Var(v) if v == var => lit,
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. } => term,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_scalar(ctx, op, var, lit))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| substitute_scalar(ctx, op, var, lit))
                .collect();
            if new != ops {
                ctx.add(UTerm::Mul(new))
            } else {
                term
            }
        }
        UTerm::Pred { kind, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_scalar(ctx, arg, var, lit))
                .collect();
            if new != args {
                ctx.add(UTerm::Pred { kind, args: new })
            } else {
                term
            }
        }
        UTerm::Func { name, args } => {
            let new: Vec<TermId> = args
                .iter()
                .map(|&arg| substitute_scalar(ctx, arg, var, lit))
                .collect();
            if new != args {
                ctx.add(UTerm::Func { name, args: new })
            } else {
                term
            }
        }
        UTerm::Squash(body) => {
            let nb = substitute_scalar(ctx, body, var, lit);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = substitute_scalar(ctx, body, var, lit);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => {
            if bound.contains(&base) {
                return term;
            }
            let nb = substitute_scalar(ctx, body, var, lit);
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                term
            }
        }
    }
}

/// Postorder visit of every subterm (children before parents, root last).
pub fn for_each_subterm(ctx: &Context, root: TermId, f: &mut impl FnMut(TermId)) {
    match ctx.get(root).clone() {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. } => {}
        UTerm::Add(ops) | UTerm::Mul(ops) => {
            for op in ops {
                for_each_subterm(ctx, op, f);
            }
        }
        UTerm::Pred { args, .. } | UTerm::Func { args, .. } => {
            for arg in args {
                for_each_subterm(ctx, arg, f);
            }
        }
        UTerm::Squash(body) | UTerm::Not(body) | UTerm::Sum { body, .. } => {
            for_each_subterm(ctx, body, f);
        }
    }
    f(root);
}
