//! Canonical sum-of-products normalization.
//!
//! # Contract
//!
//! `normalize` is total and side-effect-free on its input id. After it
//! returns:
//!
//! - no `Add` operand is an `Add`, no `Mul` operand is a `Mul`;
//! - commutative operand lists are sorted by the structural order, so two
//!   semantically-built-differently-but-equal trees intern to the same id;
//! - `Mul` absorbs `Const(1)` and collapses on `Const(0)`;
//! - a product with exactly one `Add` operand distributes over it (bounded:
//!   products with several sum operands are left alone, avoiding DNF blow-up);
//! - squash factors of a product merge (`‖a‖·‖b‖ → ‖a·b‖`), `‖‖x‖‖ → ‖x‖`,
//!   and operands under a squash are deduplicated (`‖x·x‖ = ‖x‖`);
//! - `not` folds only over constant (provably zero / provably nonzero)
//!   bodies; `not(not(x))` is *not* rewritten to `x`;
//! - summations split over sums, merge with disjoint nested summations and
//!   vanish over `Const(0)` or an empty bound set;
//! - trivial predicates fold: `[x = x] → 1` for null-free scalars (tuple
//!   identities and literals), ground comparisons evaluate.
//!
//! Idempotence (`normalize ∘ normalize = normalize`) is covered by property
//! tests in `tests/property_tests.rs`.

use rustc_hash::FxHashMap;
use uveq_ast::ordering::compare_term;
use uveq_ast::{Context, PredKind, TermId, UTerm, UVar, VarId};

/// Iteration cap for the outer fixpoint; each pass strictly shrinks a
/// syntactic measure, so this is never reached in practice.
const MAX_ROUNDS: usize = 64;

/// Rewrite `term` into canonical sum-of-products form.
pub fn normalize(ctx: &mut Context, term: TermId) -> TermId {
    let mut current = term;
    for _ in 0..MAX_ROUNDS {
        let mut memo = FxHashMap::default();
        let next = pass(ctx, current, &mut memo);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn pass(ctx: &mut Context, term: TermId, memo: &mut FxHashMap<TermId, TermId>) -> TermId {
    if let Some(&done) = memo.get(&term) {
        return done;
    }
    let node = ctx.get(term).clone();
    let result = match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. } => term,
        UTerm::Add(ops) => norm_add(ctx, &ops, memo),
        UTerm::Mul(ops) => norm_mul(ctx, &ops, memo),
        UTerm::Squash(body) => norm_squash(ctx, body, memo),
        UTerm::Not(body) => norm_not(ctx, body, memo),
        UTerm::Sum { bound, body } => norm_sum(ctx, bound, body, memo),
        UTerm::Pred { kind, args } => norm_pred(ctx, kind, &args, memo),
        UTerm::Func { name, args } => {
            let new: Vec<TermId> = args.iter().map(|&a| pass(ctx, a, memo)).collect();
            if new == args {
                term
            } else {
                ctx.add(UTerm::Func { name, args: new })
            }
        }
    };
    memo.insert(term, result);
    result
}

fn norm_add(ctx: &mut Context, ops: &[TermId], memo: &mut FxHashMap<TermId, TermId>) -> TermId {
    let mut flat: Vec<TermId> = Vec::with_capacity(ops.len());
    let mut constant: i64 = 0;
    for &op in ops {
        let n = pass(ctx, op, memo);
        match ctx.get(n) {
            UTerm::Add(inner) => flat.extend(inner.iter().copied()),
            UTerm::Const(c) => constant += *c,
            _ => flat.push(n),
        }
    }
    if constant != 0 {
        flat.push(ctx.num(constant));
    }
    flat.sort_by(|&a, &b| compare_term(ctx, a, b));
    ctx.add_of(flat)
}

fn norm_mul(ctx: &mut Context, ops: &[TermId], memo: &mut FxHashMap<TermId, TermId>) -> TermId {
    let mut factors: Vec<TermId> = Vec::with_capacity(ops.len());
    let mut squash_bodies: Vec<TermId> = Vec::new();
    let mut constant: i64 = 1;
    for &op in ops {
        let n = pass(ctx, op, memo);
        match ctx.get(n) {
            UTerm::Mul(inner) => {
                // Inner operands are already normalized; re-dispatch squashes
                // and constants among them.
                for &f in inner.clone().iter() {
                    match ctx.get(f) {
                        UTerm::Const(c) => constant *= *c,
                        UTerm::Squash(b) => squash_bodies.push(*b),
                        _ => factors.push(f),
                    }
                }
            }
            UTerm::Const(c) => constant *= *c,
            UTerm::Squash(b) => squash_bodies.push(*b),
            _ => factors.push(n),
        }
    }
    if constant == 0 {
        return ctx.zero();
    }

    // ‖a‖·‖b‖ → ‖a·b‖ (both are 1 exactly when a and b are both nonzero).
    match squash_bodies.len() {
        0 => {}
        1 => {
            let sq = ctx.squash(squash_bodies[0]);
            factors.push(pass(ctx, sq, memo));
        }
        _ => {
            let body = ctx.mul_of(squash_bodies);
            let sq = ctx.squash(body);
            factors.push(pass(ctx, sq, memo));
        }
    }

    // Bounded distribution: a product with exactly one sum operand
    // distributes over it; several sum operands are left alone.
    let add_positions: Vec<usize> = factors
        .iter()
        .enumerate()
        .filter(|(_, &f)| matches!(ctx.get(f), UTerm::Add(_)))
        .map(|(i, _)| i)
        .collect();
    if add_positions.len() == 1 {
        let pos = add_positions[0];
        let addends = match ctx.get(factors[pos]) {
            UTerm::Add(inner) => inner.clone(),
            _ => unreachable!(),
        };
        let rest: Vec<TermId> = factors
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, &f)| f)
            .collect();
        let mut sums = Vec::with_capacity(addends.len());
        for addend in addends {
            let mut prod = rest.clone();
            prod.push(addend);
            if constant != 1 {
                prod.push(ctx.num(constant));
            }
            sums.push(ctx.mul_of(prod));
        }
        let sum = ctx.add_of(sums);
        return pass(ctx, sum, memo);
    }

    if constant != 1 {
        factors.push(ctx.num(constant));
    }
    factors.sort_by(|&a, &b| compare_term(ctx, a, b));
    ctx.mul_of(factors)
}

fn norm_squash(ctx: &mut Context, body: TermId, memo: &mut FxHashMap<TermId, TermId>) -> TermId {
    let b = pass(ctx, body, memo);
    match ctx.get(b).clone() {
        UTerm::Const(0) => ctx.zero(),
        UTerm::Const(_) => ctx.one(),
        // Idempotence: ‖‖x‖‖ = ‖x‖.
        UTerm::Squash(_) => b,
        UTerm::Mul(ops) => {
            // Under a squash, multiplicities do not matter: lift inner
            // squashes and drop duplicate factors. Operands arrive sorted
            // from `norm_mul`, so `dedup` removes all repeats.
            let mut inner: Vec<TermId> = Vec::with_capacity(ops.len());
            let mut changed = false;
            for op in ops {
                match ctx.get(op) {
                    UTerm::Squash(x) => {
                        inner.push(*x);
                        changed = true;
                    }
                    _ => inner.push(op),
                }
            }
            let before = inner.len();
            inner.sort_by(|&a, &b| compare_term(ctx, a, b));
            inner.dedup();
            changed |= inner.len() != before;
            if changed {
                let prod = ctx.mul_of(inner);
                let sq = ctx.squash(prod);
                pass(ctx, sq, memo)
            } else {
                ctx.squash(b)
            }
        }
        _ => ctx.squash(b),
    }
}

fn norm_not(ctx: &mut Context, body: TermId, memo: &mut FxHashMap<TermId, TermId>) -> TermId {
    let b = pass(ctx, body, memo);
    match ctx.get(b) {
        UTerm::Const(0) => ctx.one(),
        UTerm::Const(_) => ctx.zero(),
        // not(not(x)) stays: x may exceed 1, so the double complement is the
        // squash of x, not x itself.
        _ => ctx.negate(b),
    }
}

fn norm_sum(
    ctx: &mut Context,
    bound: Vec<uveq_ast::VarId>,
    body: TermId,
    memo: &mut FxHashMap<TermId, TermId>,
) -> TermId {
    let b = pass(ctx, body, memo);
    match ctx.get(b).clone() {
        UTerm::Const(0) => ctx.zero(),
        // ∑(a + b) = ∑a + ∑b.
        UTerm::Add(ops) => {
            let sums: Vec<TermId> = ops
                .into_iter()
                .map(|op| ctx.sum(bound.clone(), op))
                .collect();
            let sum = ctx.add_of(sums);
            pass(ctx, sum, memo)
        }
        // Merge disjoint nested summations. Shadowed variables (same id bound
        // twice) are left nested; the translation layer does not emit them.
        UTerm::Sum {
            bound: inner_bound,
            body: inner_body,
        } => {
            if bound.iter().any(|v| inner_bound.contains(v)) {
                ctx.sum(bound, b)
            } else {
                let mut merged = bound;
                merged.extend(inner_bound);
                let sum = ctx.sum(merged, inner_body);
                pass(ctx, sum, memo)
            }
        }
        _ => ctx.sum(bound, b),
    }
}

fn norm_pred(
    ctx: &mut Context,
    kind: PredKind,
    args: &[TermId],
    memo: &mut FxHashMap<TermId, TermId>,
) -> TermId {
    let mut new: Vec<TermId> = args.iter().map(|&a| pass(ctx, a, memo)).collect();
    if kind.is_symmetric() && new.len() == 2 {
        new.sort_by(|&a, &b| compare_term(ctx, a, b));
    }

    if let PredKind::Func(name) = kind {
        // A literal is never null.
        let is_literal = new.len() == 1
            && matches!(ctx.get(new[0]), UTerm::Const(_) | UTerm::Str(_));
        if is_literal {
            match ctx.sym_name(name) {
                "IsNull" => return ctx.zero(),
                "IsNotNull" => return ctx.one(),
                _ => {}
            }
        }
        return ctx.add(UTerm::Pred {
            kind,
            args: new,
        });
    }

    if new.len() == 2 {
        let (a, b) = (new[0], new[1]);
        // Trivial self-comparison. A NULL argument fails Eq/Le/Ge against
        // itself, so the fold to 1 requires an argument that can never be
        // NULL; the folds to 0 hold for NULL arguments as well.
        if a == b {
            match kind {
                PredKind::Neq | PredKind::Lt | PredKind::Gt => return ctx.zero(),
                PredKind::Eq | PredKind::Le | PredKind::Ge => {
                    if never_null(ctx, a) {
                        return ctx.one();
                    }
                }
                PredKind::Func(_) => unreachable!(),
            }
        }
        // Ground comparisons.
        if let (UTerm::Const(x), UTerm::Const(y)) = (ctx.get(a), ctx.get(b)) {
            let holds = match kind {
                PredKind::Eq => x == y,
                PredKind::Neq => x != y,
                PredKind::Le => x <= y,
                PredKind::Lt => x < y,
                PredKind::Ge => x >= y,
                PredKind::Gt => x > y,
                PredKind::Func(_) => unreachable!(),
            };
            return if holds { ctx.one() } else { ctx.zero() };
        }
        // Distinct string literals are distinct values.
        if let (UTerm::Str(x), UTerm::Str(y)) = (ctx.get(a), ctx.get(b)) {
            let holds = match kind {
                PredKind::Eq => x == y,
                PredKind::Neq => x != y,
                _ => return ctx.add(UTerm::Pred { kind, args: new }),
            };
            return if holds { ctx.one() } else { ctx.zero() };
        }
    }
    ctx.add(UTerm::Pred { kind, args: new })
}

/// Whether a scalar can never evaluate to NULL: literals and tuple
/// identities qualify, attribute projections do not. Schema facts about
/// NOT NULL columns are applied by the preprocessor, which sees the catalog.
fn never_null(ctx: &Context, term: TermId) -> bool {
    match ctx.get(term) {
        UTerm::Const(_) | UTerm::Str(_) => true,
        UTerm::Var(v) => var_never_null(ctx, *v),
        _ => false,
    }
}

fn var_never_null(ctx: &Context, v: VarId) -> bool {
    match ctx.var_node(v) {
        UVar::Base(_) => true,
        UVar::Proj { .. } => false,
        UVar::Concat(a, b) => var_never_null(ctx, *a) && var_never_null(ctx, *b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_and_sorts_products() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let u = ctx.table("u0", x);
        let inner = ctx.mul_of(vec![u, t]);
        let two = ctx.num(2);
        let outer = ctx.mul_of(vec![two, inner]);
        let direct = {
            let n2 = ctx.num(2);
            ctx.mul_of(vec![t, u, n2])
        };
        assert_eq!(normalize(&mut ctx, outer), normalize(&mut ctx, direct));
    }

    #[test]
    fn mul_by_zero_collapses() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let z = ctx.zero();
        let prod = ctx.mul_of(vec![t, z]);
        assert_eq!(normalize(&mut ctx, prod), ctx.zero());
    }

    #[test]
    fn mul_by_one_is_absorbed() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let one = ctx.one();
        let prod = ctx.mul_of(vec![one, t]);
        assert_eq!(normalize(&mut ctx, prod), t);
    }

    #[test]
    fn tuple_self_equality_folds_to_one() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let xv = ctx.scalar(x);
        let p = ctx.eq(xv, xv);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![p, t]);
        assert_eq!(normalize(&mut ctx, prod), t);
    }

    #[test]
    fn nullable_attribute_self_equality_is_kept() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        // A NULL a0 makes this 0, so it must not fold to 1.
        let p = ctx.eq(av, av);
        let normed = normalize(&mut ctx, p);
        assert!(matches!(ctx.get(normed), UTerm::Pred { .. }));
        let q = ctx.pred(PredKind::Neq, vec![av, av]);
        assert_eq!(normalize(&mut ctx, q), ctx.zero());
    }

    #[test]
    fn squash_of_squash_is_squash() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let s1 = ctx.squash(t);
        let s2 = ctx.squash(s1);
        assert_eq!(normalize(&mut ctx, s2), normalize(&mut ctx, s1));
    }

    #[test]
    fn squash_factors_merge() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let t = ctx.table("t0", x);
        let u = ctx.table("t0", y);
        let st = ctx.squash(t);
        let su = ctx.squash(u);
        let prod = ctx.mul_of(vec![st, su]);
        let merged_body = ctx.mul_of(vec![t, u]);
        let merged = ctx.squash(merged_body);
        assert_eq!(normalize(&mut ctx, prod), normalize(&mut ctx, merged));
    }

    #[test]
    fn duplicate_factors_under_squash_dedupe() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![t, t]);
        let sq = ctx.squash(prod);
        let single = ctx.squash(t);
        assert_eq!(normalize(&mut ctx, sq), normalize(&mut ctx, single));
    }

    #[test]
    fn double_negation_is_kept() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let n1 = ctx.negate(t);
        let n2 = ctx.negate(n1);
        let normed = normalize(&mut ctx, n2);
        assert!(matches!(ctx.get(normed), UTerm::Not(_)));
        assert_ne!(normed, t);
    }

    #[test]
    fn negation_of_zero_folds_to_one() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let z = ctx.zero();
        let dead = ctx.mul_of(vec![t, z]);
        let n = ctx.negate(dead);
        assert_eq!(normalize(&mut ctx, n), ctx.one());
    }

    #[test]
    fn distributes_single_sum_operand() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let u = ctx.table("t1", x);
        let w = ctx.table("t2", x);
        let add = ctx.add_of(vec![u, w]);
        let prod = ctx.mul_of(vec![t, add]);
        let left = ctx.mul_of(vec![t, u]);
        let right = ctx.mul_of(vec![t, w]);
        let expect = ctx.add_of(vec![left, right]);
        assert_eq!(normalize(&mut ctx, prod), normalize(&mut ctx, expect));
    }

    #[test]
    fn summation_splits_over_sums() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let u = ctx.table("t1", x);
        let add = ctx.add_of(vec![t, u]);
        let s = ctx.sum(vec![x], add);
        let st = ctx.sum(vec![x], t);
        let su = ctx.sum(vec![x], u);
        let expect = ctx.add_of(vec![st, su]);
        assert_eq!(normalize(&mut ctx, s), normalize(&mut ctx, expect));
    }

    #[test]
    fn nested_disjoint_summations_merge() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t0", y);
        let body = ctx.mul_of(vec![tx, ty]);
        let inner = ctx.sum(vec![y], body);
        let outer = ctx.sum(vec![x], inner);
        let merged = ctx.sum(vec![x, y], body);
        assert_eq!(normalize(&mut ctx, outer), normalize(&mut ctx, merged));
    }

    #[test]
    fn summation_of_zero_vanishes() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let z = ctx.zero();
        let s = ctx.sum(vec![x], z);
        assert_eq!(normalize(&mut ctx, s), ctx.zero());
    }

    #[test]
    fn is_null_of_literal_folds() {
        let mut ctx = Context::new();
        let c = ctx.num(5);
        let p = ctx.named_pred("IsNull", vec![c]);
        assert_eq!(normalize(&mut ctx, p), ctx.zero());
        let q = ctx.named_pred("IsNotNull", vec![c]);
        assert_eq!(normalize(&mut ctx, q), ctx.one());
    }
}
