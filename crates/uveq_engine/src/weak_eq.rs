//! Weak structural equality: the orchestrator's fast path.
//!
//! Identical modulo one relaxation: `Mul` operand lists compare as
//! multisets. After normalization operand lists are canonically sorted, so
//! this mostly degenerates to id equality; the multiset fallback covers
//! operands whose structural order is unstable under the relaxation itself
//! (nested products that became equal only modulo reordering).

use uveq_ast::{Context, TermId, UTerm};

/// Structural equality modulo commutative-multiplication reordering.
pub fn weak_eq(ctx: &Context, a: TermId, b: TermId) -> bool {
    if a == b {
        return true;
    }
    match (ctx.get(a), ctx.get(b)) {
        (UTerm::Mul(x), UTerm::Mul(y)) => multiset_eq(ctx, x, y),
        (UTerm::Add(x), UTerm::Add(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(&p, &q)| weak_eq(ctx, p, q))
        }
        (
            UTerm::Sum { bound: b1, body: t1 },
            UTerm::Sum { bound: b2, body: t2 },
        ) => b1 == b2 && weak_eq(ctx, *t1, *t2),
        (UTerm::Squash(x), UTerm::Squash(y)) => weak_eq(ctx, *x, *y),
        (UTerm::Not(x), UTerm::Not(y)) => weak_eq(ctx, *x, *y),
        (
            UTerm::Pred { kind: k1, args: a1 },
            UTerm::Pred { kind: k2, args: a2 },
        ) => {
            k1 == k2
                && a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(&p, &q)| weak_eq(ctx, p, q))
        }
        (
            UTerm::Func { name: n1, args: a1 },
            UTerm::Func { name: n2, args: a2 },
        ) => {
            n1 == n2
                && a1.len() == a2.len()
                && a1.iter().zip(a2.iter()).all(|(&p, &q)| weak_eq(ctx, p, q))
        }
        // Leaves intern to unique ids; unequal ids are unequal leaves.
        _ => false,
    }
}

fn multiset_eq(ctx: &Context, xs: &[TermId], ys: &[TermId]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let mut used = vec![false; ys.len()];
    'outer: for &x in xs {
        for (i, &y) in ys.iter().enumerate() {
            if !used[i] && weak_eq(ctx, x, y) {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_order_is_relaxed() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let u = ctx.table("t1", x);
        let ab = ctx.add(UTerm::Mul(vec![t, u]));
        let ba = ctx.add(UTerm::Mul(vec![u, t]));
        assert_ne!(ab, ba);
        assert!(weak_eq(&ctx, ab, ba));
    }

    #[test]
    fn addition_order_is_not_relaxed() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let u = ctx.table("t1", x);
        let ab = ctx.add(UTerm::Add(vec![t, u]));
        let ba = ctx.add(UTerm::Add(vec![u, t]));
        assert!(!weak_eq(&ctx, ab, ba));
    }
}
