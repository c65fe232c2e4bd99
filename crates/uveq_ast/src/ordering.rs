use crate::context::{Context, TermId, VarId};
use crate::term::{PredKind, UTerm};
use crate::var::UVar;
use std::cmp::Ordering;

/// Total structural order over terms, used to sort commutative operand lists
/// into canonical form. Stable across contexts: symbols compare by name, not
/// by interning order.
pub fn compare_term(ctx: &Context, a: TermId, b: TermId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let ta = ctx.get(a);
    let tb = ctx.get(b);

    let rank_a = rank(ta);
    let rank_b = rank(tb);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    use UTerm::*;
    match (ta, tb) {
        (Const(x), Const(y)) => x.cmp(y),
        (Str(x), Str(y)) => ctx.sym_name(*x).cmp(ctx.sym_name(*y)),
        (Var(x), Var(y)) => compare_var(ctx, *x, *y),
        (Table { name: n1, var: v1 }, Table { name: n2, var: v2 }) => ctx
            .sym_name(*n1)
            .cmp(ctx.sym_name(*n2))
            .then_with(|| compare_var(ctx, *v1, *v2)),
        (Pred { kind: k1, args: a1 }, Pred { kind: k2, args: a2 }) => {
            compare_pred_kind(ctx, *k1, *k2).then_with(|| compare_args(ctx, a1, a2))
        }
        (Func { name: n1, args: a1 }, Func { name: n2, args: a2 }) => ctx
            .sym_name(*n1)
            .cmp(ctx.sym_name(*n2))
            .then_with(|| compare_args(ctx, a1, a2)),
        (Not(x), Not(y)) => compare_term(ctx, *x, *y),
        (Squash(x), Squash(y)) => compare_term(ctx, *x, *y),
        (Mul(a1), Mul(a2)) | (Add(a1), Add(a2)) => compare_args(ctx, a1, a2),
        (Sum { bound: b1, body: t1 }, Sum { bound: b2, body: t2 }) => {
            compare_var_list(ctx, b1, b2).then_with(|| compare_term(ctx, *t1, *t2))
        }
        _ => unreachable!("equal ranks imply equal variants"),
    }
}

/// Total order over tuple variables (base < proj < concat, then by name).
pub fn compare_var(ctx: &Context, a: VarId, b: VarId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let va = ctx.var_node(a);
    let vb = ctx.var_node(b);
    let ra = var_rank(va);
    let rb = var_rank(vb);
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (va, vb) {
        (UVar::Base(s1), UVar::Base(s2)) => ctx.sym_name(*s1).cmp(ctx.sym_name(*s2)),
        (UVar::Proj { attr: a1, of: o1 }, UVar::Proj { attr: a2, of: o2 }) => ctx
            .sym_name(*a1)
            .cmp(ctx.sym_name(*a2))
            .then_with(|| compare_var(ctx, *o1, *o2)),
        (UVar::Concat(l1, r1), UVar::Concat(l2, r2)) => {
            compare_var(ctx, *l1, *l2).then_with(|| compare_var(ctx, *r1, *r2))
        }
        _ => unreachable!("equal ranks imply equal variants"),
    }
}

fn compare_args(ctx: &Context, a: &[TermId], b: &[TermId]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_term(ctx, *x, *y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

fn compare_var_list(ctx: &Context, a: &[VarId], b: &[VarId]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_var(ctx, *x, *y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

fn compare_pred_kind(ctx: &Context, a: PredKind, b: PredKind) -> Ordering {
    fn key(k: PredKind) -> u8 {
        match k {
            PredKind::Eq => 0,
            PredKind::Neq => 1,
            PredKind::Le => 2,
            PredKind::Lt => 3,
            PredKind::Ge => 4,
            PredKind::Gt => 5,
            PredKind::Func(_) => 6,
        }
    }
    key(a).cmp(&key(b)).then_with(|| match (a, b) {
        (PredKind::Func(s1), PredKind::Func(s2)) => ctx.sym_name(s1).cmp(ctx.sym_name(s2)),
        _ => Ordering::Equal,
    })
}

fn rank(term: &UTerm) -> u8 {
    use UTerm::*;
    match term {
        Const(_) => 0,
        Str(_) => 1,
        Var(_) => 2,
        Table { .. } => 3,
        Pred { .. } => 4,
        Func { .. } => 5,
        Not(_) => 6,
        Squash(_) => 7,
        Mul(_) => 8,
        Add(_) => 9,
        Sum { .. } => 10,
    }
}

fn var_rank(var: &UVar) -> u8 {
    match var {
        UVar::Base(_) => 0,
        UVar::Proj { .. } => 1,
        UVar::Concat(_, _) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_before_tables_before_sums() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let c = ctx.num(2);
        let t = ctx.table("t0", x);
        let s = ctx.sum(vec![x], t);
        assert_eq!(compare_term(&ctx, c, t), Ordering::Less);
        assert_eq!(compare_term(&ctx, t, s), Ordering::Less);
        assert_eq!(compare_term(&ctx, s, s), Ordering::Equal);
    }

    #[test]
    fn order_is_by_name_not_interning_order() {
        let mut ctx = Context::new();
        let y = ctx.base("x1");
        let x = ctx.base("x0");
        // x1 interned first, but x0 sorts first by name.
        assert_eq!(compare_var(&ctx, x, y), Ordering::Less);
    }

    #[test]
    fn order_is_antisymmetric() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.table("t0", x);
        let b = ctx.table("t1", x);
        assert_eq!(
            compare_term(&ctx, a, b),
            compare_term(&ctx, b, a).reverse()
        );
    }
}
