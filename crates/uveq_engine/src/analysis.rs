//! Shape-independent views over normalized terms.
//!
//! Rules and the matcher operate on flat factor lists instead of matching the
//! `Mul` spine, and on the flat list of top-level summations instead of the
//! `Add`-of-products spine.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uveq_ast::{Context, Symbol, TermId, UTerm, VarId};

/// Flattened factor list of a product; a non-`Mul` term is its own single
/// factor.
pub fn product_factors(ctx: &Context, term: TermId) -> SmallVec<[TermId; 8]> {
    match ctx.get(term) {
        UTerm::Mul(ops) => ops.iter().copied().collect(),
        _ => {
            let mut v = SmallVec::new();
            v.push(term);
            v
        }
    }
}

/// Flattened addend list of a sum; a non-`Add` term is its own single addend.
pub fn sum_addends(ctx: &Context, term: TermId) -> SmallVec<[TermId; 4]> {
    match ctx.get(term) {
        UTerm::Add(ops) => ops.iter().copied().collect(),
        _ => {
            let mut v = SmallVec::new();
            v.push(term);
            v
        }
    }
}

/// Source table of each base variable, read off the `Table` atoms of a term.
/// A variable scanned against two different relations keeps the first one
/// (the translation layer never produces that shape).
pub fn var_tables(ctx: &Context, term: TermId) -> FxHashMap<VarId, Symbol> {
    let mut out = FxHashMap::default();
    collect_var_tables(ctx, term, &mut out);
    out
}

fn collect_var_tables(ctx: &Context, term: TermId, out: &mut FxHashMap<VarId, Symbol>) {
    match ctx.get(term) {
        UTerm::Table { name, var } => {
            out.entry(ctx.base_of(*var)).or_insert(*name);
        }
        UTerm::Add(ops) | UTerm::Mul(ops) => {
            for op in ops {
                collect_var_tables(ctx, *op, out);
            }
        }
        UTerm::Pred { args, .. } | UTerm::Func { args, .. } => {
            for arg in args {
                collect_var_tables(ctx, *arg, out);
            }
        }
        UTerm::Squash(body) | UTerm::Not(body) | UTerm::Sum { body, .. } => {
            collect_var_tables(ctx, *body, out);
        }
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) => {}
    }
}

/// Top-level summations of a normalized side: `Sum` factors of each addend
/// product, plus the side itself when it is a bare `Sum`.
pub fn collect_top_summations(ctx: &Context, term: TermId) -> Vec<TermId> {
    let mut out = Vec::new();
    for addend in sum_addends(ctx, term) {
        for factor in product_factors(ctx, addend) {
            if matches!(ctx.get(factor), UTerm::Sum { .. }) {
                out.push(factor);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_of_non_product_is_singleton() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        assert_eq!(product_factors(&ctx, t).as_slice(), &[t]);
    }

    #[test]
    fn var_tables_reads_table_atoms() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t1", y);
        let prod = ctx.mul_of(vec![tx, ty]);
        let map = var_tables(&ctx, prod);
        assert_eq!(ctx.sym_name(map[&x]), "t0");
        assert_eq!(ctx.sym_name(map[&y]), "t1");
    }

    #[test]
    fn top_summations_found_inside_products() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let s = ctx.sum(vec![x], t);
        let two = ctx.num(2);
        let prod = ctx.mul_of(vec![two, s]);
        assert_eq!(collect_top_summations(&ctx, prod), vec![s]);
    }
}
