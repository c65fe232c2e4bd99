//! Null-value propagation.
//!
//! Each product is scanned for `IsNull` / `IsNotNull` facts. Facts extend to
//! equivalence classes of values (transitively through the product's equality
//! predicates); a class declared both null and not-null makes the product
//! unsatisfiable. With a catalog, facts on NOT NULL columns resolve
//! immediately (`IsNull` on them is 0).

use rustc_hash::FxHashMap;
use uveq_ast::{Catalog, Context, PredKind, TermId, UTerm, UVar, VarId};

use crate::analysis::{product_factors, var_tables};

/// Apply null propagation everywhere in the term.
pub fn propagate_nulls(ctx: &mut Context, term: TermId, catalog: Option<&Catalog>) -> TermId {
    let node = ctx.get(term).clone();
    match node {
        UTerm::Const(_) | UTerm::Str(_) | UTerm::Var(_) | UTerm::Table { .. }
        | UTerm::Pred { .. } | UTerm::Func { .. } => term,
        UTerm::Add(ops) => {
            let new: Vec<TermId> = ops
                .iter()
                .map(|&op| propagate_nulls(ctx, op, catalog))
                .collect();
            if new != ops {
                ctx.add(UTerm::Add(new))
            } else {
                term
            }
        }
        UTerm::Mul(_) => propagate_in_product(ctx, term, catalog),
        UTerm::Squash(body) => {
            let nb = propagate_nulls(ctx, body, catalog);
            if nb != body {
                ctx.squash(nb)
            } else {
                term
            }
        }
        UTerm::Not(body) => {
            let nb = propagate_nulls(ctx, body, catalog);
            if nb != body {
                ctx.negate(nb)
            } else {
                term
            }
        }
        UTerm::Sum { bound, body } => {
            let nb = propagate_nulls(ctx, body, catalog);
            if nb != body {
                ctx.add(UTerm::Sum { bound, body: nb })
            } else {
                term
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fact {
    Null,
    NotNull,
}

fn propagate_in_product(ctx: &mut Context, product: TermId, catalog: Option<&Catalog>) -> TermId {
    let factors = product_factors(ctx, product);
    let tables = var_tables(ctx, product);

    // Schema-driven resolution first: IsNull on a NOT NULL column is 0.
    let mut new_factors: Vec<TermId> = Vec::with_capacity(factors.len());
    let mut changed = false;
    for &factor in &factors {
        let rewritten = resolve_with_schema(ctx, factor, catalog, &tables);
        changed |= rewritten != factor;
        new_factors.push(rewritten);
    }

    // Fact collection over equivalence classes.
    let mut uf = UnionFind::default();
    for &factor in &new_factors {
        if let Some((a, b)) = as_var_equality(ctx, factor) {
            uf.union(a, b);
        }
    }
    let mut facts: FxHashMap<VarId, Fact> = FxHashMap::default();
    for &factor in &new_factors {
        let fact = match extract_null_fact(ctx, factor) {
            Some(f) => f,
            None => continue,
        };
        let root = uf.find(fact.0);
        match facts.get(&root) {
            Some(&prev) if prev != fact.1 => return ctx.zero(),
            _ => {
                facts.insert(root, fact.1);
            }
        }
    }

    // Recurse into non-atomic factors.
    let mut out: Vec<TermId> = Vec::with_capacity(new_factors.len());
    for &factor in &new_factors {
        let nf = match ctx.get(factor) {
            UTerm::Pred { .. } | UTerm::Table { .. } | UTerm::Const(_) | UTerm::Str(_)
            | UTerm::Var(_) => factor,
            _ => propagate_nulls(ctx, factor, catalog),
        };
        changed |= nf != factor;
        out.push(nf);
    }
    if changed {
        ctx.mul_of(out)
    } else {
        product
    }
}

/// `IsNull(a0(x))` where the catalog proves `a0` NOT NULL folds to 0; the
/// symmetric `IsNotNull` folds to 1, and a self-comparison of such a column
/// holds on every row. Negated facts rewrite through `Not`.
fn resolve_with_schema(
    ctx: &mut Context,
    factor: TermId,
    catalog: Option<&Catalog>,
    tables: &FxHashMap<VarId, uveq_ast::Symbol>,
) -> TermId {
    let cat = match catalog {
        Some(c) => c,
        None => return factor,
    };
    if let UTerm::Not(inner) = ctx.get(factor) {
        let inner = *inner;
        let resolved = resolve_with_schema(ctx, inner, catalog, tables);
        if resolved != inner {
            return ctx.negate(resolved);
        }
        return factor;
    }
    // `[a(x) = a(x)]` survives the normalizer when `a` may be NULL; a NOT
    // NULL declaration discharges it here.
    if let UTerm::Pred { kind, args } = ctx.get(factor).clone() {
        if matches!(kind, PredKind::Eq | PredKind::Le | PredKind::Ge)
            && args.len() == 2
            && args[0] == args[1]
        {
            if let UTerm::Var(v) = ctx.get(args[0]) {
                let v = *v;
                if let UVar::Proj { attr, of } = ctx.var_node(v).clone() {
                    let base = ctx.base_of(of);
                    if let Some(&table) = tables.get(&base) {
                        let table_name = ctx.sym_name(table).to_string();
                        let attr_name = ctx.sym_name(attr).to_string();
                        if !cat.is_nullable(&table_name, &attr_name) {
                            return ctx.one();
                        }
                    }
                }
            }
        }
    }
    // Negated atoms were peeled above; only positive atoms reach here.
    let (var, fact) = match extract_null_fact(ctx, factor) {
        Some((v, f)) => (v, f),
        None => return factor,
    };
    if let UVar::Proj { attr, of } = ctx.var_node(var).clone() {
        let base = ctx.base_of(of);
        if let Some(&table) = tables.get(&base) {
            let table_name = ctx.sym_name(table).to_string();
            let attr_name = ctx.sym_name(attr).to_string();
            if !cat.is_nullable(&table_name, &attr_name) {
                return match fact {
                    Fact::Null => ctx.zero(),
                    Fact::NotNull => ctx.one(),
                };
            }
        }
    }
    factor
}

/// A factor asserting nullness of a value: `IsNull(v)`, `IsNotNull(v)`, or
/// either wrapped in `Not`.
fn extract_null_fact(ctx: &Context, factor: TermId) -> Option<(VarId, Fact)> {
    match ctx.get(factor) {
        UTerm::Not(inner) => {
            let (v, f) = extract_null_fact(ctx, *inner)?;
            let flipped = match f {
                Fact::Null => Fact::NotNull,
                Fact::NotNull => Fact::Null,
            };
            Some((v, flipped))
        }
        UTerm::Pred {
            kind: uveq_ast::PredKind::Func(name),
            args,
        } if args.len() == 1 => {
            let fact = match ctx.sym_name(*name) {
                "IsNull" => Fact::Null,
                "IsNotNull" => Fact::NotNull,
                _ => return None,
            };
            match ctx.get(args[0]) {
                UTerm::Var(v) => Some((*v, fact)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `[Var(a) = Var(b)]`.
fn as_var_equality(ctx: &Context, factor: TermId) -> Option<(VarId, VarId)> {
    if let UTerm::Pred {
        kind: uveq_ast::PredKind::Eq,
        args,
    } = ctx.get(factor)
    {
        if args.len() == 2 {
            if let (UTerm::Var(a), UTerm::Var(b)) = (ctx.get(args[0]), ctx.get(args[1])) {
                return Some((*a, *b));
            }
        }
    }
    None
}

#[derive(Default)]
struct UnionFind {
    parent: FxHashMap<VarId, VarId>,
}

impl UnionFind {
    fn find(&mut self, v: VarId) -> VarId {
        let p = *self.parent.get(&v).unwrap_or(&v);
        if p == v {
            return v;
        }
        let root = self.find(p);
        self.parent.insert(v, root);
        root
    }

    fn union(&mut self, a: VarId, b: VarId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn direct_contradiction_collapses() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let isnull = ctx.named_pred("IsNull", vec![av]);
        let notnull = ctx.named_pred("IsNotNull", vec![av]);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![isnull, notnull, t]);
        assert_eq!(propagate_nulls(&mut ctx, prod, None), ctx.zero());
    }

    #[test]
    fn contradiction_through_equality_class() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let a = ctx.proj("a0", x);
        let b = ctx.proj("a0", y);
        let av = ctx.scalar(a);
        let bv = ctx.scalar(b);
        let link = ctx.eq(av, bv);
        let isnull = ctx.named_pred("IsNull", vec![av]);
        let notnull = ctx.named_pred("IsNotNull", vec![bv]);
        let prod = ctx.mul_of(vec![link, isnull, notnull]);
        assert_eq!(propagate_nulls(&mut ctx, prod, None), ctx.zero());
    }

    #[test]
    fn negated_fact_counts() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let isnull = ctx.named_pred("IsNull", vec![av]);
        let not_isnull = ctx.negate(isnull);
        let prod = ctx.mul_of(vec![isnull, not_isnull]);
        assert_eq!(propagate_nulls(&mut ctx, prod, None), ctx.zero());
    }

    #[test]
    fn consistent_facts_are_kept() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let isnull = ctx.named_pred("IsNull", vec![av]);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![isnull, t]);
        let out = propagate_nulls(&mut ctx, prod, None);
        assert_eq!(normalize(&mut ctx, out), normalize(&mut ctx, prod));
    }

    #[test]
    fn not_null_column_resolves_against_catalog() {
        use uveq_ast::{Column, ColumnType, Schema, TableSchema};
        let mut ctx = Context::new();
        let mut schema = Schema::new();
        schema.insert(TableSchema {
            name: "t0".into(),
            columns: vec![Column {
                name: "k0".into(),
                ty: ColumnType::Int,
                nullable: false,
            }],
        });
        let cat = Catalog::new(schema);

        let x = ctx.base("x0");
        let k = ctx.proj("k0", x);
        let kv = ctx.scalar(k);
        let isnull = ctx.named_pred("IsNull", vec![kv]);
        let not_isnull = ctx.negate(isnull);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![not_isnull, t]);
        let out = propagate_nulls(&mut ctx, prod, Some(&cat));
        assert_eq!(normalize(&mut ctx, out), t);
    }

    #[test]
    fn not_null_self_equality_resolves_against_catalog() {
        use uveq_ast::{Column, ColumnType, Schema, TableSchema};
        let mut ctx = Context::new();
        let mut schema = Schema::new();
        schema.insert(TableSchema {
            name: "t0".into(),
            columns: vec![Column {
                name: "k0".into(),
                ty: ColumnType::Int,
                nullable: false,
            }],
        });
        let cat = Catalog::new(schema);

        let x = ctx.base("x0");
        let k = ctx.proj("k0", x);
        let kv = ctx.scalar(k);
        let p = ctx.eq(kv, kv);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![p, t]);
        let out = propagate_nulls(&mut ctx, prod, Some(&cat));
        assert_eq!(normalize(&mut ctx, out), t);

        // Without the declaration the comparison must survive.
        let kept = propagate_nulls(&mut ctx, prod, None);
        assert_eq!(kept, prod);
    }
}
