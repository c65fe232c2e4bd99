//! U-expression to LIA★ compilation.
//!
//! Outside summations every node maps directly: arithmetic stays arithmetic,
//! squash and complement become `ite(body = 0, …)`, relation scans and
//! uninterpreted predicates become memoized integer variables (one per
//! distinct interned atom, so identical atoms on the two sides share a
//! variable and cancel), binary comparisons become `ite(cmp, 1, 0)`.
//!
//! A summation that survives preprocessing becomes a placeholder variable
//! constrained by a star construct; before giving up on a summation the
//! preprocessor is re-run on it locally, so a summation whose bound variables
//! are all forced by equalities is expanded away instead of starred.
//! Structurally identical summations share one placeholder.
//!
//! Two obligations are encoded explicitly rather than left to the theory:
//! proven-equal tuples agree on every attribute value, null flag and relation
//! multiplicity either side compiled, and distinct string literals are
//! pairwise distinct integers.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;
use uveq_ast::traversal::free_vars;
use uveq_ast::{Catalog, Context, PredKind, Symbol, TermId, UTerm, UVar, VarId};
use uveq_engine::preprocess;

use crate::formula::{CmpOp, LFormula, LTerm};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no compilation rule for {0}")]
    Unsupported(String),
}

/// One compilation session. Owns the name generator and every memo table, so
/// both sides of an equivalence check must go through the same instance.
pub struct Compiler<'c> {
    ctx: &'c mut Context,
    catalog: Option<&'c Catalog>,
    next: usize,
    /// Interned atom (relation scan or opaque predicate) to its variable.
    atom_vars: FxHashMap<TermId, String>,
    /// Free scalar (attribute projection) to its variable.
    scalar_vars: FxHashMap<VarId, String>,
    /// Free tuple variable to its identity variable.
    tuple_vars: FxHashMap<VarId, String>,
    /// Scalar to its 0/1 null-flag variable.
    null_vars: FxHashMap<VarId, String>,
    /// Summation to its placeholder variable.
    sum_vars: FxHashMap<TermId, String>,
    strings: FxHashMap<Symbol, String>,
    constraints: Vec<LFormula>,
    star_constraints: Vec<LFormula>,
    /// Tuple equalities compiled so far, for the null-congruence pass.
    tuple_eqs: Vec<(VarId, VarId)>,
    /// Bound variable to inner star variable, innermost scope last.
    scopes: Vec<FxHashMap<VarId, String>>,
    scoped: Vec<Vec<LFormula>>,
}

/// Compile `left != right` into one closed formula; an unsatisfiable result
/// proves the two terms equal on every instance.
pub fn compile_neq(
    ctx: &mut Context,
    left: TermId,
    right: TermId,
    catalog: Option<&Catalog>,
) -> Result<LFormula, CompileError> {
    let mut compiler = Compiler::new(ctx, catalog);
    let l = compiler.term(left)?;
    let r = compiler.term(right)?;
    Ok(compiler.finish(LFormula::ne(l, r)))
}

impl<'c> Compiler<'c> {
    pub fn new(ctx: &'c mut Context, catalog: Option<&'c Catalog>) -> Self {
        Compiler {
            ctx,
            catalog,
            next: 0,
            atom_vars: FxHashMap::default(),
            scalar_vars: FxHashMap::default(),
            tuple_vars: FxHashMap::default(),
            null_vars: FxHashMap::default(),
            sum_vars: FxHashMap::default(),
            strings: FxHashMap::default(),
            constraints: Vec::new(),
            star_constraints: Vec::new(),
            tuple_eqs: Vec::new(),
            scopes: Vec::new(),
            scoped: Vec::new(),
        }
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.next);
        self.next += 1;
        name
    }

    fn push_constraint(&mut self, f: LFormula) {
        match self.scoped.last_mut() {
            Some(frame) => frame.push(f),
            None => self.constraints.push(f),
        }
    }

    fn scope_name(&self, base: VarId) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(&base).cloned())
    }

    pub fn term(&mut self, term: TermId) -> Result<LTerm, CompileError> {
        let node = self.ctx.get(term).clone();
        match node {
            UTerm::Const(c) => Ok(LTerm::Const(c)),
            UTerm::Str(s) => Ok(LTerm::Var(self.string_var(s))),
            UTerm::Var(v) => self.scalar(v),
            UTerm::Add(ops) => {
                let parts = ops
                    .iter()
                    .map(|&op| self.term(op))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LTerm::Add(parts))
            }
            UTerm::Mul(ops) => {
                let parts = ops
                    .iter()
                    .map(|&op| self.term(op))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LTerm::Mul(parts))
            }
            UTerm::Squash(body) => {
                let b = self.term(body)?;
                Ok(LTerm::ite(
                    LFormula::eq(b, LTerm::Const(0)),
                    LTerm::Const(0),
                    LTerm::Const(1),
                ))
            }
            UTerm::Not(body) => {
                let b = self.term(body)?;
                Ok(LTerm::ite(
                    LFormula::eq(b, LTerm::Const(0)),
                    LTerm::Const(1),
                    LTerm::Const(0),
                ))
            }
            UTerm::Pred { kind, args } => self.pred(term, &kind, &args),
            UTerm::Table { name, var } => self.table(term, name, var),
            UTerm::Func { name, args } => {
                let parts = args
                    .iter()
                    .map(|&a| self.term(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LTerm::App(self.ctx.sym_name(name).to_string(), parts))
            }
            UTerm::Sum { .. } => self.summation(term),
        }
    }

    fn string_var(&mut self, s: Symbol) -> String {
        if let Some(name) = self.strings.get(&s) {
            return name.clone();
        }
        let name = self.fresh("s");
        self.strings.insert(s, name.clone());
        name
    }

    /// A scalar position: attribute projection, bare tuple identity, or a
    /// composite-key pairing.
    fn scalar(&mut self, v: VarId) -> Result<LTerm, CompileError> {
        match self.ctx.var_node(v).clone() {
            UVar::Base(_) => Ok(self.tuple(v)),
            UVar::Proj { attr, of } => {
                let base = self.ctx.base_of(of);
                if let Some(inner) = self.scope_name(base) {
                    let attr_name = self.ctx.sym_name(attr).to_string();
                    return Ok(LTerm::App(attr_name, vec![LTerm::Var(inner)]));
                }
                if let Some(name) = self.scalar_vars.get(&v) {
                    return Ok(LTerm::Var(name.clone()));
                }
                let name = self.fresh("p");
                self.scalar_vars.insert(v, name.clone());
                Ok(LTerm::Var(name))
            }
            UVar::Concat(a, b) => {
                let ta = self.scalar(a)?;
                let tb = self.scalar(b)?;
                Ok(LTerm::App("pair".to_string(), vec![ta, tb]))
            }
        }
    }

    /// Identity variable of a base tuple.
    fn tuple(&mut self, base: VarId) -> LTerm {
        if let Some(inner) = self.scope_name(base) {
            return LTerm::Var(inner);
        }
        if let Some(name) = self.tuple_vars.get(&base) {
            return LTerm::Var(name.clone());
        }
        let name = self.fresh("u");
        self.tuple_vars.insert(base, name.clone());
        LTerm::Var(name)
    }

    fn table(&mut self, term: TermId, name: Symbol, var: VarId) -> Result<LTerm, CompileError> {
        let base = self.ctx.base_of(var);
        if let Some(inner) = self.scope_name(base) {
            let app = LTerm::App(
                self.ctx.sym_name(name).to_string(),
                vec![LTerm::Var(inner)],
            );
            self.push_constraint(LFormula::cmp(CmpOp::Ge, app.clone(), LTerm::Const(0)));
            return Ok(app);
        }
        if let Some(v) = self.atom_vars.get(&term) {
            return Ok(LTerm::Var(v.clone()));
        }
        // Unbounded multiset membership count.
        let v = self.fresh("m");
        self.atom_vars.insert(term, v.clone());
        self.constraints
            .push(LFormula::cmp(CmpOp::Ge, LTerm::var(&v), LTerm::Const(0)));
        Ok(LTerm::Var(v))
    }

    fn pred(
        &mut self,
        term: TermId,
        kind: &PredKind,
        args: &[TermId],
    ) -> Result<LTerm, CompileError> {
        if let PredKind::Func(name) = kind {
            return self.named_pred(term, *name, args);
        }
        if args.len() != 2 {
            return Err(CompileError::Unsupported(format!(
                "{}-ary comparison",
                args.len()
            )));
        }
        // Tuple-level comparison uses identity variables and records the
        // equality for the congruence pass.
        let tuple_pair = match (self.ctx.get(args[0]), self.ctx.get(args[1])) {
            (UTerm::Var(x), UTerm::Var(y)) => Some((*x, *y)),
            _ => None,
        };
        if let Some((x, y)) = tuple_pair {
            if self.is_tuple(x) && self.is_tuple(y) {
                return self.tuple_cmp(kind, x, y);
            }
        }
        let a = self.term(args[0])?;
        let b = self.term(args[1])?;
        let op = cmp_op(kind);
        Ok(bool_to_int(LFormula::cmp(op, a, b)))
    }

    fn is_tuple(&self, v: VarId) -> bool {
        matches!(self.ctx.var_node(v), UVar::Base(_) | UVar::Concat(..))
    }

    fn tuple_cmp(&mut self, kind: &PredKind, x: VarId, y: VarId) -> Result<LTerm, CompileError> {
        let op = match kind {
            PredKind::Eq => CmpOp::Eq,
            PredKind::Neq => CmpOp::Ne,
            other => {
                return Err(CompileError::Unsupported(format!(
                    "ordered comparison {:?} of tuples",
                    other
                )))
            }
        };
        let tx = self.scalar(x)?;
        let ty = self.scalar(y)?;
        if *kind == PredKind::Eq
            && matches!(self.ctx.var_node(x), UVar::Base(_))
            && matches!(self.ctx.var_node(y), UVar::Base(_))
            && self.scopes.is_empty()
        {
            self.tuple_eqs.push((x, y));
        }
        Ok(bool_to_int(LFormula::cmp(op, tx, ty)))
    }

    fn named_pred(
        &mut self,
        term: TermId,
        name: Symbol,
        args: &[TermId],
    ) -> Result<LTerm, CompileError> {
        let pred_name = self.ctx.sym_name(name).to_string();
        if args.len() == 1 && (pred_name == "IsNull" || pred_name == "IsNotNull") {
            let positive = pred_name == "IsNull";
            let arg = self.ctx.get(args[0]).clone();
            return match arg {
                // Literals are never null.
                UTerm::Const(_) | UTerm::Str(_) => {
                    Ok(LTerm::Const(if positive { 0 } else { 1 }))
                }
                UTerm::Var(v) => {
                    let flag = self.null_flag(v)?;
                    if positive {
                        Ok(flag)
                    } else {
                        Ok(LTerm::ite(
                            LFormula::eq(flag, LTerm::Const(0)),
                            LTerm::Const(1),
                            LTerm::Const(0),
                        ))
                    }
                }
                other => Err(CompileError::Unsupported(format!(
                    "null test over {}",
                    other.kind_name()
                ))),
            };
        }
        // Opaque predicate: under a star scope it must stay a function of the
        // inner variables; otherwise one memoized 0/1 variable per atom.
        if self.in_scope(term) {
            let parts = args
                .iter()
                .map(|&a| self.term(a))
                .collect::<Result<Vec<_>, _>>()?;
            let app = LTerm::App(pred_name, parts);
            self.push_constraint(LFormula::cmp(CmpOp::Ge, app.clone(), LTerm::Const(0)));
            self.push_constraint(LFormula::cmp(CmpOp::Le, app.clone(), LTerm::Const(1)));
            return Ok(app);
        }
        if let Some(v) = self.atom_vars.get(&term) {
            return Ok(LTerm::Var(v.clone()));
        }
        let v = self.fresh("b");
        self.atom_vars.insert(term, v.clone());
        self.constraints
            .push(LFormula::cmp(CmpOp::Ge, LTerm::var(&v), LTerm::Const(0)));
        self.constraints
            .push(LFormula::cmp(CmpOp::Le, LTerm::var(&v), LTerm::Const(1)));
        Ok(LTerm::Var(v))
    }

    fn null_flag(&mut self, v: VarId) -> Result<LTerm, CompileError> {
        let base = match self.ctx.var_node(v) {
            UVar::Base(_) => v,
            UVar::Proj { of, .. } => self.ctx.base_of(*of),
            UVar::Concat(..) => {
                return Err(CompileError::Unsupported(
                    "null test over a composite key".to_string(),
                ))
            }
        };
        if self.scope_name(base).is_some() {
            let scalar = self.scalar(v)?;
            let app = LTerm::App("isnull".to_string(), vec![scalar]);
            self.push_constraint(LFormula::cmp(CmpOp::Ge, app.clone(), LTerm::Const(0)));
            self.push_constraint(LFormula::cmp(CmpOp::Le, app.clone(), LTerm::Const(1)));
            return Ok(app);
        }
        if let Some(name) = self.null_vars.get(&v) {
            return Ok(LTerm::Var(name.clone()));
        }
        let name = self.fresh("n");
        self.null_vars.insert(v, name.clone());
        self.constraints
            .push(LFormula::cmp(CmpOp::Ge, LTerm::var(&name), LTerm::Const(0)));
        self.constraints
            .push(LFormula::cmp(CmpOp::Le, LTerm::var(&name), LTerm::Const(1)));
        Ok(LTerm::Var(name))
    }

    /// Whether any free variable of the term is bound by an enclosing star.
    fn in_scope(&self, term: TermId) -> bool {
        if self.scopes.is_empty() {
            return false;
        }
        free_vars(self.ctx, term)
            .iter()
            .any(|v| self.scope_name(*v).is_some())
    }

    fn summation(&mut self, term: TermId) -> Result<LTerm, CompileError> {
        if let Some(name) = self.sum_vars.get(&term) {
            return Ok(LTerm::Var(name.clone()));
        }

        // Predicate-driven instantiation: re-running the preprocessor here
        // can concretize away bound variables that equalities pin down, which
        // is always preferable to leaving a star for the solver.
        let reduced = preprocess(self.ctx, term, self.catalog);
        if reduced != term {
            if !matches!(self.ctx.get(reduced), UTerm::Sum { .. }) {
                debug!(term = %self.ctx.display(term), "summation fully instantiated");
                return self.term(reduced);
            }
            let out = self.term(reduced)?;
            if let LTerm::Var(name) = &out {
                self.sum_vars.insert(term, name.clone());
            }
            return Ok(out);
        }

        let UTerm::Sum { bound, body } = self.ctx.get(term).clone() else {
            unreachable!("summation() is only called on Sum nodes");
        };

        // A star body depending on an *enclosing* star's variables has no
        // first-order encoding here.
        if self.in_scope(term) {
            return Err(CompileError::Unsupported(
                "summation nested under another summation's scope".to_string(),
            ));
        }

        let placeholder = self.fresh("q");
        self.sum_vars.insert(term, placeholder.clone());
        self.constraints.push(LFormula::cmp(
            CmpOp::Ge,
            LTerm::var(&placeholder),
            LTerm::Const(0),
        ));

        let mut frame = FxHashMap::default();
        let mut inner = Vec::with_capacity(bound.len());
        for v in &bound {
            let name = self.fresh("i");
            frame.insert(*v, name.clone());
            inner.push(name);
        }
        self.scopes.push(frame);
        self.scoped.push(Vec::new());
        let compiled_body = self.term(body);
        let frame_constraints = self.scoped.pop().unwrap_or_default();
        self.scopes.pop();
        let compiled_body = compiled_body?;

        debug!(placeholder = %placeholder, "emitting star constraint");
        self.star_constraints.push(LFormula::Sum {
            outer: vec![LTerm::Var(placeholder.clone())],
            inner,
            body: vec![compiled_body],
            constraint: Box::new(LFormula::and_of(frame_constraints)),
        });
        Ok(LTerm::Var(placeholder))
    }

    /// Close the session: side constraints, star constraints, pairwise string
    /// distinctness and congruence over compiled tuple equalities, all
    /// conjoined with the goal.
    pub fn finish(mut self, goal: LFormula) -> LFormula {
        let mut parts = Vec::new();
        parts.append(&mut self.constraints);
        parts.append(&mut self.star_constraints);

        let mut svars: Vec<String> = self.strings.values().cloned().collect();
        svars.sort();
        for i in 0..svars.len() {
            for j in i + 1..svars.len() {
                parts.push(LFormula::ne(
                    LTerm::var(&svars[i]),
                    LTerm::var(&svars[j]),
                ));
            }
        }

        // Congruence: tuples proven equal agree on every attribute value,
        // null flag and relation multiplicity any side compiled, even when
        // only one side mentioned it. Each constraint pairs both variables,
        // created on demand so it is closed.
        let mut eqs = self.tuple_eqs.clone();
        eqs.sort_unstable();
        eqs.dedup();
        for (x, y) in eqs {
            let tx = self.tuple(x);
            let ty = self.tuple(y);
            let differ = LFormula::ne(tx, ty);

            for attr in self.projected_attrs(&self.scalar_vars, x, y) {
                let attr_name = self.ctx.sym_name(attr).to_string();
                let px = self.ctx.proj(&attr_name, x);
                let py = self.ctx.proj(&attr_name, y);
                if let (Ok(vx), Ok(vy)) = (self.scalar(px), self.scalar(py)) {
                    parts.push(LFormula::or_of(vec![
                        differ.clone(),
                        LFormula::eq(vx, vy),
                    ]));
                }
            }

            for attr in self.projected_attrs(&self.null_vars, x, y) {
                let attr_name = self.ctx.sym_name(attr).to_string();
                let px = self.ctx.proj(&attr_name, x);
                let py = self.ctx.proj(&attr_name, y);
                if let (Ok(fx), Ok(fy)) = (self.null_flag(px), self.null_flag(py)) {
                    parts.push(LFormula::or_of(vec![
                        differ.clone(),
                        LFormula::eq(fx, fy),
                    ]));
                }
            }

            for table in self.scanned_tables(x, y) {
                let table_name = self.ctx.sym_name(table).to_string();
                let sx = self.ctx.table(&table_name, x);
                let sy = self.ctx.table(&table_name, y);
                if let (Ok(mx), Ok(my)) = (
                    self.table(sx, table, x),
                    self.table(sy, table, y),
                ) {
                    parts.push(LFormula::or_of(vec![
                        differ.clone(),
                        LFormula::eq(mx, my),
                    ]));
                }
            }
        }

        // Range constraints for variables minted during the congruence pass.
        parts.append(&mut self.constraints);

        parts.push(goal);
        LFormula::and_of(parts)
    }

    /// Attribute names in `memo` projected from either tuple, sorted by name.
    fn projected_attrs(
        &self,
        memo: &FxHashMap<VarId, String>,
        x: VarId,
        y: VarId,
    ) -> Vec<Symbol> {
        let mut attrs: Vec<Symbol> = memo
            .keys()
            .filter_map(|&p| match self.ctx.var_node(p) {
                UVar::Proj { attr, of }
                    if self.ctx.base_of(*of) == x || self.ctx.base_of(*of) == y =>
                {
                    Some(*attr)
                }
                _ => None,
            })
            .collect();
        attrs.sort_by(|&a, &b| self.ctx.sym_name(a).cmp(self.ctx.sym_name(b)));
        attrs.dedup();
        attrs
    }

    /// Relations scanned over either tuple, sorted by name.
    fn scanned_tables(&self, x: VarId, y: VarId) -> Vec<Symbol> {
        let mut tables: Vec<Symbol> = self
            .atom_vars
            .keys()
            .filter_map(|&t| match self.ctx.get(t) {
                UTerm::Table { name, var }
                    if self.ctx.base_of(*var) == x || self.ctx.base_of(*var) == y =>
                {
                    Some(*name)
                }
                _ => None,
            })
            .collect();
        tables.sort_by(|&a, &b| self.ctx.sym_name(a).cmp(self.ctx.sym_name(b)));
        tables.dedup();
        tables
    }
}

fn cmp_op(kind: &PredKind) -> CmpOp {
    match kind {
        PredKind::Eq => CmpOp::Eq,
        PredKind::Neq => CmpOp::Ne,
        PredKind::Le => CmpOp::Le,
        PredKind::Lt => CmpOp::Lt,
        PredKind::Ge => CmpOp::Ge,
        PredKind::Gt => CmpOp::Gt,
        PredKind::Func(_) => unreachable!("named predicates handled separately"),
    }
}

fn bool_to_int(cond: LFormula) -> LTerm {
    LTerm::ite(cond, LTerm::Const(1), LTerm::Const(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplify::simplify;
    use uveq_engine::normalize;

    #[test]
    fn identical_sides_compile_to_an_unsatisfiable_difference() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let f = compile_neq(&mut ctx, t, t, None).unwrap();
        assert_eq!(simplify(&f), LFormula::False);
    }

    #[test]
    fn trivial_self_equality_never_reaches_the_formula() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let xv = ctx.scalar(x);
        let refl = ctx.eq(xv, xv);
        let prod = ctx.mul_of(vec![refl, t]);
        let left = normalize(&mut ctx, prod);
        assert_eq!(left, t);
        let f = compile_neq(&mut ctx, left, t, None).unwrap();
        assert_eq!(simplify(&f), LFormula::False);
    }

    #[test]
    fn shared_summations_share_one_placeholder() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t = ctx.table("t0", x);
        let s = ctx.sum(vec![x], t);
        // Interning makes the two sides the same node, so the compiler must
        // reuse the placeholder and the difference must vanish.
        let f = compile_neq(&mut ctx, s, s, None).unwrap();
        assert_eq!(simplify(&f), LFormula::False);
    }

    #[test]
    fn surviving_summation_emits_a_star() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t1", y);
        let s = ctx.sum(vec![x], tx);
        let f = compile_neq(&mut ctx, s, ty, None).unwrap();
        assert!(f.has_sum());
    }

    #[test]
    fn forced_bound_variable_is_instantiated_not_starred() {
        let mut ctx = Context::new();
        let outer = ctx.base("x0");
        let b = ctx.base("x1");
        let ov = ctx.scalar(outer);
        let bv = ctx.scalar(b);
        let link = ctx.eq(ov, bv);
        let tb = ctx.table("t0", b);
        let body = ctx.mul_of(vec![link, tb]);
        let s = ctx.sum(vec![b], body);
        let other = ctx.table("t1", outer);
        let f = compile_neq(&mut ctx, s, other, None).unwrap();
        assert!(!f.has_sum());
    }

    /// Whether some conjunct is a congruence disjunction whose equality
    /// relates two variables with the given name prefix.
    fn has_congruence_over(parts: &[LFormula], prefix: char) -> bool {
        parts.iter().any(|p| match p {
            LFormula::Or(disjuncts) => disjuncts.iter().any(|d| match d {
                LFormula::Cmp(CmpOp::Eq, LTerm::Var(a), LTerm::Var(b)) => {
                    a.starts_with(prefix) && b.starts_with(prefix)
                }
                _ => false,
            }),
            _ => false,
        })
    }

    #[test]
    fn equal_tuples_agree_on_attributes_and_scans() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t0", y);
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let link = ctx.eq(xv, yv);
        let ax = ctx.proj("a0", x);
        let axv = ctx.scalar(ax);
        let ay = ctx.proj("a0", y);
        let ayv = ctx.scalar(ay);
        let three = ctx.num(3);
        let px = ctx.eq(axv, three);
        let py = ctx.eq(ayv, three);
        // Equal on every instance: the filter ranges over proven-equal
        // tuples, so neither side may be refutable against the other.
        let left = ctx.mul_of(vec![tx, ty, link, px]);
        let right = ctx.mul_of(vec![tx, ty, link, py]);
        let f = compile_neq(&mut ctx, left, right, None).unwrap();
        let LFormula::And(parts) = f else {
            panic!("expected a conjunction");
        };
        // Attribute values ("p" variables) and relation multiplicities
        // ("m" variables) are both tied across the equality.
        assert!(has_congruence_over(&parts, 'p'));
        assert!(has_congruence_over(&parts, 'm'));
    }

    #[test]
    fn equal_tuples_carry_equal_null_flags() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t0", y);
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let link = ctx.eq(xv, yv);
        let ax = ctx.proj("a0", x);
        let axv = ctx.scalar(ax);
        let isnull = ctx.named_pred("IsNull", vec![axv]);
        let left = ctx.mul_of(vec![tx, ty, link, isnull]);
        let right = ctx.mul_of(vec![tx, ty, link]);
        let f = compile_neq(&mut ctx, left, right, None).unwrap();
        let LFormula::And(parts) = f else {
            panic!("expected a conjunction");
        };
        // Only the left side tests a0, yet both flags ("n" variables) must
        // appear tied so the constraint is closed.
        assert!(has_congruence_over(&parts, 'n'));
    }

    #[test]
    fn string_literals_are_pairwise_distinct() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let hello = ctx.string("hello");
        let world = ctx.string("world");
        let p1 = ctx.eq(av, hello);
        let p2 = ctx.eq(av, world);
        let prod = ctx.mul_of(vec![p1, p2]);
        let zero = ctx.zero();
        let f = compile_neq(&mut ctx, prod, zero, None).unwrap();
        let LFormula::And(parts) = f else {
            panic!("expected a conjunction");
        };
        assert!(parts
            .iter()
            .any(|p| matches!(p, LFormula::Cmp(CmpOp::Ne, LTerm::Var(_), LTerm::Var(_)))));
    }
}
