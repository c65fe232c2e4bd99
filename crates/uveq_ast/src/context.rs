use rustc_hash::FxHashMap;

use crate::term::{PredKind, UTerm};
use crate::var::UVar;

/// Interned string (table names, attribute names, function names, literals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub(crate) u32);

/// Interned tuple variable (or view, see [`UVar`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

/// Interned U-expression node. Equal ids ⇔ structurally equal terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

/// Hash-consing arena for symbols, tuple variables and terms.
///
/// Every pipeline stage takes `&mut Context` to intern new nodes; existing
/// nodes are never mutated, so a `TermId` held across a rewrite still denotes
/// the same tree. One `Context` belongs to one equivalence check; there is no
/// shared global arena.
#[derive(Debug, Default, Clone)]
pub struct Context {
    strings: Vec<String>,
    string_ids: FxHashMap<String, Symbol>,
    vars: Vec<UVar>,
    var_ids: FxHashMap<UVar, VarId>,
    terms: Vec<UTerm>,
    term_ids: FxHashMap<UTerm, TermId>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    pub fn sym(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.string_ids.get(name) {
            return id;
        }
        let id = Symbol(self.strings.len() as u32);
        self.strings.push(name.to_string());
        self.string_ids.insert(name.to_string(), id);
        id
    }

    pub fn sym_name(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    // ------------------------------------------------------------------
    // Tuple variables
    // ------------------------------------------------------------------

    pub fn var(&mut self, var: UVar) -> VarId {
        if let Some(&id) = self.var_ids.get(&var) {
            return id;
        }
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var.clone());
        self.var_ids.insert(var, id);
        id
    }

    pub fn var_node(&self, id: VarId) -> &UVar {
        &self.vars[id.0 as usize]
    }

    /// Intern a base tuple variable by name.
    pub fn base(&mut self, name: &str) -> VarId {
        let sym = self.sym(name);
        self.var(UVar::Base(sym))
    }

    /// Whether a base variable with this name already exists.
    pub fn has_base(&self, name: &str) -> bool {
        match self.string_ids.get(name) {
            Some(&sym) => self.var_ids.contains_key(&UVar::Base(sym)),
            None => false,
        }
    }

    /// Intern an attribute projection `attr(of)`.
    pub fn proj(&mut self, attr: &str, of: VarId) -> VarId {
        let attr = self.sym(attr);
        self.var(UVar::Proj { attr, of })
    }

    /// Intern a pairing `⟨a, b⟩`.
    pub fn concat(&mut self, a: VarId, b: VarId) -> VarId {
        self.var(UVar::Concat(a, b))
    }

    /// The base variable underlying a projection/concat view. For `Concat`
    /// the left component's base is taken (composite keys project through
    /// their first member).
    pub fn base_of(&self, id: VarId) -> VarId {
        match self.var_node(id) {
            UVar::Base(_) => id,
            UVar::Proj { of, .. } => self.base_of(*of),
            UVar::Concat(a, _) => self.base_of(*a),
        }
    }

    /// All base variables underlying a view (both components of a concat).
    pub fn bases_of(&self, id: VarId) -> Vec<VarId> {
        match self.var_node(id) {
            UVar::Base(_) => vec![id],
            UVar::Proj { of, .. } => self.bases_of(*of),
            UVar::Concat(a, b) => {
                let mut out = self.bases_of(*a);
                out.extend(self.bases_of(*b));
                out
            }
        }
    }

    // ------------------------------------------------------------------
    // Terms
    // ------------------------------------------------------------------

    /// Intern a term node. This is the only way terms enter the arena.
    pub fn add(&mut self, term: UTerm) -> TermId {
        if let Some(&id) = self.term_ids.get(&term) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.push(term.clone());
        self.term_ids.insert(term, id);
        id
    }

    pub fn get(&self, id: TermId) -> &UTerm {
        &self.terms[id.0 as usize]
    }

    // Typed convenience constructors over `add`.

    pub fn num(&mut self, n: i64) -> TermId {
        self.add(UTerm::Const(n))
    }

    pub fn zero(&mut self) -> TermId {
        self.num(0)
    }

    pub fn one(&mut self) -> TermId {
        self.num(1)
    }

    pub fn string(&mut self, s: &str) -> TermId {
        let sym = self.sym(s);
        self.add(UTerm::Str(sym))
    }

    /// A tuple-derived value used as a scalar term.
    pub fn scalar(&mut self, v: VarId) -> TermId {
        self.add(UTerm::Var(v))
    }

    /// Raw n-ary sum; does not flatten or sort (the normalizer's job).
    pub fn add_of(&mut self, ops: Vec<TermId>) -> TermId {
        match ops.len() {
            0 => self.zero(),
            1 => ops[0],
            _ => self.add(UTerm::Add(ops)),
        }
    }

    /// Raw n-ary product; does not flatten or sort (the normalizer's job).
    pub fn mul_of(&mut self, ops: Vec<TermId>) -> TermId {
        match ops.len() {
            0 => self.one(),
            1 => ops[0],
            _ => self.add(UTerm::Mul(ops)),
        }
    }

    /// Summation. The bound list is sorted and deduplicated (set semantics);
    /// an empty bound set collapses to the body.
    pub fn sum(&mut self, mut bound: Vec<VarId>, body: TermId) -> TermId {
        bound.sort_unstable();
        bound.dedup();
        if bound.is_empty() {
            return body;
        }
        self.add(UTerm::Sum { bound, body })
    }

    pub fn squash(&mut self, body: TermId) -> TermId {
        self.add(UTerm::Squash(body))
    }

    pub fn negate(&mut self, body: TermId) -> TermId {
        self.add(UTerm::Not(body))
    }

    pub fn pred(&mut self, kind: PredKind, args: Vec<TermId>) -> TermId {
        self.add(UTerm::Pred { kind, args })
    }

    /// `[a = b]`.
    pub fn eq(&mut self, a: TermId, b: TermId) -> TermId {
        self.pred(PredKind::Eq, vec![a, b])
    }

    pub fn table(&mut self, name: &str, var: VarId) -> TermId {
        let name = self.sym(name);
        self.add(UTerm::Table { name, var })
    }

    pub fn call(&mut self, name: &str, args: Vec<TermId>) -> TermId {
        let name = self.sym(name);
        self.add(UTerm::Func { name, args })
    }

    /// Named unary predicate, e.g. `IsNull(v)`.
    pub fn named_pred(&mut self, name: &str, args: Vec<TermId>) -> TermId {
        let sym = self.sym(name);
        self.pred(PredKind::Func(sym), args)
    }

    /// Number of interned terms (diagnostics only).
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_gives_structural_equality() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let t1 = ctx.table("t0", x);
        let t2 = ctx.table("t0", x);
        assert_eq!(t1, t2);

        let a = ctx.num(3);
        let b = ctx.num(3);
        assert_eq!(a, b);
        assert_ne!(t1, a);
    }

    #[test]
    fn sum_bound_set_is_sorted_and_deduped() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let body = ctx.table("t0", x);
        let s1 = ctx.sum(vec![y, x, y], body);
        let s2 = ctx.sum(vec![x, y], body);
        assert_eq!(s1, s2);
    }

    #[test]
    fn empty_bound_set_collapses_to_body() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let body = ctx.table("t0", x);
        assert_eq!(ctx.sum(vec![], body), body);
    }

    #[test]
    fn base_of_projects_through_views() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let p = ctx.proj("a0", x);
        let q = ctx.proj("a1", p);
        assert_eq!(ctx.base_of(q), x);
    }
}
