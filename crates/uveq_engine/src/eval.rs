//! Naive evaluator over small concrete instances.
//!
//! Interprets a term in the counting semiring against an explicit database
//! instance. Orders of magnitude too slow for real queries; it exists as the
//! semantics oracle behind the property tests, which check that every rewrite
//! preserves the evaluated value on random instances.
//!
//! Tuple variables range over row slots of the instance; tuple equality is
//! slot identity, so substitution through an equality predicate is always
//! value-preserving. Uninterpreted functions and predicates get a fixed
//! pseudo-random interpretation derived from their name and arguments.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;
use uveq_ast::{Context, PredKind, TermId, UTerm, UVar, VarId};

/// A concrete scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Str(String),
    Null,
}

/// One row: attribute name to value.
pub type Tuple = BTreeMap<String, Value>;

/// A small database instance.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    /// Every row slot any variable may range over.
    pub tuples: Vec<Tuple>,
    /// Relation name to the slots it contains (with multiplicity).
    pub tables: FxHashMap<String, Vec<usize>>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row slot, returning its index.
    pub fn push_tuple(&mut self, tuple: Tuple) -> usize {
        self.tuples.push(tuple);
        self.tuples.len() - 1
    }

    pub fn insert_into(&mut self, table: &str, slot: usize) {
        self.tables.entry(table.to_string()).or_default().push(slot);
    }

    fn multiplicity(&self, table: &str, slot: usize) -> i64 {
        self.tables
            .get(table)
            .map(|slots| slots.iter().filter(|&&s| s == slot).count() as i64)
            .unwrap_or(0)
    }
}

/// An assignment of base variables to row slots.
pub type Env = FxHashMap<VarId, usize>;

/// What a tuple variable denotes once resolved against an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Resolved {
    Slot(usize),
    Scalar(Value),
    Pair(Box<Resolved>, Box<Resolved>),
}

/// Evaluate a term to its semiring value, or `None` when the term mentions a
/// variable the environment does not cover (only possible for open terms).
pub fn eval(ctx: &Context, inst: &Instance, env: &Env, term: TermId) -> Option<i64> {
    match ctx.get(term) {
        UTerm::Const(c) => Some(*c),
        UTerm::Str(_) => None,
        UTerm::Var(v) => match resolve_var(ctx, inst, env, *v)? {
            Resolved::Scalar(Value::Int(n)) => Some(n),
            _ => None,
        },
        UTerm::Add(ops) => {
            let mut total = 0i64;
            for &op in ops {
                total += eval(ctx, inst, env, op)?;
            }
            Some(total)
        }
        UTerm::Mul(ops) => {
            let mut total = 1i64;
            for &op in ops {
                total *= eval(ctx, inst, env, op)?;
                if total == 0 {
                    return Some(0);
                }
            }
            Some(total)
        }
        UTerm::Sum { bound, body } => eval_sum(ctx, inst, env, bound, *body),
        // Nonzero, not positive: constants may be negative.
        UTerm::Squash(body) => Some(if eval(ctx, inst, env, *body)? != 0 { 1 } else { 0 }),
        UTerm::Not(body) => Some(if eval(ctx, inst, env, *body)? != 0 { 0 } else { 1 }),
        UTerm::Pred { kind, args } => eval_pred(ctx, inst, env, kind, args),
        UTerm::Table { name, var } => {
            let base = ctx.base_of(*var);
            let slot = *env.get(&base)?;
            Some(inst.multiplicity(ctx.sym_name(*name), slot))
        }
        UTerm::Func { name, args } => {
            // Fixed pseudo-random interpretation into a small range so that
            // collisions (and therefore satisfied equalities) actually occur.
            let mut h = DefaultHasher::new();
            ctx.sym_name(*name).hash(&mut h);
            for &arg in args {
                scalar_value(ctx, inst, env, arg)?.hash(&mut h);
            }
            Some((h.finish() % 5) as i64)
        }
    }
}

fn eval_sum(
    ctx: &Context,
    inst: &Instance,
    env: &Env,
    bound: &[VarId],
    body: TermId,
) -> Option<i64> {
    if bound.is_empty() {
        return eval(ctx, inst, env, body);
    }
    if inst.tuples.is_empty() {
        return Some(0);
    }
    let mut total = 0i64;
    let mut choice = vec![0usize; bound.len()];
    loop {
        let mut inner = env.clone();
        for (v, &slot) in bound.iter().zip(&choice) {
            inner.insert(*v, slot);
        }
        total += eval(ctx, inst, &inner, body)?;

        // Advance the mixed-radix counter over row slots.
        let mut i = 0;
        loop {
            if i == choice.len() {
                return Some(total);
            }
            choice[i] += 1;
            if choice[i] < inst.tuples.len() {
                break;
            }
            choice[i] = 0;
            i += 1;
        }
    }
}

fn eval_pred(
    ctx: &Context,
    inst: &Instance,
    env: &Env,
    kind: &PredKind,
    args: &[TermId],
) -> Option<i64> {
    match kind {
        PredKind::Eq | PredKind::Neq => {
            if args.len() != 2 {
                return None;
            }
            let a = resolve_arg(ctx, inst, env, args[0])?;
            let b = resolve_arg(ctx, inst, env, args[1])?;
            // A null on either side fails both the equality and its negation.
            if is_null(&a) || is_null(&b) {
                return Some(0);
            }
            let eq = a == b;
            Some(match kind {
                PredKind::Eq => eq as i64,
                _ => (!eq) as i64,
            })
        }
        PredKind::Le | PredKind::Lt | PredKind::Ge | PredKind::Gt => {
            if args.len() != 2 {
                return None;
            }
            let a = resolve_arg(ctx, inst, env, args[0])?;
            let b = resolve_arg(ctx, inst, env, args[1])?;
            let (Resolved::Scalar(Value::Int(x)), Resolved::Scalar(Value::Int(y))) = (&a, &b)
            else {
                return Some(0);
            };
            let holds = match kind {
                PredKind::Le => x <= y,
                PredKind::Lt => x < y,
                PredKind::Ge => x >= y,
                PredKind::Gt => x > y,
                _ => unreachable!(),
            };
            Some(holds as i64)
        }
        PredKind::Func(name) => {
            let name = ctx.sym_name(*name);
            if args.len() == 1 && (name == "IsNull" || name == "IsNotNull") {
                let v = resolve_arg(ctx, inst, env, args[0])?;
                let null = is_null(&v);
                return Some(if name == "IsNull" { null as i64 } else { (!null) as i64 });
            }
            // Uninterpreted predicate: fixed pseudo-random 0/1.
            let mut h = DefaultHasher::new();
            name.hash(&mut h);
            for &arg in args {
                resolve_arg(ctx, inst, env, arg)?.hash(&mut h);
            }
            Some((h.finish() % 2) as i64)
        }
    }
}

fn is_null(r: &Resolved) -> bool {
    matches!(r, Resolved::Scalar(Value::Null))
}

/// A predicate argument as a comparable value (row slot, scalar or pair).
fn resolve_arg(ctx: &Context, inst: &Instance, env: &Env, arg: TermId) -> Option<Resolved> {
    match ctx.get(arg) {
        UTerm::Const(c) => Some(Resolved::Scalar(Value::Int(*c))),
        UTerm::Str(s) => Some(Resolved::Scalar(Value::Str(ctx.sym_name(*s).to_string()))),
        UTerm::Var(v) => resolve_var(ctx, inst, env, *v),
        _ => eval(ctx, inst, env, arg).map(|n| Resolved::Scalar(Value::Int(n))),
    }
}

fn scalar_value(ctx: &Context, inst: &Instance, env: &Env, arg: TermId) -> Option<Value> {
    match resolve_arg(ctx, inst, env, arg)? {
        Resolved::Scalar(v) => Some(v),
        Resolved::Slot(s) => Some(Value::Int(s as i64)),
        Resolved::Pair(..) => None,
    }
}

fn resolve_var(ctx: &Context, inst: &Instance, env: &Env, var: VarId) -> Option<Resolved> {
    match ctx.var_node(var) {
        UVar::Base(_) => env.get(&var).map(|&slot| Resolved::Slot(slot)),
        UVar::Proj { attr, of } => {
            let of = resolve_var(ctx, inst, env, *of)?;
            match of {
                Resolved::Slot(slot) => {
                    let tuple = inst.tuples.get(slot)?;
                    let value = tuple
                        .get(ctx.sym_name(*attr))
                        .cloned()
                        .unwrap_or(Value::Null);
                    Some(Resolved::Scalar(value))
                }
                _ => None,
            }
        }
        UVar::Concat(a, b) => {
            let a = resolve_var(ctx, inst, env, *a)?;
            let b = resolve_var(ctx, inst, env, *b)?;
            Some(Resolved::Pair(Box::new(a), Box::new(b)))
        }
    }
}
