//! Algebraic cleanup of compiled formulas.
//!
//! Constant folding, connective and arithmetic flattening, if-then-else
//! collapse, and syntactic-identity comparison folding. Runs to a fixed
//! point; the result is what actually reaches the solver, so the orchestrator
//! can also short-circuit on `True`/`False` without a solver call.

use crate::formula::{CmpOp, LFormula, LTerm};

const MAX_ROUNDS: usize = 32;

pub fn simplify(formula: &LFormula) -> LFormula {
    let mut current = formula.clone();
    for _ in 0..MAX_ROUNDS {
        let next = simp_formula(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn simp_formula(f: &LFormula) -> LFormula {
    match f {
        LFormula::True => LFormula::True,
        LFormula::False => LFormula::False,
        LFormula::Cmp(op, a, b) => simp_cmp(*op, simp_term(a), simp_term(b)),
        LFormula::And(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                match simp_formula(p) {
                    LFormula::True => {}
                    LFormula::False => return LFormula::False,
                    LFormula::And(nested) => out.extend(nested),
                    other => out.push(other),
                }
            }
            LFormula::and_of(out)
        }
        LFormula::Or(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                match simp_formula(p) {
                    LFormula::False => {}
                    LFormula::True => return LFormula::True,
                    LFormula::Or(nested) => out.extend(nested),
                    other => out.push(other),
                }
            }
            LFormula::or_of(out)
        }
        LFormula::Not(inner) => match simp_formula(inner) {
            LFormula::True => LFormula::False,
            LFormula::False => LFormula::True,
            LFormula::Not(doubled) => *doubled,
            other => other.negated(),
        },
        LFormula::Sum {
            outer,
            inner,
            body,
            constraint,
        } => LFormula::Sum {
            outer: outer.iter().map(simp_term).collect(),
            inner: inner.clone(),
            body: body.iter().map(simp_term).collect(),
            constraint: Box::new(simp_formula(constraint)),
        },
    }
}

fn simp_cmp(op: CmpOp, a: LTerm, b: LTerm) -> LFormula {
    if let (LTerm::Const(x), LTerm::Const(y)) = (&a, &b) {
        let holds = match op {
            CmpOp::Eq => x == y,
            CmpOp::Ne => x != y,
            CmpOp::Le => x <= y,
            CmpOp::Lt => x < y,
            CmpOp::Ge => x >= y,
            CmpOp::Gt => x > y,
        };
        return if holds { LFormula::True } else { LFormula::False };
    }
    // Syntactically identical sides have one value.
    if a == b {
        return match op {
            CmpOp::Eq | CmpOp::Le | CmpOp::Ge => LFormula::True,
            CmpOp::Ne | CmpOp::Lt | CmpOp::Gt => LFormula::False,
        };
    }
    LFormula::Cmp(op, a, b)
}

fn simp_term(t: &LTerm) -> LTerm {
    match t {
        LTerm::Const(_) | LTerm::Var(_) => t.clone(),
        LTerm::Add(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            let mut acc = 0i64;
            for p in parts {
                match simp_term(p) {
                    LTerm::Const(c) => acc += c,
                    LTerm::Add(nested) => out.extend(nested),
                    other => out.push(other),
                }
            }
            if acc != 0 || out.is_empty() {
                out.push(LTerm::Const(acc));
            }
            if out.len() == 1 {
                out.swap_remove(0)
            } else {
                LTerm::Add(out)
            }
        }
        LTerm::Mul(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            let mut acc = 1i64;
            for p in parts {
                match simp_term(p) {
                    LTerm::Const(0) => return LTerm::Const(0),
                    LTerm::Const(c) => acc *= c,
                    LTerm::Mul(nested) => out.extend(nested),
                    other => out.push(other),
                }
            }
            if acc != 1 || out.is_empty() {
                out.push(LTerm::Const(acc));
            }
            if out.len() == 1 {
                out.swap_remove(0)
            } else {
                LTerm::Mul(out)
            }
        }
        LTerm::Ite(cond, then, otherwise) => {
            let cond = simp_formula(cond);
            let then = simp_term(then);
            let otherwise = simp_term(otherwise);
            match cond {
                LFormula::True => then,
                LFormula::False => otherwise,
                _ if then == otherwise => then,
                _ => LTerm::ite(cond, then, otherwise),
            }
        }
        LTerm::App(name, args) => LTerm::App(name.clone(), args.iter().map(simp_term).collect()),
    }
}
