//! The LIA★ formula language.
//!
//! Plain linear integer arithmetic over named variables, extended with
//! uninterpreted applications (table membership, scalar functions), integer
//! if-then-else, and [`LFormula::Sum`]: the Kleene-star summation used to
//! encode an unbounded number of rows contributing to a multiplicity.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Le => "<=",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }
}

/// An integer-valued term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LTerm {
    Const(i64),
    Var(String),
    Add(Vec<LTerm>),
    Mul(Vec<LTerm>),
    Ite(Box<LFormula>, Box<LTerm>, Box<LTerm>),
    /// Uninterpreted application; the solver only guarantees congruence.
    App(String, Vec<LTerm>),
}

impl LTerm {
    pub fn var(name: impl Into<String>) -> LTerm {
        LTerm::Var(name.into())
    }

    pub fn ite(cond: LFormula, then: LTerm, otherwise: LTerm) -> LTerm {
        LTerm::Ite(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    pub fn is_const(&self, c: i64) -> bool {
        matches!(self, LTerm::Const(k) if *k == c)
    }
}

/// A boolean formula over [`LTerm`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LFormula {
    True,
    False,
    Cmp(CmpOp, LTerm, LTerm),
    And(Vec<LFormula>),
    Or(Vec<LFormula>),
    Not(Box<LFormula>),
    /// `outer ∈ { body | constraint }*` with `inner` the starred variables:
    /// the outer vector is the component-wise sum of finitely many
    /// instantiations of the body vector, each instantiation assigning the
    /// inner variables so that the constraint holds.
    Sum {
        outer: Vec<LTerm>,
        inner: Vec<String>,
        body: Vec<LTerm>,
        constraint: Box<LFormula>,
    },
}

impl LFormula {
    pub fn cmp(op: CmpOp, a: LTerm, b: LTerm) -> LFormula {
        LFormula::Cmp(op, a, b)
    }

    pub fn eq(a: LTerm, b: LTerm) -> LFormula {
        LFormula::Cmp(CmpOp::Eq, a, b)
    }

    pub fn ne(a: LTerm, b: LTerm) -> LFormula {
        LFormula::Cmp(CmpOp::Ne, a, b)
    }

    pub fn negated(self) -> LFormula {
        LFormula::Not(Box::new(self))
    }

    /// Conjunction without gratuitous nesting for the 0/1-ary cases.
    pub fn and_of(mut parts: Vec<LFormula>) -> LFormula {
        match parts.len() {
            0 => LFormula::True,
            1 => parts.swap_remove(0),
            _ => LFormula::And(parts),
        }
    }

    pub fn or_of(mut parts: Vec<LFormula>) -> LFormula {
        match parts.len() {
            0 => LFormula::False,
            1 => parts.swap_remove(0),
            _ => LFormula::Or(parts),
        }
    }

    /// Whether the formula contains a star construct anywhere.
    pub fn has_sum(&self) -> bool {
        match self {
            LFormula::True | LFormula::False => false,
            LFormula::Cmp(_, a, b) => term_has_sum(a) || term_has_sum(b),
            LFormula::And(fs) | LFormula::Or(fs) => fs.iter().any(LFormula::has_sum),
            LFormula::Not(f) => f.has_sum(),
            LFormula::Sum { .. } => true,
        }
    }
}

fn term_has_sum(t: &LTerm) -> bool {
    match t {
        LTerm::Const(_) | LTerm::Var(_) => false,
        LTerm::Add(ts) | LTerm::Mul(ts) | LTerm::App(_, ts) => ts.iter().any(term_has_sum),
        LTerm::Ite(c, a, b) => c.has_sum() || term_has_sum(a) || term_has_sum(b),
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for LTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LTerm::Const(c) => write!(f, "{c}"),
            LTerm::Var(v) => f.write_str(v),
            LTerm::Add(ts) => {
                f.write_str("(")?;
                join(f, ts, " + ")?;
                f.write_str(")")
            }
            LTerm::Mul(ts) => {
                f.write_str("(")?;
                join(f, ts, " * ")?;
                f.write_str(")")
            }
            LTerm::Ite(c, a, b) => write!(f, "ite({c}, {a}, {b})"),
            LTerm::App(name, args) => {
                write!(f, "{name}(")?;
                join(f, args, ", ")?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for LFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LFormula::True => f.write_str("true"),
            LFormula::False => f.write_str("false"),
            LFormula::Cmp(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            LFormula::And(fs) => {
                f.write_str("(")?;
                join(f, fs, " and ")?;
                f.write_str(")")
            }
            LFormula::Or(fs) => {
                f.write_str("(")?;
                join(f, fs, " or ")?;
                f.write_str(")")
            }
            LFormula::Not(inner) => write!(f, "not {inner}"),
            LFormula::Sum {
                outer,
                inner,
                body,
                constraint,
            } => {
                f.write_str("(")?;
                join(f, outer, ", ")?;
                f.write_str(") in {(")?;
                join(f, body, ", ")?;
                f.write_str(") : ")?;
                join(f, inner, ", ")?;
                write!(f, " | {constraint}}}*")
            }
        }
    }
}
