use crate::context::{Symbol, TermId, VarId};

/// Comparison kind of a [`UTerm::Pred`] node.
///
/// `Func` is a named predicate over tuple-derived values, e.g. `IsNull(a(x))`
/// or an in-list membership test. Named predicates always evaluate to 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PredKind {
    Eq,
    Neq,
    Le,
    Lt,
    Ge,
    Gt,
    Func(Symbol),
}

impl PredKind {
    /// Whether the kind is symmetric in its two arguments.
    pub fn is_symmetric(self) -> bool {
        matches!(self, PredKind::Eq | PredKind::Neq)
    }
}

/// A U-expression node.
///
/// The value of a term, given an instance and a binding of its free tuple
/// variables, is a natural number (a multiplicity). Predicates, [`UTerm::Not`]
/// and [`UTerm::Squash`] are 0/1-valued; [`UTerm::Table`] is the multiplicity
/// of the bound tuple in the named relation.
///
/// `Add` and `Mul` are n-ary, commutative and associative; the normalizer
/// keeps their operand lists flattened and canonically sorted. `Sum` binds a
/// *set* of distinct tuple variables over its body (the bound list is kept
/// sorted and deduplicated by [`Context::sum`](crate::Context::sum)).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UTerm {
    /// Integer constant multiplicity.
    Const(i64),
    /// String literal (uninterpreted; distinct literals are distinct values).
    Str(Symbol),
    /// A tuple-derived value used as a scalar.
    Var(VarId),
    /// n-ary sum of multiplicities.
    Add(Vec<TermId>),
    /// n-ary product of multiplicities.
    Mul(Vec<TermId>),
    /// Summation over all bindings of `bound` in the tuple universe.
    Sum { bound: Vec<VarId>, body: TermId },
    /// `‖body‖`: 1 if the body is nonzero, else 0.
    Squash(TermId),
    /// `not(body)`: 1 if the body is zero, else 0. Note `not(not(x))` is
    /// *not* `x` (the body may exceed 1); it only folds over a provably-zero
    /// body.
    Not(TermId),
    /// Comparison or named predicate over scalar arguments, 0/1-valued.
    Pred { kind: PredKind, args: Vec<TermId> },
    /// Multiplicity of the tuple `var` in relation `name`.
    Table { name: Symbol, var: VarId },
    /// Named scalar function (arithmetic, string ops, ...), uninterpreted.
    Func { name: Symbol, args: Vec<TermId> },
}

impl UTerm {
    /// Variant name, used in diagnostics and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            UTerm::Const(_) => "Const",
            UTerm::Str(_) => "Str",
            UTerm::Var(_) => "Var",
            UTerm::Add(_) => "Add",
            UTerm::Mul(_) => "Mul",
            UTerm::Sum { .. } => "Sum",
            UTerm::Squash(_) => "Squash",
            UTerm::Not(_) => "Not",
            UTerm::Pred { .. } => "Pred",
            UTerm::Table { .. } => "Table",
            UTerm::Func { .. } => "Func",
        }
    }

    /// True for `Const(0)`.
    pub fn is_zero(&self) -> bool {
        matches!(self, UTerm::Const(0))
    }

    /// True for `Const(1)`.
    pub fn is_one(&self) -> bool {
        matches!(self, UTerm::Const(1))
    }
}
