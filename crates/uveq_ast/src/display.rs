//! Pretty-printing for terms and variables.
//!
//! Terms need the arena to resolve ids, so `Display` lives on small wrapper
//! structs handed out by [`Context::display`] / [`Context::display_var`].

use std::fmt;

use crate::context::{Context, TermId, VarId};
use crate::term::{PredKind, UTerm};
use crate::var::UVar;

pub struct TermDisplay<'a> {
    ctx: &'a Context,
    id: TermId,
}

pub struct VarDisplay<'a> {
    ctx: &'a Context,
    id: VarId,
}

impl Context {
    pub fn display(&self, id: TermId) -> TermDisplay<'_> {
        TermDisplay { ctx: self, id }
    }

    pub fn display_var(&self, id: VarId) -> VarDisplay<'_> {
        VarDisplay { ctx: self, id }
    }
}

impl fmt::Display for VarDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_var(self.ctx, self.id, f)
    }
}

fn write_var(ctx: &Context, id: VarId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ctx.var_node(id) {
        UVar::Base(name) => write!(f, "{}", ctx.sym_name(*name)),
        UVar::Proj { attr, of } => {
            write!(f, "{}(", ctx.sym_name(*attr))?;
            write_var(ctx, *of, f)?;
            write!(f, ")")
        }
        UVar::Concat(a, b) => {
            write!(f, "⟨")?;
            write_var(ctx, *a, f)?;
            write!(f, ", ")?;
            write_var(ctx, *b, f)?;
            write!(f, "⟩")
        }
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(self.ctx, self.id, f)
    }
}

fn write_term(ctx: &Context, id: TermId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ctx.get(id) {
        UTerm::Const(n) => write!(f, "{}", n),
        UTerm::Str(s) => write!(f, "\"{}\"", ctx.sym_name(*s)),
        UTerm::Var(v) => write_var(ctx, *v, f),
        UTerm::Add(ops) => {
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " + ")?;
                }
                write_term(ctx, *op, f)?;
            }
            Ok(())
        }
        UTerm::Mul(ops) => {
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " * ")?;
                }
                // Sums inside a product need grouping; everything else binds
                // tighter than `*` in this grammar.
                if matches!(ctx.get(*op), UTerm::Add(_) | UTerm::Sum { .. }) {
                    write!(f, "(")?;
                    write_term(ctx, *op, f)?;
                    write!(f, ")")?;
                } else {
                    write_term(ctx, *op, f)?;
                }
            }
            Ok(())
        }
        UTerm::Sum { bound, body } => {
            write!(f, "∑{{")?;
            for (i, v) in bound.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write_var(ctx, *v, f)?;
            }
            write!(f, "}}(")?;
            write_term(ctx, *body, f)?;
            write!(f, ")")
        }
        UTerm::Squash(body) => {
            write!(f, "‖")?;
            write_term(ctx, *body, f)?;
            write!(f, "‖")
        }
        UTerm::Not(body) => {
            write!(f, "not(")?;
            write_term(ctx, *body, f)?;
            write!(f, ")")
        }
        UTerm::Pred { kind, args } => match kind {
            PredKind::Func(name) => {
                write!(f, "[{}(", ctx.sym_name(*name))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_term(ctx, *arg, f)?;
                }
                write!(f, ")]")
            }
            _ => {
                let op = match kind {
                    PredKind::Eq => "=",
                    PredKind::Neq => "<>",
                    PredKind::Le => "<=",
                    PredKind::Lt => "<",
                    PredKind::Ge => ">=",
                    PredKind::Gt => ">",
                    PredKind::Func(_) => unreachable!(),
                };
                write!(f, "[")?;
                write_term(ctx, args[0], f)?;
                write!(f, " {} ", op)?;
                write_term(ctx, args[1], f)?;
                write!(f, "]")
            }
        },
        UTerm::Table { name, var } => {
            write!(f, "{}(", ctx.sym_name(*name))?;
            write_var(ctx, *var, f)?;
            write!(f, ")")
        }
        UTerm::Func { name, args } => {
            write!(f, "{}(", ctx.sym_name(*name))?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_term(ctx, *arg, f)?;
            }
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;

    #[test]
    fn renders_summation_with_squash_and_pred() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let c = ctx.num(1);
        let p = ctx.eq(av, c);
        let t = ctx.table("t0", x);
        let prod = ctx.mul_of(vec![p, t]);
        let sq = ctx.squash(prod);
        let s = ctx.sum(vec![x], sq);
        assert_eq!(
            format!("{}", ctx.display(s)),
            "∑{x0}(‖[a0(x0) = 1] * t0(x0)‖)"
        );
    }
}
