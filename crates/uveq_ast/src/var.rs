use crate::context::{Context, Symbol, VarId};

/// A tuple variable or a view of one.
///
/// Only `Base` is a variable proper; `Proj` and `Concat` are views of base
/// variables (an attribute projection and a pairing used for composite keys).
/// Equality is structural and, through interning, reduces to [`VarId`]
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UVar {
    /// An atomic tuple variable, e.g. `x0`.
    Base(Symbol),
    /// Attribute projection of a tuple, e.g. `a0(x0)`.
    Proj { attr: Symbol, of: VarId },
    /// Pairing of two vars, used for composite keys.
    Concat(VarId, VarId),
}

/// Fresh-name generator for tuple variables.
///
/// Each equivalence check owns a private generator (no process-wide counter),
/// so concurrent checks never contend or observe each other's names.
#[derive(Debug, Default)]
pub struct VarGen {
    next: u32,
}

impl VarGen {
    pub fn new() -> Self {
        VarGen::default()
    }

    /// Mint a base variable named `<prefix><n>`, skipping names already in
    /// use in `ctx` so the result can never capture an existing variable.
    pub fn fresh(&mut self, ctx: &mut Context, prefix: &str) -> VarId {
        loop {
            let name = format!("{}{}", prefix, self.next);
            self.next += 1;
            if !ctx.has_base(&name) {
                return ctx.base(&name);
            }
        }
    }
}
