//! Semantics-preserving preprocessing.
//!
//! Three passes, each idempotent and each a no-op on terms it does not
//! recognize:
//!
//! - [`constants::propagate_constants`]: solve `var = literal` equalities
//!   online, substitute, collapse conflicting bindings to 0;
//! - [`nulls::propagate_nulls`]: build null / not-null equivalence classes
//!   per product and collapse contradictions to 0;
//! - [`concretize::concretize`]: eliminate bound variables forced equal to an
//!   outer variable.
//!
//! [`preprocess`] drives them to a joint fixpoint interleaved with
//! normalization (a pass can expose work for another, e.g. a substituted
//! constant grounds a comparison that the normalizer then folds).

pub mod concretize;
pub mod constants;
pub mod nulls;

use uveq_ast::{Catalog, Context, TermId};

use crate::integrity;
use crate::normalize::normalize;

const MAX_ROUNDS: usize = 16;

/// Run all preprocessing passes (and, when a catalog is supplied, the
/// integrity-constraint fold) to a fixpoint. The result is normalized.
pub fn preprocess(ctx: &mut Context, term: TermId, catalog: Option<&Catalog>) -> TermId {
    let mut current = normalize(ctx, term);
    for _ in 0..MAX_ROUNDS {
        let mut next = constants::propagate_constants(ctx, current);
        next = nulls::propagate_nulls(ctx, next, catalog);
        next = concretize::concretize(ctx, next);
        if let Some(cat) = catalog {
            next = integrity::fold_unique_keys(ctx, next, cat);
        }
        next = normalize(ctx, next);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_is_idempotent() {
        let mut ctx = Context::new();
        let x = ctx.base("x0");
        let y = ctx.base("x1");
        let a = ctx.proj("a0", x);
        let av = ctx.scalar(a);
        let c = ctx.num(3);
        let p = ctx.eq(av, c);
        let tx = ctx.table("t0", x);
        let ty = ctx.table("t0", y);
        let xv = ctx.scalar(x);
        let yv = ctx.scalar(y);
        let link = ctx.eq(xv, yv);
        let body = ctx.mul_of(vec![p, tx, ty, link]);
        let s = ctx.sum(vec![y], body);
        let once = preprocess(&mut ctx, s, None);
        let twice = preprocess(&mut ctx, once, None);
        assert_eq!(once, twice);
    }
}
