//! Bound-variable alignment.
//!
//! Two independently generated U-expressions quantify over differently-named
//! tuple variables. Before per-summation comparison (and before summation
//! compilation) one bound variable per summation is chosen to become the
//! shared "common tuple", and every summation is rewritten to use it.
//!
//! Selection runs in three modes of decreasing confidence:
//!
//! 1. **DIFF**: score each candidate bound variable by how far its renamed
//!    factor multiset is from the factors of already-decided summations on
//!    the opposite side; a unique minimum decides, ties defer. Deferred
//!    summations are revisited in an explicit worklist until a full pass
//!    makes no progress.
//! 2. **PATTERN**: break remaining ties structurally against a decided
//!    partner summation, first by co-occurrence with the shared output
//!    variable, then by the positional order of the table's scans.
//! 3. **FORCE**: pick the candidate with the most factor overlap and accept
//!    unconditionally. This can only cause a *missed* match, never a wrong
//!    `EQ`, since the compiled formula still checks full equality.

use std::cmp::Ordering;

use tracing::debug;
use uveq_ast::ordering::compare_var;
use uveq_ast::traversal::{free_vars, substitute_var};
use uveq_ast::{Context, Symbol, TermId, UTerm, VarGen, VarId};

use crate::analysis::{product_factors, var_tables};
use crate::error::MatchError;
use crate::normalize::normalize;

/// Which input expression a summation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A top-level summation tagged with its side.
#[derive(Debug, Clone, Copy)]
pub struct SumSlot {
    pub side: Side,
    pub term: TermId,
}

/// Outcome of a successful alignment.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The fresh common tuple variable every summation now binds.
    pub common: VarId,
    /// Its source relation.
    pub table: Symbol,
    /// The input slots with their `Sum` terms rewritten (input order kept).
    pub rewritten: Vec<SumSlot>,
}

/// Align all summations on one common tuple.
///
/// Precondition: the two sides' summations scan at least one relation in
/// common; calling this on disjoint-schema summations is a programming error
/// (`debug_assert!` + [`MatchError::DisjointSchemas`]).
pub fn align_common_tuple(
    ctx: &mut Context,
    slots: &[SumSlot],
    output: VarId,
    gen: &mut VarGen,
) -> Result<MatchResult, MatchError> {
    if slots.is_empty() {
        return Err(MatchError::Unaligned);
    }

    // Candidate tables: scanned by some bound variable of every summation.
    let per_slot_tables: Vec<Vec<Symbol>> = slots
        .iter()
        .map(|slot| bound_var_tables(ctx, *slot).into_iter().map(|(_, t)| t).collect())
        .collect();

    let mut left_tables: Vec<Symbol> = Vec::new();
    let mut right_tables: Vec<Symbol> = Vec::new();
    for (slot, tables) in slots.iter().zip(&per_slot_tables) {
        match slot.side {
            Side::Left => left_tables.extend(tables),
            Side::Right => right_tables.extend(tables),
        }
    }
    let shared_exists = left_tables.is_empty()
        || right_tables.is_empty()
        || left_tables.iter().any(|t| right_tables.contains(t));
    if !shared_exists {
        debug_assert!(false, "matcher invoked on disjoint-schema summations");
        return Err(MatchError::DisjointSchemas);
    }

    let mut candidates: Vec<Symbol> = per_slot_tables
        .first()
        .map(|ts| ts.clone())
        .unwrap_or_default();
    candidates.retain(|t| per_slot_tables.iter().all(|ts| ts.contains(t)));
    candidates.sort_by(|&a, &b| ctx.sym_name(a).cmp(ctx.sym_name(b)));
    candidates.dedup();
    if candidates.is_empty() {
        return Err(MatchError::Unaligned);
    }

    let common = gen.fresh(ctx, "c");

    // DIFF then PATTERN, per candidate.
    for &table in &candidates {
        let mut decided: Vec<Option<VarId>> = vec![None; slots.len()];
        run_diff(ctx, slots, table, common, &mut decided);
        if decided.iter().all(Option::is_some) {
            return Ok(finish(ctx, slots, table, common, &decided));
        }
        run_pattern(ctx, slots, table, output, &mut decided);
        run_diff(ctx, slots, table, common, &mut decided);
        if decided.iter().all(Option::is_some) {
            return Ok(finish(ctx, slots, table, common, &decided));
        }
    }

    // FORCE on the first candidate: always completes.
    let table = candidates[0];
    let mut decided: Vec<Option<VarId>> = vec![None; slots.len()];
    run_diff(ctx, slots, table, common, &mut decided);
    run_pattern(ctx, slots, table, output, &mut decided);
    for i in 0..slots.len() {
        if decided[i].is_some() {
            continue;
        }
        let cands = candidate_vars(ctx, slots[i], table);
        let choice = force_decide(ctx, slots, i, &cands, table, common, &decided);
        debug!(slot = i, var = %ctx.display_var(choice), "FORCE-mode decision");
        decided[i] = Some(choice);
    }
    Ok(finish(ctx, slots, table, common, &decided))
}

// ----------------------------------------------------------------------
// DIFF mode
// ----------------------------------------------------------------------

fn run_diff(
    ctx: &mut Context,
    slots: &[SumSlot],
    table: Symbol,
    common: VarId,
    decided: &mut [Option<VarId>],
) {
    loop {
        let mut progress = false;
        for i in 0..slots.len() {
            if decided[i].is_some() {
                continue;
            }
            let cands = candidate_vars(ctx, slots[i], table);
            if cands.is_empty() {
                continue;
            }
            if cands.len() == 1 {
                decided[i] = Some(cands[0]);
                progress = true;
                continue;
            }
            let baseline = opposite_baseline(ctx, slots, slots[i].side, decided, common);
            let mut scored: Vec<(usize, VarId)> = cands
                .iter()
                .map(|&v| {
                    let sig = signature(ctx, slots[i], v, common);
                    (multiset_difference(&sig, &baseline), v)
                })
                .collect();
            scored.sort_by(|a, b| a.0.cmp(&b.0));
            let best = scored[0].0;
            let tied = scored.iter().filter(|(s, _)| *s == best).count();
            if tied == 1 {
                decided[i] = Some(scored[0].1);
                progress = true;
            }
            // Tie: defer to a later round.
        }
        if !progress {
            break;
        }
    }
}

// ----------------------------------------------------------------------
// PATTERN mode
// ----------------------------------------------------------------------

fn run_pattern(
    ctx: &mut Context,
    slots: &[SumSlot],
    table: Symbol,
    output: VarId,
    decided: &mut [Option<VarId>],
) {
    for i in 0..slots.len() {
        if decided[i].is_some() {
            continue;
        }
        let cands = candidate_vars(ctx, slots[i], table);
        if cands.len() < 2 {
            continue;
        }
        // Partner: a decided summation on the opposite side.
        let partner = slots.iter().enumerate().find_map(|(j, s)| {
            if s.side == slots[i].side.opposite() {
                decided[j].map(|v| (*s, v))
            } else {
                None
            }
        });
        let Some((partner_slot, partner_var)) = partner else {
            continue;
        };

        // First: attribute-projection co-occurrence with the output tuple.
        if co_occurs_with(ctx, partner_slot, partner_var, output) {
            let with_output: Vec<VarId> = cands
                .iter()
                .copied()
                .filter(|&v| co_occurs_with(ctx, slots[i], v, output))
                .collect();
            if with_output.len() == 1 {
                decided[i] = Some(with_output[0]);
                continue;
            }
        }

        // Then: positional correspondence of the table's scans.
        let partner_pos = table_scan_position(ctx, partner_slot, table, partner_var);
        if let Some(pos) = partner_pos {
            let scans = table_scans(ctx, slots[i], table);
            if let Some(&v) = scans.get(pos) {
                if cands.contains(&v) {
                    decided[i] = Some(v);
                }
            }
        }
    }
}

// ----------------------------------------------------------------------
// FORCE mode
// ----------------------------------------------------------------------

fn force_decide(
    ctx: &mut Context,
    slots: &[SumSlot],
    slot_idx: usize,
    cands: &[VarId],
    _table: Symbol,
    common: VarId,
    decided: &[Option<VarId>],
) -> VarId {
    // Baseline over *all* decided summations; overlap, not difference.
    let mut baseline: Vec<TermId> = Vec::new();
    for (j, slot) in slots.iter().enumerate() {
        if let Some(v) = decided[j] {
            baseline.extend(signature(ctx, *slot, v, common));
        }
    }
    baseline.sort_unstable();

    let mut best: Option<(usize, VarId)> = None;
    for &v in cands {
        let sig = signature(ctx, slots[slot_idx], v, common);
        let overlap = sig.len() - multiset_difference(&sig, &baseline);
        let better = match best {
            None => true,
            Some((score, prev)) => {
                overlap > score
                    || (overlap == score && compare_var(ctx, v, prev) == Ordering::Less)
            }
        };
        if better {
            best = Some((overlap, v));
        }
    }
    best.map(|(_, v)| v).unwrap_or(cands[0])
}

// ----------------------------------------------------------------------
// Shared helpers
// ----------------------------------------------------------------------

fn slot_parts(ctx: &Context, slot: SumSlot) -> (Vec<VarId>, TermId) {
    match ctx.get(slot.term) {
        UTerm::Sum { bound, body } => (bound.clone(), *body),
        // A non-summation slot has nothing to align; treat it as an empty
        // binder over itself.
        _ => (Vec::new(), slot.term),
    }
}

fn body_factors(ctx: &Context, body: TermId) -> Vec<TermId> {
    match ctx.get(body) {
        UTerm::Squash(inner) => product_factors(ctx, *inner).to_vec(),
        _ => product_factors(ctx, body).to_vec(),
    }
}

/// Bound variables of the slot together with the relation each one scans.
fn bound_var_tables(ctx: &Context, slot: SumSlot) -> Vec<(VarId, Symbol)> {
    let (bound, body) = slot_parts(ctx, slot);
    let tables = var_tables(ctx, body);
    bound
        .iter()
        .filter_map(|v| tables.get(v).map(|&t| (*v, t)))
        .collect()
}

/// Bound variables of the slot scanning `table`, in structural order.
fn candidate_vars(ctx: &Context, slot: SumSlot, table: Symbol) -> Vec<VarId> {
    let mut vars: Vec<VarId> = bound_var_tables(ctx, slot)
        .into_iter()
        .filter(|(_, t)| *t == table)
        .map(|(v, _)| v)
        .collect();
    vars.sort_by(|&a, &b| compare_var(ctx, a, b));
    vars
}

/// Multiset of the slot's immediate factors that use `var`, with `var`
/// renamed to `common` and normalized: the unit of structural comparison
/// across sides.
fn signature(ctx: &mut Context, slot: SumSlot, var: VarId, common: VarId) -> Vec<TermId> {
    let (_, body) = slot_parts(ctx, slot);
    let mut sig: Vec<TermId> = Vec::new();
    for factor in body_factors(ctx, body) {
        if !free_vars(ctx, factor).contains(&var) {
            continue;
        }
        let renamed = substitute_var(ctx, factor, var, common);
        sig.push(normalize(ctx, renamed));
    }
    sig.sort_unstable();
    sig
}

/// Combined signature of every decided summation on the opposite side.
fn opposite_baseline(
    ctx: &mut Context,
    slots: &[SumSlot],
    side: Side,
    decided: &[Option<VarId>],
    common: VarId,
) -> Vec<TermId> {
    let mut baseline: Vec<TermId> = Vec::new();
    for (j, slot) in slots.iter().enumerate() {
        if slot.side != side.opposite() {
            continue;
        }
        if let Some(v) = decided[j] {
            baseline.extend(signature(ctx, *slot, v, common));
        }
    }
    baseline.sort_unstable();
    baseline
}

/// Number of elements of sorted multiset `a` unmatched in sorted multiset `b`.
fn multiset_difference(a: &[TermId], b: &[TermId]) -> usize {
    let mut unmatched = 0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                unmatched += 1;
                i += 1;
            }
            Ordering::Greater => {
                j += 1;
            }
        }
    }
    unmatched + (a.len() - i)
}

/// Whether some factor mentions both `var` and the output tuple.
fn co_occurs_with(ctx: &Context, slot: SumSlot, var: VarId, output: VarId) -> bool {
    let (_, body) = slot_parts(ctx, slot);
    let out_base = ctx.base_of(output);
    body_factors(ctx, body).iter().any(|&f| {
        let free = free_vars(ctx, f);
        free.contains(&var) && free.contains(&out_base)
    })
}

/// The base variables scanning `table`, in the body's factor order.
fn table_scans(ctx: &Context, slot: SumSlot, table: Symbol) -> Vec<VarId> {
    let (_, body) = slot_parts(ctx, slot);
    body_factors(ctx, body)
        .iter()
        .filter_map(|&f| match ctx.get(f) {
            UTerm::Table { name, var } if *name == table => Some(ctx.base_of(*var)),
            _ => None,
        })
        .collect()
}

fn table_scan_position(
    ctx: &Context,
    slot: SumSlot,
    table: Symbol,
    var: VarId,
) -> Option<usize> {
    table_scans(ctx, slot, table).iter().position(|&v| v == var)
}

/// Rewrite every slot to bind the common tuple in place of its decision.
fn finish(
    ctx: &mut Context,
    slots: &[SumSlot],
    table: Symbol,
    common: VarId,
    decided: &[Option<VarId>],
) -> MatchResult {
    let mut rewritten = Vec::with_capacity(slots.len());
    for (slot, choice) in slots.iter().zip(decided) {
        let term = match choice {
            Some(v) => inject_common_tuple(ctx, *slot, *v, common),
            None => slot.term,
        };
        rewritten.push(SumSlot {
            side: slot.side,
            term,
        });
    }
    MatchResult {
        common,
        table,
        rewritten,
    }
}

/// Alpha-rename one bound variable of a summation to the common tuple.
pub fn inject_common_tuple(
    ctx: &mut Context,
    slot: SumSlot,
    var: VarId,
    common: VarId,
) -> TermId {
    let (bound, body) = slot_parts(ctx, slot);
    if !bound.contains(&var) {
        return slot.term;
    }
    let new_body = substitute_var(ctx, body, var, common);
    let new_body = normalize(ctx, new_body);
    let mut new_bound: Vec<VarId> = bound.into_iter().filter(|&v| v != var).collect();
    new_bound.push(common);
    ctx.sum(new_bound, new_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_over(ctx: &mut Context, table: &str, var: &str, extra: Option<TermId>) -> TermId {
        let v = ctx.base(var);
        let t = ctx.table(table, v);
        let body = match extra {
            Some(e) => ctx.mul_of(vec![t, e]),
            None => t,
        };
        ctx.sum(vec![v], body)
    }

    #[test]
    fn single_candidate_per_slot_aligns_directly() {
        let mut ctx = Context::new();
        let out = ctx.base("x9");
        let l = sum_over(&mut ctx, "t0", "x0", None);
        let r = sum_over(&mut ctx, "t0", "x1", None);
        let slots = [
            SumSlot { side: Side::Left, term: l },
            SumSlot { side: Side::Right, term: r },
        ];
        let mut gen = VarGen::new();
        let res = align_common_tuple(&mut ctx, &slots, out, &mut gen).unwrap();
        assert_eq!(ctx.sym_name(res.table), "t0");
        // Both sides now bind the same variable over the same body.
        assert_eq!(res.rewritten[0].term, res.rewritten[1].term);
    }

    #[test]
    fn diff_mode_picks_the_similar_variable() {
        let mut ctx = Context::new();
        let out = ctx.base("x9");
        // Left: ∑x0(t0(x0) · [a0(x0) = 1]), one candidate, decides first.
        let a_of = |ctx: &mut Context, v: VarId| {
            let p = ctx.proj("a0", v);
            let pv = ctx.scalar(p);
            let one = ctx.num(1);
            ctx.eq(pv, one)
        };
        let x0 = ctx.base("x0");
        let t_l = ctx.table("t0", x0);
        let p_l = a_of(&mut ctx, x0);
        let body_l = ctx.mul_of(vec![t_l, p_l]);
        let l = ctx.sum(vec![x0], body_l);

        // Right: ∑x1,x2(t0(x1) · t0(x2) · [a0(x1) = 1]); x1 matches by DIFF.
        let x1 = ctx.base("x1");
        let x2 = ctx.base("x2");
        let t1 = ctx.table("t0", x1);
        let t2 = ctx.table("t0", x2);
        let p_r = a_of(&mut ctx, x1);
        let body_r = ctx.mul_of(vec![t1, t2, p_r]);
        let r = ctx.sum(vec![x1, x2], body_r);

        let slots = [
            SumSlot { side: Side::Left, term: l },
            SumSlot { side: Side::Right, term: r },
        ];
        let mut gen = VarGen::new();
        let res = align_common_tuple(&mut ctx, &slots, out, &mut gen).unwrap();
        // The right side must keep x2 bound and rename x1.
        match ctx.get(res.rewritten[1].term) {
            UTerm::Sum { bound, .. } => {
                assert!(bound.contains(&x2));
                assert!(bound.contains(&res.common));
                assert!(!bound.contains(&x1));
            }
            other => panic!("expected summation, got {:?}", other),
        }
    }

    #[test]
    fn pattern_mode_breaks_ties_by_output_co_occurrence() {
        let mut ctx = Context::new();
        let out = ctx.base("x9");
        let attr_eq = |ctx: &mut Context, attr: &str, v: VarId, c: i64| {
            let p = ctx.proj(attr, v);
            let pv = ctx.scalar(p);
            let lit = ctx.num(c);
            ctx.eq(pv, lit)
        };
        let out_link = |ctx: &mut Context, v: VarId, out: VarId| {
            let p = ctx.proj("a0", v);
            let pv = ctx.scalar(p);
            let q = ctx.proj("a0", out);
            let qv = ctx.scalar(q);
            ctx.eq(pv, qv)
        };

        // Left: ∑x0(t0(x0) · [b0(x0)=1] · [b1(x0)=2] · [a0(x0)=a0(out)]),
        // single candidate, decides first and fixes the baseline.
        let x0 = ctx.base("x0");
        let t_l = ctx.table("t0", x0);
        let p1_l = attr_eq(&mut ctx, "b0", x0, 1);
        let p2_l = attr_eq(&mut ctx, "b1", x0, 2);
        let o_l = out_link(&mut ctx, x0, out);
        let body_l = ctx.mul_of(vec![t_l, p1_l, p2_l, o_l]);
        let l = ctx.sum(vec![x0], body_l);

        // Right: x1 and x2 both miss the baseline by exactly one factor, so
        // DIFF ties; only x2 shares a factor with the output tuple. x1 has
        // the larger factor overlap, so an overlap-greedy choice would take
        // it instead.
        let x1 = ctx.base("x1");
        let x2 = ctx.base("x2");
        let t1 = ctx.table("t0", x1);
        let t2 = ctx.table("t0", x2);
        let p1_r = attr_eq(&mut ctx, "b0", x1, 1);
        let p2_r = attr_eq(&mut ctx, "b1", x1, 2);
        let w_r = attr_eq(&mut ctx, "b2", x1, 3);
        let o_r = out_link(&mut ctx, x2, out);
        let s_r = attr_eq(&mut ctx, "b3", x2, 4);
        let body_r = ctx.mul_of(vec![t1, t2, p1_r, p2_r, w_r, o_r, s_r]);
        let r = ctx.sum(vec![x1, x2], body_r);

        let slots = [
            SumSlot { side: Side::Left, term: l },
            SumSlot { side: Side::Right, term: r },
        ];
        let mut gen = VarGen::new();
        let res = align_common_tuple(&mut ctx, &slots, out, &mut gen).unwrap();
        match ctx.get(res.rewritten[1].term) {
            UTerm::Sum { bound, .. } => {
                assert!(bound.contains(&x1));
                assert!(bound.contains(&res.common));
                assert!(!bound.contains(&x2));
            }
            other => panic!("expected summation, got {:?}", other),
        }
    }

    #[test]
    fn force_mode_aligns_unlinked_summations() {
        let mut ctx = Context::new();
        let out = ctx.base("x9");
        // Both sides: ∑{x0,x1}(t0(x0)·t0(x1)), fully symmetric, every
        // score ties, FORCE must still decide.
        let mk = |ctx: &mut Context, va: &str, vb: &str| {
            let a = ctx.base(va);
            let b = ctx.base(vb);
            let ta = ctx.table("t0", a);
            let tb = ctx.table("t0", b);
            let body = ctx.mul_of(vec![ta, tb]);
            ctx.sum(vec![a, b], body)
        };
        let l = mk(&mut ctx, "x0", "x1");
        let r = mk(&mut ctx, "x2", "x3");
        let slots = [
            SumSlot { side: Side::Left, term: l },
            SumSlot { side: Side::Right, term: r },
        ];
        let mut gen = VarGen::new();
        let res = align_common_tuple(&mut ctx, &slots, out, &mut gen).unwrap();
        for slot in &res.rewritten {
            match ctx.get(slot.term) {
                UTerm::Sum { bound, .. } => assert!(bound.contains(&res.common)),
                other => panic!("expected summation, got {:?}", other),
            }
        }
    }

    #[test]
    fn injected_variable_keeps_the_source_table() {
        let mut ctx = Context::new();
        let out = ctx.base("x9");
        let l = sum_over(&mut ctx, "t0", "x0", None);
        let r = sum_over(&mut ctx, "t0", "x1", None);
        let slots = [
            SumSlot { side: Side::Left, term: l },
            SumSlot { side: Side::Right, term: r },
        ];
        let mut gen = VarGen::new();
        let res = align_common_tuple(&mut ctx, &slots, out, &mut gen).unwrap();
        for slot in &res.rewritten {
            let tables = var_tables(&ctx, slot.term);
            assert_eq!(tables.get(&res.common), Some(&res.table));
        }
    }
}
