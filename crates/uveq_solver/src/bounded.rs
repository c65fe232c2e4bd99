//! Bounded model search over ground formulas.
//!
//! Enumerates assignments of every named variable over a small integer
//! domain, with uninterpreted applications given one fixed hash-derived
//! interpretation (congruent by construction). Finding a satisfying
//! assignment is a genuine model, so `Sat` answers are sound; exhausting the
//! domain proves nothing, so the negative answer is always `Unknown`, as is
//! any formula containing a star construct.
//!
//! This is the in-tree oracle for refutations and tests; an SMT-backed
//! [`LiaStarSolver`] replaces it for real workloads.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::debug;
use uveq_lia::{CmpOp, LFormula, LTerm};

use crate::backend::{LiaStarSolver, SolverOutcome};
use crate::config::SolverConfig;

const DOMAIN: [i64; 5] = [0, 1, 2, 3, -1];
const MAX_VARS: usize = 10;

#[derive(Debug, Default)]
pub struct BoundedSearchSolver;

impl BoundedSearchSolver {
    pub fn new() -> Self {
        BoundedSearchSolver
    }
}

impl LiaStarSolver for BoundedSearchSolver {
    fn check(&mut self, formula: &LFormula, config: &SolverConfig) -> SolverOutcome {
        if formula.has_sum() {
            return SolverOutcome::Unknown;
        }
        match formula {
            LFormula::True => return SolverOutcome::Sat,
            LFormula::False => return SolverOutcome::Unsat,
            _ => {}
        }

        let mut vars = Vec::new();
        collect_vars(formula, &mut vars);
        vars.sort();
        vars.dedup();
        if vars.len() > MAX_VARS {
            debug!(vars = vars.len(), "formula too wide for bounded search");
            return SolverOutcome::Unknown;
        }

        let start = Instant::now();
        let mut choice = vec![0usize; vars.len()];
        loop {
            if start.elapsed().as_millis() as u64 > config.timeout_ms {
                return SolverOutcome::Unknown;
            }
            let env: FxHashMap<&str, i64> = vars
                .iter()
                .zip(&choice)
                .map(|(v, &c)| (v.as_str(), DOMAIN[c]))
                .collect();
            if eval_formula(formula, &env, config.random_seed) {
                debug!("bounded search found a model");
                return SolverOutcome::Sat;
            }
            let mut i = 0;
            loop {
                if i == choice.len() {
                    return SolverOutcome::Unknown;
                }
                choice[i] += 1;
                if choice[i] < DOMAIN.len() {
                    break;
                }
                choice[i] = 0;
                i += 1;
            }
        }
    }
}

fn collect_vars(f: &LFormula, out: &mut Vec<String>) {
    match f {
        LFormula::True | LFormula::False => {}
        LFormula::Cmp(_, a, b) => {
            collect_term_vars(a, out);
            collect_term_vars(b, out);
        }
        LFormula::And(fs) | LFormula::Or(fs) => {
            for f in fs {
                collect_vars(f, out);
            }
        }
        LFormula::Not(inner) => collect_vars(inner, out),
        // Unreachable behind the has_sum guard; collected anyway so the
        // function stands alone.
        LFormula::Sum {
            outer,
            body,
            constraint,
            ..
        } => {
            for t in outer.iter().chain(body) {
                collect_term_vars(t, out);
            }
            collect_vars(constraint, out);
        }
    }
}

fn collect_term_vars(t: &LTerm, out: &mut Vec<String>) {
    match t {
        LTerm::Const(_) => {}
        LTerm::Var(v) => out.push(v.clone()),
        LTerm::Add(ts) | LTerm::Mul(ts) | LTerm::App(_, ts) => {
            for t in ts {
                collect_term_vars(t, out);
            }
        }
        LTerm::Ite(c, a, b) => {
            collect_vars(c, out);
            collect_term_vars(a, out);
            collect_term_vars(b, out);
        }
    }
}

fn eval_formula(f: &LFormula, env: &FxHashMap<&str, i64>, seed: u64) -> bool {
    match f {
        LFormula::True => true,
        LFormula::False => false,
        LFormula::Cmp(op, a, b) => {
            let a = eval_term(a, env, seed);
            let b = eval_term(b, env, seed);
            match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Le => a <= b,
                CmpOp::Lt => a < b,
                CmpOp::Ge => a >= b,
                CmpOp::Gt => a > b,
            }
        }
        LFormula::And(fs) => fs.iter().all(|f| eval_formula(f, env, seed)),
        LFormula::Or(fs) => fs.iter().any(|f| eval_formula(f, env, seed)),
        LFormula::Not(inner) => !eval_formula(inner, env, seed),
        LFormula::Sum { .. } => false,
    }
}

fn eval_term(t: &LTerm, env: &FxHashMap<&str, i64>, seed: u64) -> i64 {
    match t {
        LTerm::Const(c) => *c,
        LTerm::Var(v) => env.get(v.as_str()).copied().unwrap_or(0),
        LTerm::Add(ts) => ts.iter().map(|t| eval_term(t, env, seed)).sum(),
        LTerm::Mul(ts) => ts.iter().map(|t| eval_term(t, env, seed)).product(),
        LTerm::Ite(c, a, b) => {
            if eval_formula(c, env, seed) {
                eval_term(a, env, seed)
            } else {
                eval_term(b, env, seed)
            }
        }
        LTerm::App(name, args) => {
            // One fixed interpretation, nonnegative and small so the usual
            // 0 <= f <= 1 side constraints are satisfiable.
            let mut h = DefaultHasher::new();
            seed.hash(&mut h);
            name.hash(&mut h);
            for arg in args {
                eval_term(arg, env, seed).hash(&mut h);
            }
            (h.finish() % 2) as i64
        }
    }
}
