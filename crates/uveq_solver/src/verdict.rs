//! The four possible answers of an equivalence check.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of [`crate::Prover::prove_eq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The two plans agree on every database instance.
    Eq,
    /// A distinguishing instance exists.
    Neq,
    /// Neither proven nor refuted within the configured budget.
    Unknown,
    /// Rejected by a pre-check (mismatched output schema) before any
    /// pipeline work.
    FastRejected,
}

impl Verdict {
    /// Stable numeric code; external consumers rely on the exact values.
    pub fn code(self) -> i32 {
        match self {
            Verdict::Eq => 0,
            Verdict::Neq => -1,
            Verdict::Unknown => 1,
            Verdict::FastRejected => -2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Eq => "EQ",
            Verdict::Neq => "NEQ",
            Verdict::Unknown => "UNKNOWN",
            Verdict::FastRejected => "FAST_REJECTED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Verdict::Eq.code(), 0);
        assert_eq!(Verdict::Neq.code(), -1);
        assert_eq!(Verdict::Unknown.code(), 1);
        assert_eq!(Verdict::FastRejected.code(), -2);
    }
}
