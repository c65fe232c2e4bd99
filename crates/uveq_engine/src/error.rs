use thiserror::Error;

/// Failures of the bound-variable matcher.
///
/// `DisjointSchemas` is a structural precondition violation (the caller must
/// not align summations that share no source table); it additionally
/// `debug_assert!`s at the detection site. `Unaligned` is an ordinary "no
/// match found" outcome and maps to `UNKNOWN` upstream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("summations share no source table")]
    DisjointSchemas,
    #[error("no common-tuple candidate aligned every summation")]
    Unaligned,
}
