//! Top-level error type for the consensus types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("retarget schedule is empty")]
    EmptySchedule,

    #[error("retarget schedule breakpoint {index} is out of order: {reason}")]
    UnorderedSchedule { index: usize, reason: &'static str },

    #[error("retarget schedule multiple must be positive, got {0}")]
    NonPositiveMultiple(i64),
}
