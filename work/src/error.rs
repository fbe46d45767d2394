use splitchain_types::{BlockHash, CompactTarget};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("target {bits} has the sign bit set")]
    NegativeTarget { bits: CompactTarget },

    #[error("target {bits} overflows 256 bits")]
    TargetOverflow { bits: CompactTarget },

    #[error("target {bits} is zero")]
    ZeroTarget { bits: CompactTarget },

    #[error("target {bits} is easier than the proof-of-work limit")]
    AboveLimit { bits: CompactTarget },

    #[error("hash {hash} does not meet target {bits}")]
    HashAboveTarget { hash: BlockHash, bits: CompactTarget },
}
