//! Proof-of-work validation.

use splitchain_types::{BlockHash, CompactTarget, ConsensusParams};

use crate::WorkError;

/// Check that `hash` satisfies the target encoded in `bits`.
///
/// The target must decode cleanly, be non-zero and not exceed the network's
/// proof-of-work limit.
pub fn verify_proof_of_work(
    hash: &BlockHash,
    bits: CompactTarget,
    params: &ConsensusParams,
) -> Result<(), WorkError> {
    let decoded = bits.decode();
    if decoded.negative {
        return Err(WorkError::NegativeTarget { bits });
    }
    if decoded.overflow {
        return Err(WorkError::TargetOverflow { bits });
    }
    if decoded.value.is_zero() {
        return Err(WorkError::ZeroTarget { bits });
    }
    if decoded.value > params.pow_limit {
        return Err(WorkError::AboveLimit { bits });
    }
    if hash.to_u256() > decoded.value {
        return Err(WorkError::HashAboveTarget { hash: *hash, bits });
    }
    Ok(())
}

/// Boolean form of [`verify_proof_of_work`].
///
/// Rejections are logged at `warn` unless `quiet` is set, which is used while
/// stress-testing retargeting with synthetic blocks.
pub fn check_proof_of_work(
    hash: &BlockHash,
    bits: CompactTarget,
    params: &ConsensusParams,
    quiet: bool,
) -> bool {
    match verify_proof_of_work(hash, bits, params) {
        Ok(()) => true,
        Err(err) => {
            if quiet {
                tracing::trace!(%hash, %bits, %err, "proof of work rejected");
            } else {
                tracing::warn!(%hash, %bits, %err, "proof of work rejected");
            }
            false
        }
    }
}
