//! Chain-work arithmetic.

use splitchain_types::{ChainIndexView, CompactTarget, ConsensusParams, U256};

/// Expected number of hashes needed to find a block at `bits`.
///
/// This is `floor(2^256 / (target + 1))`, computed as
/// `(!target / (target + 1)) + 1` so it stays within 256 bits. Returns zero
/// for a target that does not decode to a usable value.
pub fn block_proof(bits: CompactTarget) -> U256 {
    let decoded = bits.decode();
    if !decoded.is_valid() {
        return U256::zero();
    }
    let target = decoded.value;
    if target == U256::max_value() {
        return U256::one();
    }
    (!target / (target + U256::one())) + U256::one()
}

/// Seconds of mining at `tip`'s difficulty equivalent to the work between
/// `from` and `to`.
///
/// Negative when `from` has more work than `to`. Saturates to `±i64::MAX`
/// when the result does not fit.
pub fn block_proof_equivalent_time<B: ChainIndexView>(
    to: &B,
    from: &B,
    tip: &B,
    params: &ConsensusParams,
) -> i64 {
    let (delta, sign) = if to.chain_work() > from.chain_work() {
        (to.chain_work() - from.chain_work(), 1)
    } else {
        (from.chain_work() - to.chain_work(), -1)
    };

    let tip_proof = block_proof(tip.bits());
    let spacing = U256::from(params.pow_target_spacing.max(0) as u64);
    let Some(scaled) = delta.checked_mul(spacing) else {
        return sign * i64::MAX;
    };
    if tip_proof.is_zero() {
        return sign * i64::MAX;
    }

    let result = scaled / tip_proof;
    if result.bits() > 63 {
        return sign * i64::MAX;
    }
    sign * result.low_u64() as i64
}
