//! Next-target computation.
//!
//! Before the fork the chain retargets every 2016 blocks over a two-week
//! window. From the fork on, the window follows the height-indexed schedule in
//! [`ConsensusParams`], starting at a single block and widening back to the
//! legacy timespan. The last pre-fork block gets a one-off reset that drops
//! difficulty by a fixed factor, independent of the schedule.
//!
//! All target arithmetic is 256-bit and saturates at the proof-of-work limit
//! instead of wrapping.

use splitchain_types::{ChainIndexView, CompactTarget, ConsensusParams, U256};

/// Legacy bound on how far one retarget may move the target.
const LEGACY_RETARGET_RATIO: i64 = 4;

/// Looser bound used while the post-fork window is only a few blocks wide.
const FAST_RETARGET_RATIO: i64 = 10;

/// Required compact target for the block after `last`.
///
/// `last` is `None` only when the candidate is the genesis block.
pub fn next_work_required<B: ChainIndexView>(
    last: Option<&B>,
    candidate_time: i64,
    params: &ConsensusParams,
) -> CompactTarget {
    let Some(last) = last else {
        return params.pow_limit_bits();
    };

    if params.is_within_retarget_period(last.height() + 1) {
        return fork_next_work_required(last, candidate_time, params);
    }

    let interval = params.difficulty_adjustment_interval();
    if (i64::from(last.height()) + 1) % interval != 0 {
        if params.min_difficulty_exception() {
            return min_difficulty_fallback(last, candidate_time, params, |_| interval);
        }
        return last.bits();
    }

    let first_height = last.height().saturating_sub((interval - 1) as u32);
    let Some(first) = last.ancestor(first_height) else {
        tracing::error!(
            height = first_height,
            "retarget window start missing from chain index"
        );
        return last.bits();
    };

    calculate_next_work_required(last, first.time(), params)
}

fn fork_next_work_required<B: ChainIndexView>(
    last: &B,
    candidate_time: i64,
    params: &ConsensusParams,
) -> CompactTarget {
    let height = last.height();
    let lookback = params.target_timespan_at(height) / params.pow_target_spacing;
    let first_height = (i64::from(height) - lookback).max(0) as u32;
    let Some(first) = last.ancestor(first_height) else {
        tracing::error!(
            height = first_height,
            "retarget window start missing from chain index"
        );
        return last.bits();
    };

    tracing::debug!(
        height,
        interval = params.adjustment_interval_at(height),
        timespan = params.target_timespan_at(height),
        "fork-aware next work"
    );

    if height + 1 == params.fork_height {
        return calculate_reset_work_required(last, first.time(), params);
    }

    let interval = params.adjustment_interval_at(height);
    if (i64::from(height) + 1) % interval != 0 {
        if params.min_difficulty_exception() {
            return min_difficulty_fallback(last, candidate_time, params, |h| {
                params.adjustment_interval_at(h)
            });
        }
        return last.bits();
    }

    calculate_fork_next_work_required(last, first.time(), params)
}

/// Testnet rule: after a long gap any block may use the limit; otherwise the
/// target is the last one not produced under that exception.
fn min_difficulty_fallback<B, F>(
    last: &B,
    candidate_time: i64,
    params: &ConsensusParams,
    interval_at: F,
) -> CompactTarget
where
    B: ChainIndexView,
    F: Fn(u32) -> i64,
{
    let limit = params.pow_limit_bits();
    if candidate_time > last.time() + params.pow_target_spacing * 2 {
        return limit;
    }

    let mut walk = last;
    while let Some(prev) = walk.previous() {
        let height = walk.height();
        if i64::from(height) % interval_at(height) == 0 || walk.bits() != limit {
            break;
        }
        walk = prev;
    }
    walk.bits()
}

/// Legacy retarget over a window that started at `first_block_time`.
pub fn calculate_next_work_required<B: ChainIndexView>(
    last: &B,
    first_block_time: i64,
    params: &ConsensusParams,
) -> CompactTarget {
    if params.retargeting_disabled() {
        return last.bits();
    }

    let target_timespan = params.pow_target_timespan;
    let observed = last.time() - first_block_time;
    let actual = clamp_timespan(observed, target_timespan, LEGACY_RETARGET_RATIO);

    retarget(last.bits(), actual, target_timespan, params, "legacy")
}

/// Post-fork retarget using the timespan scheduled for `last`'s height.
pub fn calculate_fork_next_work_required<B: ChainIndexView>(
    last: &B,
    first_block_time: i64,
    params: &ConsensusParams,
) -> CompactTarget {
    if params.retargeting_disabled() {
        return last.bits();
    }

    let observed = last.time() - first_block_time;
    // Two blocks sharing a timestamp would otherwise drive the target to zero.
    if observed == 0 {
        tracing::warn!(
            height = last.height(),
            "zero-length retarget window, using proof-of-work limit"
        );
        return params.pow_limit_bits();
    }

    let target_timespan = params.target_timespan_at(last.height());
    let ratio = if target_timespan >= params.pow_target_spacing * 3 {
        LEGACY_RETARGET_RATIO
    } else {
        FAST_RETARGET_RATIO
    };
    let actual = clamp_timespan(observed, target_timespan, ratio);

    retarget(last.bits(), actual, target_timespan, params, "fork")
}

/// One-off difficulty drop applied when computing the first post-fork target.
///
/// The target is scaled by `actual / (actual / drop_factor)` over the same
/// window the fork-aware path would use, without consulting the schedule.
pub fn calculate_reset_work_required<B: ChainIndexView>(
    last: &B,
    first_block_time: i64,
    params: &ConsensusParams,
) -> CompactTarget {
    let actual = last.time() - first_block_time;
    let dropped = actual / params.reset_drop_factor.max(1);
    if actual <= 0 || dropped <= 0 {
        tracing::warn!(
            height = last.height(),
            actual,
            "degenerate window at fork reset, using proof-of-work limit"
        );
        return params.pow_limit_bits();
    }

    let bits = retarget(last.bits(), actual, dropped, params, "reset");
    tracing::info!(
        height = last.height(),
        before = %last.bits(),
        after = %bits,
        "difficulty reset at fork boundary"
    );
    bits
}

fn clamp_timespan(observed: i64, target_timespan: i64, ratio: i64) -> i64 {
    let lower = (target_timespan / ratio).max(1);
    let upper = target_timespan.saturating_mul(ratio);
    observed.clamp(lower, upper)
}

/// `old * actual / divisor`, saturating at the limit.
fn retarget(
    old_bits: CompactTarget,
    actual: i64,
    divisor: i64,
    params: &ConsensusParams,
    kind: &'static str,
) -> CompactTarget {
    let old = old_bits.decode().value;
    let new = match scale_target(&old, actual as u64, divisor as u64) {
        Some(new) if new <= params.pow_limit => new,
        Some(_) => {
            tracing::debug!(kind, "retarget above limit, saturating");
            params.pow_limit
        }
        None => {
            tracing::debug!(kind, "retarget overflow, saturating");
            params.pow_limit
        }
    };
    let bits = CompactTarget::from_target(&new);

    tracing::debug!(
        kind,
        divisor,
        actual,
        before = %old_bits,
        after = %bits,
        "retarget"
    );
    bits
}

/// Exact `floor(target * numerator / denominator)` without a 512-bit product.
///
/// Divides first and folds the remainder back in, so the only products formed
/// are `(target / d) * n` (checked) and `(target % d) * n`, which fits because
/// both factors are below 2^64. Returns `None` on overflow.
fn scale_target(target: &U256, numerator: u64, denominator: u64) -> Option<U256> {
    if denominator == 0 {
        return None;
    }
    let n = U256::from(numerator);
    let d = U256::from(denominator);
    let (quotient, remainder) = target.div_mod(d);
    let high = quotient.checked_mul(n)?;
    let low = (remainder * n) / d;
    high.checked_add(low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_target_is_exact() {
        let t = U256::from(1_000_003u64);
        assert_eq!(scale_target(&t, 7, 7), Some(t));
        assert_eq!(scale_target(&t, 3, 2), Some(U256::from(1_500_004u64)));
        assert_eq!(scale_target(&t, 1, 3), Some(U256::from(333_334u64)));
    }

    #[test]
    fn scale_target_detects_overflow() {
        let big = U256::max_value() >> 1;
        assert_eq!(scale_target(&big, 4, 1), None);
        assert_eq!(scale_target(&big, 1, 0), None);
    }

    #[test]
    fn clamp_uses_ratio_bounds() {
        assert_eq!(clamp_timespan(1, 1_209_600, 4), 302_400);
        assert_eq!(clamp_timespan(10_000_000, 1_209_600, 4), 4_838_400);
        assert_eq!(clamp_timespan(-50, 600, 10), 60);
        assert_eq!(clamp_timespan(900, 600, 10), 900);
    }
}
