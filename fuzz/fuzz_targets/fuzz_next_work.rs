#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use splitchain_types::{BlockHash, BlockIndex, CompactTarget, ConsensusParams, U256};

#[derive(Debug, Arbitrary)]
struct Window {
    fork_height: u8,
    force_retarget: bool,
    start_bits: u32,
    /// Seconds between consecutive blocks; may be negative.
    gaps: Vec<i16>,
    candidate_gap: i16,
}

fuzz_target!(|w: Window| {
    let params = ConsensusParams::main()
        .with_fork_height(u32::from(w.fork_height))
        .with_force_retarget(w.force_retarget);

    let mut tip = Arc::new(BlockIndex::genesis(
        BlockHash::ZERO,
        1_600_000_000,
        CompactTarget::new(w.start_bits),
        U256::zero(),
    ));
    for gap in w.gaps.iter().take(512) {
        let bits = splitchain_work::next_work_required(Some(&*tip), tip.time, &params);
        let time = tip.time + i64::from(*gap);
        tip = Arc::new(BlockIndex::child(&tip, BlockHash::ZERO, time, bits, U256::zero()));
    }

    // Never panics, never exceeds the limit once the chain has retargeted.
    let candidate = tip.time + i64::from(w.candidate_gap);
    let bits = splitchain_work::next_work_required(Some(&*tip), candidate, &params);
    let decoded = bits.decode();
    if bits != tip.bits {
        assert!(!decoded.negative);
        assert!(decoded.value <= params.pow_limit);
    }
});
