#![no_main]

use libfuzzer_sys::fuzz_target;
use splitchain_types::{BlockHash, CompactTarget, ConsensusParams};

fuzz_target!(|input: ([u8; 32], u32, bool)| {
    let (hash, bits, quiet) = input;
    let hash = BlockHash::new(hash);
    let bits = CompactTarget::new(bits);

    for params in [ConsensusParams::main(), ConsensusParams::regtest()] {
        // Must never panic, and acceptance implies a valid in-range target.
        let ok = splitchain_work::check_proof_of_work(&hash, bits, &params, quiet);
        if ok {
            let target = bits.decode();
            assert!(target.is_valid());
            assert!(target.value <= params.pow_limit);
            assert!(hash.to_u256() <= target.value);
        }
    }
});
