#![no_main]

use libfuzzer_sys::fuzz_target;
use splitchain_types::CompactTarget;

fuzz_target!(|bits: u32| {
    let decoded = CompactTarget::new(bits).decode();

    // Re-encoding a usable target must decode to the same value.
    if !decoded.negative && !decoded.overflow {
        let again = CompactTarget::from_target(&decoded.value).decode();
        assert_eq!(again.value, decoded.value);
        assert!(!again.negative);
        assert!(!again.overflow);
    }
});
