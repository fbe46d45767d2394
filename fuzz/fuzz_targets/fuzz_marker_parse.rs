#![no_main]

use libfuzzer_sys::fuzz_target;
use splitchain_fork::{ActivationMarker, ConfFile};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = ConfFile::parse(text);

    // A marker that parses must survive a write/read cycle.
    if let Ok(marker) = ActivationMarker::parse(text) {
        let reparsed = ActivationMarker::parse(&marker.to_conf_string())
            .expect("serialized marker parses");
        assert_eq!(reparsed.fork_height, marker.fork_height);
        assert_eq!(reparsed.fork_id, marker.fork_id);
        assert_eq!(reparsed.auto_backup_block, marker.auto_backup_block);
    }
});
