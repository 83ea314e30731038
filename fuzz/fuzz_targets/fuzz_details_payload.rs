#![no_main]

use libfuzzer_sys::fuzz_target;
use veil_details::{decode_payload, same_payload, GroupDetails, IdentityDetails};

// Detail payloads arrive from other users; parsing them must never panic.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = decode_payload::<IdentityDetails>(text);
    let _ = decode_payload::<GroupDetails>(text);

    // Structural equality is reflexive for anything that parses.
    if let Ok(same) = same_payload(text, text) {
        assert!(same);
    }
});
