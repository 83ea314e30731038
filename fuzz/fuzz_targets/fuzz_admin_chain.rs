#![no_main]

use libfuzzer_sys::fuzz_target;
use veil_groups::v2::AdministratorsChain;
use veil_types::Uid;

// Decoding and verifying an untrusted administrators chain must never panic.
fuzz_target!(|data: &[u8]| {
    let Ok(chain) = AdministratorsChain::decode(data) else {
        return;
    };

    // A decoded chain re-encodes to something that decodes to the same chain.
    if let Ok(encoded) = chain.encode() {
        let again = AdministratorsChain::decode(&encoded);
        assert_eq!(again.ok().as_ref(), Some(&chain), "re-encoded chain must decode");
    }

    let claimed = chain.genesis_uid().unwrap_or(Uid::ZERO);
    if let Ok(verified) = chain.clone().verify(&claimed) {
        assert!(!verified.administrators().is_empty());
        assert!(verified.is_prefixed_by(&chain));
    }
});
