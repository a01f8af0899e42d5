//! Fuzz target: `StaCredentials::from_raw`
//!
//! Splits the input into the fixed-size SSID and password fields of a
//! station config, the way the event bridge receives them.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Decoded fields never contain a NUL and fit their capacity
//! - `Debug` output never shows a non-empty password
//!
//! cargo fuzz run fuzz_sta_credentials

#![no_main]

use libfuzzer_sys::fuzz_target;
use kaivac::events::StaCredentials;

fuzz_target!(|data: &[u8]| {
    let split = data.len().min(32);
    let (ssid, password) = data.split_at(split);

    if let Ok(creds) = StaCredentials::from_raw(ssid, password) {
        assert!(!creds.ssid.contains('\0'));
        assert!(!creds.password.contains('\0'));
        assert!(creds.ssid.len() <= 32);
        assert!(creds.password.len() <= 64);

        let shown = format!("{:?}", creds);
        assert!(shown.contains("<redacted>"));
    }
});
