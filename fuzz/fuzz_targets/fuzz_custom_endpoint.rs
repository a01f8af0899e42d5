//! Fuzz target: `handle_custom_data`
//!
//! The first four bytes pick the session id; the rest is the payload.
//! An empty payload also exercises the absent-input path.
//!
//! Invariants checked:
//! - No panics for any payload, including invalid UTF-8
//! - The reply is always the NUL-terminated acknowledgment
//!
//! cargo fuzz run fuzz_custom_endpoint

#![no_main]

use libfuzzer_sys::fuzz_target;
use kaivac::app::endpoint::{ENDPOINT_RESPONSE, handle_custom_data};

fuzz_target!(|data: &[u8]| {
    let (session, payload) = if data.len() >= 4 {
        let (head, rest) = data.split_at(4);
        (u32::from_le_bytes([head[0], head[1], head[2], head[3]]), Some(rest))
    } else {
        (0, None)
    };

    let reply = handle_custom_data(session, payload).expect("allocation of 8 bytes");
    assert_eq!(reply.len(), ENDPOINT_RESPONSE.len() + 1);
    assert_eq!(&reply[..ENDPOINT_RESPONSE.len()], ENDPOINT_RESPONSE.as_bytes());
    assert_eq!(reply.last(), Some(&0));
});
