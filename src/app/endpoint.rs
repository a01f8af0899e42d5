//! Application-defined provisioning endpoint.
//!
//! The provisioning service routes messages on the `custom-data` channel
//! to [`handle_custom_data`] while a session is open.  The payload format
//! is up to the application; this one treats the input as text, logs it,
//! and acknowledges with a fixed NUL-terminated `SUCCESS`.
//!
//! The handler never touches orchestrator state and never blocks on I/O.
//! Ownership of the returned buffer passes to the caller.

use core::fmt;

use log::{error, info};

/// Reply body, without terminator.
pub const ENDPOINT_RESPONSE: &str = "SUCCESS";

/// Signature the provisioning service invokes: session id and optional
/// input in, owned reply out.
pub type EndpointFn = fn(u32, Option<&[u8]>) -> Result<Vec<u8>, EndpointError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointError {
    /// The reply buffer could not be allocated.
    OutOfMemory,
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "system out of memory"),
        }
    }
}

/// Handle one message on the custom endpoint.
pub fn handle_custom_data(session_id: u32, input: Option<&[u8]>) -> Result<Vec<u8>, EndpointError> {
    if let Some(data) = input {
        info!(
            "Endpoint[{}]: received data: {}",
            session_id,
            String::from_utf8_lossy(data)
        );
    }

    let mut reply = Vec::new();
    if reply.try_reserve_exact(ENDPOINT_RESPONSE.len() + 1).is_err() {
        error!("Endpoint[{}]: system out of memory", session_id);
        return Err(EndpointError::OutOfMemory);
    }
    reply.extend_from_slice(ENDPOINT_RESPONSE.as_bytes());
    reply.push(0);
    Ok(reply)
}
