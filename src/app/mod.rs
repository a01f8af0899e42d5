//! Application core: provisioning policy, zero I/O.
//!
//! The orchestrator decides which command answers each event; the
//! registry answers the stored-credential query; the endpoint produces
//! protocol acknowledgments.  All interaction with ESP-IDF happens
//! through the **port traits** in [`ports`], keeping this layer testable
//! without a radio.

pub mod commands;
pub mod endpoint;
pub mod launch;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod status;
