//! Unified error type for the provisioning firmware.
//!
//! Every port error converts into [`Error`] so the dispatcher and `main`
//! handle failures uniformly.  All variants are `Copy`.
//!
//! Recoverable credential failures are *not* errors: they arrive as
//! [`CredentialsFailed`](crate::events::ProvisioningEvent::CredentialsFailed)
//! events and are answered with a reset command.  Everything here is
//! either fatal to a subsystem or a construction-time problem.

use core::fmt;

use crate::adapters::device_id::IdentityError;
use crate::app::endpoint::EndpointError;
use crate::app::ports::{CommandError, LinkError, StorageError};
use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The stored-credential query failed; cannot decide whether to connect.
    Storage(StorageError),
    /// The provisioning service could not apply a command.
    Command(CommandError),
    /// The link service rejected a request.
    Link(LinkError),
    /// The custom endpoint could not allocate its reply.
    Endpoint(EndpointError),
    /// The identity could not be derived.
    Identity(IdentityError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Provisioning was halted by an earlier fatal error.
    Halted,
    /// The dispatcher lock was poisoned by a panicking holder.
    Poisoned,
}

impl Error {
    /// Whether the error ends the provisioning subsystem's lifecycle.
    /// A failed credential query aborts only the connect decision.
    pub fn halts_provisioning(&self) -> bool {
        matches!(self, Self::Command(_) | Self::Halted | Self::Poisoned)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "credential query: {e}"),
            Self::Command(e) => write!(f, "provisioning command: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Endpoint(e) => write!(f, "endpoint: {e}"),
            Self::Identity(e) => write!(f, "identity: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Halted => write!(f, "provisioning halted after fatal error"),
            Self::Poisoned => write!(f, "dispatcher lock poisoned"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<EndpointError> for Error {
    fn from(e: EndpointError) -> Self {
        Self::Endpoint(e)
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
