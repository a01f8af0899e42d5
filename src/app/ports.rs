//! Port traits: the hexagonal boundary between the orchestrator and the
//! ESP-IDF subsystems it drives.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator (domain)
//! ```
//!
//! The provisioning manager, Wi-Fi driver and NVS implement these traits.
//! The [`Orchestrator`](super::orchestrator::Orchestrator) consumes them via
//! generics, so the policy never touches ESP-IDF directly.

use core::fmt;

use crate::config::{ConfigError, ProvisioningConfig, Security};

use super::endpoint::EndpointFn;

// ───────────────────────────────────────────────────────────────
// Provisioning service port (driven adapter: domain → prov manager)
// ───────────────────────────────────────────────────────────────

/// The provisioning-service collaborator.
///
/// The setup methods are called once by [`launch`](super::launch::launch);
/// the three transition commands and the credential query are issued by the
/// orchestrator.  Commands are fire-and-forget: an `Err` means the service
/// could not apply them and is treated as fatal.
pub trait ProvisioningPort {
    /// Initialise the manager with the BLE scheme.
    fn init(&mut self) -> Result<(), CommandError>;

    /// Set the 128-bit primary GATT service UUID (LSB first).
    fn set_service_uuid(&mut self, uuid: &[u8; 16]) -> Result<(), CommandError>;

    /// Create a named application endpoint.  Must precede [`start`](Self::start).
    fn create_endpoint(&mut self, name: &str) -> Result<(), CommandError>;

    /// Keep the service alive for `grace_ms` after success instead of
    /// stopping immediately.  The service owns the timer.
    fn disable_auto_stop(&mut self, grace_ms: u32) -> Result<(), CommandError>;

    /// Start advertising under `identity` with the given security parameters.
    fn start(
        &mut self,
        security: &Security,
        identity: &str,
        service_key: Option<&str>,
    ) -> Result<(), CommandError>;

    /// Attach `handler` to a previously created endpoint.
    fn register_endpoint(&mut self, name: &str, handler: EndpointFn) -> Result<(), CommandError>;

    /// Clear the failed attempt so new credentials can be submitted.
    fn reset_attempt_state(&mut self) -> Result<(), CommandError>;

    /// Arm a clean re-provision without discarding accepted credentials.
    fn reset_for_reprovision(&mut self) -> Result<(), CommandError>;

    /// Release every provisioning resource.
    fn deinitialize(&mut self) -> Result<(), CommandError>;

    /// Whether station credentials are persisted.
    fn is_provisioned(&self) -> Result<bool, StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain → Wi-Fi station)
// ───────────────────────────────────────────────────────────────

pub trait LinkPort {
    /// Ask the station to associate with the stored network.
    fn connect(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`ProvisioningConfig`].
///
/// Implementations MUST call [`ProvisioningConfig::validate`] before
/// persisting and reject invalid values with
/// [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Returns [`ProvisioningConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<ProvisioningConfig, ConfigError>;

    fn save(&self, config: &ProvisioningConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// A provisioning-service call that could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandError {
    /// Name of the failed operation.
    pub op: &'static str,
    /// Raw `esp_err_t` (or simulated equivalent).
    pub code: i32,
}

impl CommandError {
    pub const fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed (err 0x{:x})", self.op, self.code)
    }
}

/// Errors from [`LinkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The station rejected the connect request.
    ConnectFailed(i32),
    /// The station is not started.
    NotStarted,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(code) => write!(f, "Wi-Fi connect failed (err 0x{:x})", code),
            Self::NotStarted => write!(f, "Wi-Fi station not started"),
        }
    }
}

/// Errors from the stored-credential query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No credentials are stored.
    NotFound,
    /// The credential store could not be read.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored credentials"),
            Self::IoError => write!(f, "credential store I/O error"),
        }
    }
}
