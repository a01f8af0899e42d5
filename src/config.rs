//! Provisioning configuration.
//!
//! Everything the orchestrator and the launch sequence need is carried in
//! one immutable [`ProvisioningConfig`] built at boot (NVS blob or
//! defaults) and handed to the constructors.  Nothing here is global.

use core::fmt;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::adapters::device_id::SERVICE_NAME_MAX;

/// Hex characters plus separators appended to the identity prefix.
const IDENTITY_SUFFIX_LEN: usize = 8;

/// Primary GATT service UUID advertised during BLE provisioning (LSB first).
pub const DEFAULT_SERVICE_UUID: [u8; 16] = [
    0xb4, 0xdf, 0x5a, 0x1c, 0x3f, 0x6b, 0xf4, 0xbf, 0xea, 0x4a, 0x82, 0x03, 0x04, 0x90, 0x1a, 0x02,
];

pub const DEFAULT_IDENTITY_PREFIX: &str = "Kaivac_";
pub const DEFAULT_ENDPOINT_NAME: &str = "custom-data";
pub const DEFAULT_POP: &str = "abcd1234";

// ---------------------------------------------------------------------------
// Secure session parameters
// ---------------------------------------------------------------------------

/// Secure-session level and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Security {
    /// Plain-text transport.
    Sec0,
    /// X25519 handshake with optional proof-of-possession, AES-CTR.
    Sec1 { pop: Option<String<64>> },
    /// SRP6a handshake, AES-GCM.
    Sec2 {
        username: String<32>,
        salt: Vec<u8, 32>,
        verifier: Vec<u8, 384>,
    },
}

impl Security {
    /// Numeric level as understood by the provisioning service.
    pub fn level(&self) -> u8 {
        match self {
            Self::Sec0 => 0,
            Self::Sec1 { .. } => 1,
            Self::Sec2 { .. } => 2,
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sec0 => write!(f, "security 0 (plain text)"),
            Self::Sec1 { pop: Some(_) } => write!(f, "security 1 (PoP)"),
            Self::Sec1 { pop: None } => write!(f, "security 1"),
            Self::Sec2 { username, .. } => write!(f, "security 2 (user '{}')", username),
        }
    }
}

/// Heartbeat LED settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkConfig {
    /// GPIO number driving the LED.
    pub gpio: u8,
    /// Time between LED toggles (milliseconds).
    pub toggle_interval_ms: u32,
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Immutable provisioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    // --- Secure session ---
    pub security: Security,
    /// SoftAP password; ignored by the BLE scheme.
    pub service_key: Option<String<64>>,

    // --- BLE advertisement ---
    /// 128-bit primary service UUID, LSB first.
    pub service_uuid: [u8; 16],
    /// Prefix of the advertised device identity.
    pub identity_prefix: String<8>,

    // --- Application endpoint ---
    pub endpoint_name: String<32>,

    // --- Lifecycle ---
    /// Grace period before the provisioning service stops itself after
    /// success.  `None` leaves auto-stop enabled.
    pub auto_stop_grace_ms: Option<u32>,

    // --- Heartbeat ---
    pub heartbeat_interval_ms: u32,
    pub blink: Option<BlinkConfig>,

    // --- Diagnostics ---
    /// Print received Wi-Fi passwords in clear text.  Development only.
    pub log_credentials: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        let mut pop = String::new();
        pop.push_str(DEFAULT_POP).ok();
        let mut identity_prefix = String::new();
        identity_prefix.push_str(DEFAULT_IDENTITY_PREFIX).ok();
        let mut endpoint_name = String::new();
        endpoint_name.push_str(DEFAULT_ENDPOINT_NAME).ok();

        Self {
            security: Security::Sec1 { pop: Some(pop) },
            service_key: None,

            service_uuid: DEFAULT_SERVICE_UUID,
            identity_prefix,

            endpoint_name,

            auto_stop_grace_ms: Some(1000),

            heartbeat_interval_ms: 5000,
            blink: Some(BlinkConfig {
                gpio: 5,
                toggle_interval_ms: 1000,
            }),

            log_credentials: false,
        }
    }
}

impl ProvisioningConfig {
    /// Range-check every field.  Called before launch and before persisting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity_prefix.len() + IDENTITY_SUFFIX_LEN + 1 > SERVICE_NAME_MAX {
            return Err(ConfigError::ValidationFailed(
                "identity_prefix must be at most 7 bytes",
            ));
        }
        if !self.identity_prefix.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::ValidationFailed(
                "identity_prefix must be printable ASCII",
            ));
        }
        if self.endpoint_name.is_empty() {
            return Err(ConfigError::ValidationFailed("endpoint_name must not be empty"));
        }
        match &self.security {
            Security::Sec0 => {}
            Security::Sec1 { pop } => {
                if pop.as_ref().is_some_and(|p| p.is_empty()) {
                    return Err(ConfigError::ValidationFailed(
                        "proof-of-possession must not be empty (use None instead)",
                    ));
                }
            }
            Security::Sec2 {
                username,
                salt,
                verifier,
            } => {
                if username.is_empty() || salt.is_empty() || verifier.is_empty() {
                    return Err(ConfigError::ValidationFailed(
                        "security 2 needs username, salt and verifier",
                    ));
                }
            }
        }
        if let Some(key) = &self.service_key {
            if !(8..=64).contains(&key.len()) {
                return Err(ConfigError::ValidationFailed(
                    "service_key must be 8–64 bytes",
                ));
            }
        }
        if !(100..=60_000).contains(&self.heartbeat_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be 100–60000",
            ));
        }
        if let Some(blink) = &self.blink {
            if blink.toggle_interval_ms == 0 || blink.toggle_interval_ms > self.heartbeat_interval_ms
            {
                return Err(ConfigError::ValidationFailed(
                    "blink toggle interval must be 1..=heartbeat_interval_ms",
                ));
            }
            if blink.gpio > 48 {
                return Err(ConfigError::ValidationFailed("blink gpio must be 0–48"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading, validating or persisting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
