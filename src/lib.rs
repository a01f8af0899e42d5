//! Kaivac provisioning firmware library.
//!
//! BLE Wi-Fi provisioning for ESP32: the orchestrator that answers
//! provisioning, Wi-Fi, BLE-transport and secure-session events, the
//! custom endpoint, the identity resolver and the heartbeat.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod heartbeat;

mod esp_link_shims;

pub use error::{Error, Result};
