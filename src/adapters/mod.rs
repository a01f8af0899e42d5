//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `prov_mgr`     | ProvisioningPort   | wifi_provisioning (BLE scheme)|
//! | `wifi`         | LinkPort           | ESP-IDF Wi-Fi STA             |
//! | `nvs`          | ConfigPort         | NVS / in-memory store         |
//! | `device_id`    | (identity)         | eFuse / Wi-Fi MAC             |
//! | `event_bridge` | (event source)     | default esp_event loop        |

pub mod device_id;
#[cfg(target_os = "espidf")]
pub mod event_bridge;
pub mod nvs;
pub mod prov_mgr;
pub mod wifi;
