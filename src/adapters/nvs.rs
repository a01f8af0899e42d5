//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`].
//!
//! - Config: the [`ProvisioningConfig`] is stored as one `postcard` blob and
//!   validated before every write.
//! - Station credentials: on ESP32 the Wi-Fi driver keeps them in its own
//!   NVS namespace and the provisioning manager answers the "provisioned?"
//!   query.  The simulation backend stores them here so the host
//!   provisioning manager has something to answer from.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::ConfigPort;
#[cfg(not(target_os = "espidf"))]
use crate::app::ports::StorageError;
use crate::config::{ConfigError, ProvisioningConfig};
#[cfg(not(target_os = "espidf"))]
use crate::events::StaCredentials;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "kaivac";
#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"provcfg\0";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    config_blob: std::cell::RefCell<Option<Vec<u8>>>,
    #[cfg(not(target_os = "espidf"))]
    sta: Option<StaCredentials>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised.  Returns `Err(ConfigError::IoError)` if that
    /// also fails.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK as esp_err_t {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK as esp_err_t {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK as esp_err_t {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            config_blob: std::cell::RefCell::new(None),
            #[cfg(not(target_os = "espidf"))]
            sta: None,
        })
    }

    /// NVS names are at most 15 bytes plus terminator.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, esp_err_t>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as esp_err_t {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn commit(handle: nvs_handle_t) -> Result<(), esp_err_t> {
        let ret = unsafe { nvs_commit(handle) };
        if ret != ESP_OK as esp_err_t {
            return Err(ret);
        }
        Ok(())
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<ProvisioningConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.config_blob.borrow().as_deref() {
                let cfg: ProvisioningConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(ProvisioningConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY_C.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK as esp_err_t {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_ERR_NVS_INVALID_LENGTH as esp_err_t);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        CONFIG_KEY_C.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK as esp_err_t {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: ProvisioningConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND as esp_err_t => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(ProvisioningConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error 0x{:x}, using defaults", e);
                    Ok(ProvisioningConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &ProvisioningConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            *self.config_blob.borrow_mut() = Some(bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        CONFIG_KEY_C.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK as esp_err_t {
                    return Err(ret);
                }
                Self::commit(handle)
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error 0x{:x}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

// ── Station credentials (simulation) ───────────────────────────────
//
// Stand-in for the Wi-Fi driver's own credential store.  The simulated
// provisioning manager writes accepted credentials here and reads them
// back to answer the "provisioned?" query.
#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    pub fn store_sta_credentials(&mut self, creds: &StaCredentials) -> Result<(), StorageError> {
        self.sta = Some(creds.clone());
        Ok(())
    }

    pub fn has_sta_credentials(&self) -> bool {
        self.sta.is_some()
    }

    /// Read back the stored SSID.
    pub fn sta_ssid(&self) -> Result<heapless::String<32>, StorageError> {
        self.sta
            .as_ref()
            .map(|creds| creds.ssid.clone())
            .ok_or(StorageError::NotFound)
    }

    /// Factory reset: forget the station credentials.
    pub fn erase_sta_credentials(&mut self) -> Result<(), StorageError> {
        self.sta = None;
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::config::Security;

    #[test]
    fn load_without_stored_config_gives_defaults() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load().unwrap(), ProvisioningConfig::default());
    }

    #[test]
    fn config_save_load_round_trip() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = ProvisioningConfig {
            security: Security::Sec0,
            auto_stop_grace_ms: None,
            log_credentials: true,
            ..Default::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn save_rejects_invalid_config() {
        let nvs = NvsAdapter::new().unwrap();
        let cfg = ProvisioningConfig {
            heartbeat_interval_ms: 10,
            ..Default::default()
        };
        assert!(matches!(nvs.save(&cfg), Err(ConfigError::ValidationFailed(_))));
        assert_eq!(nvs.load().unwrap(), ProvisioningConfig::default());
    }

    #[test]
    fn corrupted_blob_reported() {
        let nvs = NvsAdapter::new().unwrap();
        *nvs.config_blob.borrow_mut() = Some(vec![0xff; 3]);
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn sta_credentials_lifecycle() {
        let mut nvs = NvsAdapter::new().unwrap();
        assert!(!nvs.has_sta_credentials());

        let creds = StaCredentials::new("HomeNet", "hunter22").unwrap();
        nvs.store_sta_credentials(&creds).unwrap();
        assert!(nvs.has_sta_credentials());
        assert_eq!(nvs.sta_ssid().unwrap().as_str(), "HomeNet");

        nvs.erase_sta_credentials().unwrap();
        assert!(!nvs.has_sta_credentials());
        assert_eq!(nvs.sta_ssid(), Err(StorageError::NotFound));
    }
}
