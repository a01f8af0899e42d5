//! Wi-Fi station adapter.
//!
//! Implements [`LinkPort`]: the orchestrator asks it to join the stored
//! network once per link start.  The provisioning manager configures and
//! starts the station; this adapter only issues the connect request.
//! Retries after a failed association are the Wi-Fi driver's business.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_wifi_connect()`; the `EspWifi` driver
//!   handle is held so the netif and driver stay alive.
//! - **all other targets**: simulation that counts connect requests.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{LinkError, LinkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::EspWifi;

#[cfg(target_os = "espidf")]
pub struct WifiLink {
    _driver: EspWifi<'static>,
}

#[cfg(target_os = "espidf")]
impl WifiLink {
    pub fn new(driver: EspWifi<'static>) -> Self {
        Self { _driver: driver }
    }
}

#[cfg(target_os = "espidf")]
impl LinkPort for WifiLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        let ret = unsafe { esp_wifi_connect() };
        if ret == ESP_ERR_WIFI_NOT_STARTED as esp_err_t {
            warn!("WifiLink: connect before station start");
            return Err(LinkError::NotStarted);
        }
        if ret != ESP_OK as esp_err_t {
            return Err(LinkError::ConnectFailed(ret));
        }
        info!("WifiLink: connect requested");
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct WifiLink {
    attempts: u32,
    refuse_with: Option<LinkError>,
}

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connect requests received.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Make every connect request fail with `err`.
    pub fn refuse(&mut self, err: LinkError) {
        self.refuse_with = Some(err);
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkPort for WifiLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.attempts += 1;
        if let Some(err) = self.refuse_with {
            return Err(err);
        }
        info!("WifiLink(sim): connect requested (attempt {})", self.attempts);
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn counts_every_request_including_refused() {
        let mut link = WifiLink::new();
        link.connect().unwrap();
        link.refuse(LinkError::ConnectFailed(0x3007));
        assert_eq!(link.connect(), Err(LinkError::ConnectFailed(0x3007)));
        assert_eq!(link.attempts(), 2);
    }
}
