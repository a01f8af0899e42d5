//! Device identity derived from the station MAC address.
//!
//! The advertised BLE service name is `<prefix>XX_YY_ZZ`: the configured
//! prefix followed by the last three MAC octets in uppercase hex.  With
//! the default `Kaivac_` prefix this is `Kaivac_11_22_33`, 15 characters,
//! which together with the C terminator fills the 16-byte name buffer the
//! provisioning service accepts.

use core::fmt::{self, Write};

/// Name buffer size expected by the provisioning service, terminator included.
pub const SERVICE_NAME_MAX: usize = 16;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Fixed-size service name string.
pub type ServiceName = heapless::String<SERVICE_NAME_MAX>;

/// The printable, hardware-derived name the device advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(ServiceName);

impl DeviceIdentity {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Output capacity (terminator included) is below what the prefix needs.
    BufferTooSmall { required: usize, available: usize },
    /// Neither the station interface nor the eFuse yielded a MAC.
    MacUnavailable(i32),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall {
                required,
                available,
            } => write!(
                f,
                "service name needs {} bytes, buffer holds {}",
                required, available
            ),
            Self::MacUnavailable(code) => write!(f, "MAC address unavailable (err 0x{:x})", code),
        }
    }
}

/// Read the Wi-Fi station MAC address, falling back to the factory eFuse
/// MAC when the Wi-Fi driver is not up yet.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> Result<MacAddress, IdentityError> {
    use esp_idf_svc::sys::{
        ESP_OK, esp_efuse_mac_get_default, esp_err_t, esp_wifi_get_mac,
        wifi_interface_t_WIFI_IF_STA,
    };

    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer as required by esp_wifi_get_mac.
    let ret = unsafe { esp_wifi_get_mac(wifi_interface_t_WIFI_IF_STA, mac.as_mut_ptr()) };
    if ret == ESP_OK as esp_err_t {
        return Ok(mac);
    }
    log::warn!("esp_wifi_get_mac failed (0x{:x}), falling back to eFuse MAC", ret);

    // SAFETY: same 6-byte buffer; the eFuse read has no other preconditions.
    let ret = unsafe { esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if ret != ESP_OK as esp_err_t {
        log::error!("esp_efuse_mac_get_default failed (0x{:x})", ret);
        return Err(IdentityError::MacUnavailable(ret));
    }
    Ok(mac)
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> Result<MacAddress, IdentityError> {
    Ok([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE])
}

/// Write the service name into a buffer of `N` bytes (terminator included).
pub fn write_service_name<const N: usize>(
    prefix: &str,
    mac: &MacAddress,
) -> Result<heapless::String<N>, IdentityError> {
    let required = prefix.len() + 8 + 1;
    if required > N {
        return Err(IdentityError::BufferTooSmall {
            required,
            available: N,
        });
    }
    let mut name = heapless::String::<N>::new();
    // Capacity was checked above.
    let _ = write!(name, "{}{:02X}_{:02X}_{:02X}", prefix, mac[3], mac[4], mac[5]);
    Ok(name)
}

/// Derive the device identity for `prefix` and `mac`.
pub fn service_name(prefix: &str, mac: &MacAddress) -> Result<DeviceIdentity, IdentityError> {
    write_service_name::<SERVICE_NAME_MAX>(prefix, mac).map(DeviceIdentity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_format() {
        let mac = [0xAA, 0xBB, 0xCC, 0x11, 0x22, 0x33];
        assert_eq!(service_name("Kaivac_", &mac).unwrap().as_str(), "Kaivac_11_22_33");
    }

    #[test]
    fn hex_is_uppercase_and_padded() {
        let mac = [0, 0, 0, 0x0a, 0x00, 0xfe];
        assert_eq!(service_name("Kaivac_", &mac).unwrap().as_str(), "Kaivac_0A_00_FE");
    }

    #[test]
    fn first_three_octets_ignored() {
        let a = service_name("Kaivac_", &[0xAA, 0xBB, 0xCC, 0x11, 0x22, 0x33]).unwrap();
        let b = service_name("Kaivac_", &[0x01, 0x02, 0x03, 0x11, 0x22, 0x33]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn default_prefix_fills_buffer_exactly() {
        let id = service_name("Kaivac_", &read_mac().unwrap()).unwrap();
        assert_eq!(id.as_str().len() + 1, SERVICE_NAME_MAX);
        assert_eq!(id.as_str(), "Kaivac_EF_CA_FE");
    }

    #[test]
    fn small_buffer_rejected() {
        let err = write_service_name::<8>("Kaivac_", &read_mac().unwrap()).unwrap_err();
        assert_eq!(
            err,
            IdentityError::BufferTooSmall {
                required: 16,
                available: 8
            }
        );
    }

    #[test]
    fn oversized_prefix_rejected() {
        assert!(service_name("Kaivac-dev-", &read_mac().unwrap()).is_err());
    }

    #[test]
    fn mac_failure_names_error_code() {
        let err = IdentityError::MacUnavailable(0x3001);
        assert_eq!(err.to_string(), "MAC address unavailable (err 0x3001)");
    }

    #[test]
    fn empty_prefix_allowed() {
        assert_eq!(service_name("", &read_mac().unwrap()).unwrap().as_str(), "EF_CA_FE");
    }
}
