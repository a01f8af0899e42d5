//! Credential session registry, read path.
//!
//! Answers "are station credentials stored?" once per link start by
//! asking the provisioning service, which reads them from NVS.  A failed
//! query is returned as an error and no connect decision is made.

use log::{error, info};

use crate::error::{Error, Result};

use super::ports::ProvisioningPort;

/// Query the provisioning service for stored credentials.
pub fn has_stored_credentials<P: ProvisioningPort + ?Sized>(port: &P) -> Result<bool> {
    match port.is_provisioned() {
        Ok(true) => {
            info!("Registry: Wi-Fi credentials are present");
            Ok(true)
        }
        Ok(false) => {
            info!("Registry: no stored Wi-Fi credentials");
            Ok(false)
        }
        Err(e) => {
            error!("Registry: credential query failed: {}", e);
            Err(Error::Storage(e))
        }
    }
}
