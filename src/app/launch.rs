//! Provisioning launch sequence.
//!
//! ```text
//!   validate ─▶ init ─▶ service UUID ─▶ create endpoint ─▶ auto-stop grace
//!                                                              │
//!                      register endpoint handler ◀── start ◀───┘
//! ```
//!
//! The endpoint must exist before `start` and its handler can only be
//! attached after `start`; the provisioning manager rejects any other
//! order.

use log::info;

use crate::adapters::device_id::DeviceIdentity;
use crate::config::ProvisioningConfig;
use crate::error::Result;

use super::endpoint::handle_custom_data;
use super::ports::ProvisioningPort;

/// Bring up the provisioning service and begin advertising as `identity`.
pub fn launch<P: ProvisioningPort + ?Sized>(
    prov: &mut P,
    config: &ProvisioningConfig,
    identity: &DeviceIdentity,
) -> Result<()> {
    config.validate()?;

    prov.init()?;
    prov.set_service_uuid(&config.service_uuid)?;
    prov.create_endpoint(&config.endpoint_name)?;
    if let Some(grace_ms) = config.auto_stop_grace_ms {
        prov.disable_auto_stop(grace_ms)?;
    }

    info!(
        "Starting provisioning as {} (security {})",
        identity, config.security
    );
    prov.start(
        &config.security,
        identity.as_str(),
        config.service_key.as_deref(),
    )?;

    prov.register_endpoint(&config.endpoint_name, handle_custom_data)?;
    Ok(())
}
