//! Wi-Fi provisioning manager adapter.
//!
//! Implements [`ProvisioningPort`] over the ESP-IDF `wifi_provisioning`
//! component with the BLE scheme.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `wifi_prov_mgr_*` calls through `esp_idf_svc::sys`.
//! - **all other targets**: a simulation that enforces the manager's call
//!   order, stores accepted credentials in the NVS simulation and guards
//!   endpoint invocation after deinit.
//!
//! The manager keeps raw pointers to the service UUID, the PoP and the
//! Sec2 salt/verifier.  The adapter owns heap copies of them for the
//! lifetime of the manager.

#[cfg(not(target_os = "espidf"))]
use log::warn;
use log::{debug, info};

use crate::app::endpoint::EndpointFn;
use crate::app::ports::{CommandError, ProvisioningPort, StorageError};
use crate::config::Security;

#[cfg(not(target_os = "espidf"))]
use super::nvs::NvsAdapter;
#[cfg(not(target_os = "espidf"))]
use crate::app::endpoint::EndpointError;
#[cfg(not(target_os = "espidf"))]
use crate::events::StaCredentials;

#[cfg(target_os = "espidf")]
use core::ffi::c_void;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use std::ffi::CString;

// ───────────────────────────────────────────────────────────────
// Error codes (mirrors esp_err.h for the simulation)
// ───────────────────────────────────────────────────────────────

pub const ERR_NO_MEM: i32 = 0x101;
pub const ERR_INVALID_ARG: i32 = 0x102;
pub const ERR_INVALID_STATE: i32 = 0x103;
pub const ERR_NOT_FOUND: i32 = 0x105;

/// Manager lifecycle as tracked by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Started,
    Deinitialized,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct ProvisioningManager {
    lifecycle: Lifecycle,
    service_uuid: Box<[u8; 16]>,
    /// C strings handed to the manager (endpoint names, PoP, identity).
    retained: Vec<CString>,
    sec2_salt: Vec<u8>,
    sec2_verifier: Vec<u8>,
    sec2_params: Option<Box<wifi_prov_security2_params_t>>,
}

#[cfg(target_os = "espidf")]
fn check(op: &'static str, ret: esp_err_t) -> Result<(), CommandError> {
    if ret == ESP_OK as esp_err_t {
        debug!("ProvMgr: {} ok", op);
        Ok(())
    } else {
        log::error!("ProvMgr: {} failed (0x{:x})", op, ret);
        Err(CommandError::new(op, ret))
    }
}

#[cfg(target_os = "espidf")]
impl ProvisioningManager {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            service_uuid: Box::new([0; 16]),
            retained: Vec::new(),
            sec2_salt: Vec::new(),
            sec2_verifier: Vec::new(),
            sec2_params: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn retain(&mut self, op: &'static str, s: &str) -> Result<*const core::ffi::c_char, CommandError> {
        let c = CString::new(s).map_err(|_| CommandError::new(op, ERR_INVALID_ARG))?;
        let ptr = c.as_ptr();
        self.retained.push(c);
        Ok(ptr)
    }
}

/// Bridge from the C request handler to an [`EndpointFn`] carried in
/// `priv_data`.  The reply is copied into a `malloc` buffer; the
/// provisioning manager frees it.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn endpoint_trampoline(
    session_id: u32,
    inbuf: *const u8,
    inlen: ssize_t,
    outbuf: *mut *mut u8,
    outlen: *mut ssize_t,
    priv_data: *mut c_void,
) -> esp_err_t {
    if priv_data.is_null() || outbuf.is_null() || outlen.is_null() {
        return ESP_ERR_INVALID_ARG as esp_err_t;
    }

    // SAFETY: priv_data was produced from an `EndpointFn` in
    // `register_endpoint`; function pointers and data pointers have the
    // same size on this target.
    let handler = unsafe { core::mem::transmute::<*mut c_void, EndpointFn>(priv_data) };
    let input = if inbuf.is_null() {
        None
    } else {
        // SAFETY: the manager passes a buffer of `inlen` bytes valid for
        // the duration of the call.
        Some(unsafe { core::slice::from_raw_parts(inbuf, inlen.max(0) as usize) })
    };

    let reply = match handler(session_id, input) {
        Ok(reply) => reply,
        Err(_) => return ESP_ERR_NO_MEM as esp_err_t,
    };

    // SAFETY: plain allocation; ownership passes to the manager.
    let buf = unsafe { malloc(reply.len() as _) } as *mut u8;
    if buf.is_null() {
        return ESP_ERR_NO_MEM as esp_err_t;
    }
    unsafe {
        core::ptr::copy_nonoverlapping(reply.as_ptr(), buf, reply.len());
        *outbuf = buf;
        *outlen = reply.len() as ssize_t;
    }
    ESP_OK as esp_err_t
}

#[cfg(target_os = "espidf")]
impl ProvisioningPort for ProvisioningManager {
    fn init(&mut self) -> Result<(), CommandError> {
        let config = wifi_prov_mgr_config_t {
            // SAFETY: reading an immutable scheme descriptor.
            scheme: unsafe { wifi_prov_scheme_ble },
            scheme_event_handler: wifi_prov_event_handler_t {
                event_cb: Some(wifi_prov_scheme_ble_event_cb_free_btdm),
                user_data: core::ptr::null_mut(),
            },
            ..Default::default()
        };
        check("init", unsafe { wifi_prov_mgr_init(config) })?;
        self.lifecycle = Lifecycle::Initialized;
        info!("ProvMgr: initialised with BLE scheme");
        Ok(())
    }

    fn set_service_uuid(&mut self, uuid: &[u8; 16]) -> Result<(), CommandError> {
        *self.service_uuid = *uuid;
        check("set_service_uuid", unsafe {
            wifi_prov_scheme_ble_set_service_uuid(self.service_uuid.as_mut_ptr())
        })
    }

    fn create_endpoint(&mut self, name: &str) -> Result<(), CommandError> {
        let name = self.retain("create_endpoint", name)?;
        check("create_endpoint", unsafe { wifi_prov_mgr_endpoint_create(name) })
    }

    fn disable_auto_stop(&mut self, grace_ms: u32) -> Result<(), CommandError> {
        check("disable_auto_stop", unsafe {
            wifi_prov_mgr_disable_auto_stop(grace_ms)
        })
    }

    fn start(
        &mut self,
        security: &Security,
        identity: &str,
        service_key: Option<&str>,
    ) -> Result<(), CommandError> {
        let (level, params): (wifi_prov_security_t, *const c_void) = match security {
            Security::Sec0 => (wifi_prov_security_WIFI_PROV_SECURITY_0, core::ptr::null()),
            Security::Sec1 { pop } => {
                let params = match pop {
                    Some(pop) => self.retain("start", pop)? as *const c_void,
                    None => core::ptr::null(),
                };
                (wifi_prov_security_WIFI_PROV_SECURITY_1, params)
            }
            Security::Sec2 {
                salt, verifier, ..
            } => {
                self.sec2_salt = salt.to_vec();
                self.sec2_verifier = verifier.to_vec();
                let params = Box::new(wifi_prov_security2_params_t {
                    salt: self.sec2_salt.as_ptr() as *const _,
                    salt_len: self.sec2_salt.len() as u16,
                    verifier: self.sec2_verifier.as_ptr() as *const _,
                    verifier_len: self.sec2_verifier.len() as u16,
                });
                let ptr = &*params as *const wifi_prov_security2_params_t as *const c_void;
                self.sec2_params = Some(params);
                (wifi_prov_security_WIFI_PROV_SECURITY_2, ptr)
            }
        };

        let identity = self.retain("start", identity)?;
        let service_key = match service_key {
            Some(key) => self.retain("start", key)?,
            None => core::ptr::null(),
        };

        check("start", unsafe {
            wifi_prov_mgr_start_provisioning(level, params, identity, service_key)
        })?;
        self.lifecycle = Lifecycle::Started;
        Ok(())
    }

    fn register_endpoint(&mut self, name: &str, handler: EndpointFn) -> Result<(), CommandError> {
        let name = self.retain("register_endpoint", name)?;
        check("register_endpoint", unsafe {
            wifi_prov_mgr_endpoint_register(
                name,
                Some(endpoint_trampoline),
                handler as *const () as *mut c_void,
            )
        })
    }

    fn reset_attempt_state(&mut self) -> Result<(), CommandError> {
        check("reset_attempt_state", unsafe {
            wifi_prov_mgr_reset_sm_state_on_failure()
        })
    }

    fn reset_for_reprovision(&mut self) -> Result<(), CommandError> {
        check("reset_for_reprovision", unsafe {
            wifi_prov_mgr_reset_sm_state_for_reprovision()
        })
    }

    fn deinitialize(&mut self) -> Result<(), CommandError> {
        // The manager tolerates repeated deinit and reports nothing.
        unsafe { wifi_prov_mgr_deinit() };
        self.lifecycle = Lifecycle::Deinitialized;
        info!("ProvMgr: deinitialised");
        Ok(())
    }

    fn is_provisioned(&self) -> Result<bool, StorageError> {
        let mut provisioned = false;
        let ret = unsafe { wifi_prov_mgr_is_provisioned(&mut provisioned) };
        if ret != ESP_OK as esp_err_t {
            log::error!("ProvMgr: is_provisioned failed (0x{:x})", ret);
            return Err(StorageError::IoError);
        }
        Ok(provisioned)
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
struct SimEndpoint {
    name: heapless::String<32>,
    handler: Option<EndpointFn>,
}

#[cfg(not(target_os = "espidf"))]
pub struct ProvisioningManager {
    lifecycle: Lifecycle,
    nvs: NvsAdapter,
    service_uuid: Option<[u8; 16]>,
    auto_stop_grace_ms: Option<u32>,
    security_level: Option<u8>,
    identity: heapless::String<16>,
    endpoints: Vec<SimEndpoint>,
    deinit_count: u32,
    fail_next: Option<&'static str>,
    query_fails: bool,
}

#[cfg(not(target_os = "espidf"))]
impl ProvisioningManager {
    pub fn new(nvs: NvsAdapter) -> Self {
        info!("ProvMgr: simulation backend");
        Self {
            lifecycle: Lifecycle::Uninitialized,
            nvs,
            service_uuid: None,
            auto_stop_grace_ms: None,
            security_level: None,
            identity: heapless::String::new(),
            endpoints: Vec::new(),
            deinit_count: 0,
            fail_next: None,
            query_fails: false,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn service_uuid(&self) -> Option<&[u8; 16]> {
        self.service_uuid.as_ref()
    }

    pub fn auto_stop_grace_ms(&self) -> Option<u32> {
        self.auto_stop_grace_ms
    }

    pub fn security_level(&self) -> Option<u8> {
        self.security_level
    }

    pub fn deinit_count(&self) -> u32 {
        self.deinit_count
    }

    pub fn nvs(&self) -> &NvsAdapter {
        &self.nvs
    }

    /// Make the next call to `op` fail with `ESP_FAIL`.
    pub fn fail_next(&mut self, op: &'static str) {
        self.fail_next = Some(op);
    }

    /// Make every credential query fail.
    pub fn fail_queries(&mut self, fail: bool) {
        self.query_fails = fail;
    }

    /// Persist credentials the way the manager does after the station
    /// joins the network.
    pub fn store_credentials(&mut self, creds: &StaCredentials) -> Result<(), StorageError> {
        self.nvs.store_sta_credentials(creds)
    }

    /// Factory reset.
    pub fn erase_credentials(&mut self) -> Result<(), StorageError> {
        self.nvs.erase_sta_credentials()
    }

    /// Deliver a client message to a registered endpoint.
    pub fn invoke_endpoint(
        &self,
        name: &str,
        session_id: u32,
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, CommandError> {
        const OP: &str = "invoke_endpoint";
        if self.lifecycle != Lifecycle::Started {
            warn!("ProvMgr(sim): endpoint '{}' invoked while {:?}", name, self.lifecycle);
            return Err(CommandError::new(OP, ERR_INVALID_STATE));
        }
        let handler = self
            .endpoints
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.handler)
            .ok_or(CommandError::new(OP, ERR_NOT_FOUND))?;
        handler(session_id, input).map_err(|e| match e {
            EndpointError::OutOfMemory => CommandError::new(OP, ERR_NO_MEM),
        })
    }

    fn gate(&mut self, op: &'static str, allowed: &[Lifecycle]) -> Result<(), CommandError> {
        if self.fail_next == Some(op) {
            self.fail_next = None;
            warn!("ProvMgr(sim): injected failure in {}", op);
            return Err(CommandError::new(op, -1));
        }
        if !allowed.contains(&self.lifecycle) {
            warn!("ProvMgr(sim): {} rejected while {:?}", op, self.lifecycle);
            return Err(CommandError::new(op, ERR_INVALID_STATE));
        }
        debug!("ProvMgr(sim): {}", op);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl ProvisioningPort for ProvisioningManager {
    fn init(&mut self) -> Result<(), CommandError> {
        self.gate("init", &[Lifecycle::Uninitialized, Lifecycle::Deinitialized])?;
        self.lifecycle = Lifecycle::Initialized;
        self.endpoints.clear();
        info!("ProvMgr(sim): initialised with BLE scheme");
        Ok(())
    }

    fn set_service_uuid(&mut self, uuid: &[u8; 16]) -> Result<(), CommandError> {
        self.gate("set_service_uuid", &[Lifecycle::Initialized])?;
        self.service_uuid = Some(*uuid);
        Ok(())
    }

    fn create_endpoint(&mut self, name: &str) -> Result<(), CommandError> {
        self.gate("create_endpoint", &[Lifecycle::Initialized])?;
        let name = heapless::String::try_from(name)
            .map_err(|_| CommandError::new("create_endpoint", ERR_INVALID_ARG))?;
        self.endpoints.push(SimEndpoint {
            name,
            handler: None,
        });
        Ok(())
    }

    fn disable_auto_stop(&mut self, grace_ms: u32) -> Result<(), CommandError> {
        self.gate("disable_auto_stop", &[Lifecycle::Initialized])?;
        self.auto_stop_grace_ms = Some(grace_ms);
        Ok(())
    }

    fn start(
        &mut self,
        security: &Security,
        identity: &str,
        _service_key: Option<&str>,
    ) -> Result<(), CommandError> {
        self.gate("start", &[Lifecycle::Initialized])?;
        self.identity = heapless::String::try_from(identity)
            .map_err(|_| CommandError::new("start", ERR_INVALID_ARG))?;
        self.security_level = Some(security.level());
        self.lifecycle = Lifecycle::Started;
        info!("ProvMgr(sim): advertising as {} ({})", identity, security);
        Ok(())
    }

    fn register_endpoint(&mut self, name: &str, handler: EndpointFn) -> Result<(), CommandError> {
        self.gate("register_endpoint", &[Lifecycle::Started])?;
        let endpoint = self
            .endpoints
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or(CommandError::new("register_endpoint", ERR_NOT_FOUND))?;
        endpoint.handler = Some(handler);
        Ok(())
    }

    fn reset_attempt_state(&mut self) -> Result<(), CommandError> {
        self.gate("reset_attempt_state", &[Lifecycle::Started])
    }

    fn reset_for_reprovision(&mut self) -> Result<(), CommandError> {
        self.gate("reset_for_reprovision", &[Lifecycle::Started])
    }

    fn deinitialize(&mut self) -> Result<(), CommandError> {
        self.gate(
            "deinitialize",
            &[
                Lifecycle::Uninitialized,
                Lifecycle::Initialized,
                Lifecycle::Started,
                Lifecycle::Deinitialized,
            ],
        )?;
        self.lifecycle = Lifecycle::Deinitialized;
        self.deinit_count += 1;
        info!("ProvMgr(sim): deinitialised");
        Ok(())
    }

    fn is_provisioned(&self) -> Result<bool, StorageError> {
        if self.query_fails {
            return Err(StorageError::IoError);
        }
        Ok(self.nvs.has_sta_credentials())
    }
}
