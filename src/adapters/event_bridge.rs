//! ESP-IDF event loop → [`EVENT_QUEUE`] bridge.
//!
//! One C handler is registered on the default event loop for the five
//! bases the firmware cares about.  It decodes `(base, id, data)` into a
//! typed [`Event`] and enqueues it; the main task drains the queue into
//! the dispatcher.  Diagnostic events are shed when the queue is nearly
//! full; anything that drives a command waits in the event task for room.  Ids the firmware does not act on are
//! dropped here.

use core::ffi::c_void;
use core::ptr;
use std::net::Ipv4Addr;

use esp_idf_svc::sys::*;
use log::{debug, warn};

use crate::events::{
    EVENT_QUEUE, Event, FailureReason, LinkEvent, ProvisioningEvent, SessionEvent, StaCredentials,
    TransportEvent,
};

/// Decode one raw event.
///
/// # Safety
///
/// `data` must point to the payload type ESP-IDF documents for
/// `(base, id)`, or be null.
unsafe fn decode(base: esp_event_base_t, id: i32, data: *mut c_void) -> Option<Event> {
    // SAFETY: the event bases are immutable statics exported by ESP-IDF.
    let (prov, ble, session, wifi, ip) = unsafe {
        (
            WIFI_PROV_EVENT,
            PROTOCOMM_TRANSPORT_BLE_EVENT,
            PROTOCOMM_SECURITY_SESSION_EVENT,
            WIFI_EVENT,
            IP_EVENT,
        )
    };

    if base == prov {
        let event = match id as u32 {
            wifi_prov_cb_event_t_WIFI_PROV_START => ProvisioningEvent::Started,
            wifi_prov_cb_event_t_WIFI_PROV_CRED_RECV => {
                if data.is_null() {
                    return None;
                }
                let sta = unsafe { &*(data as *const wifi_sta_config_t) };
                match StaCredentials::from_raw(&sta.ssid, &sta.password) {
                    Ok(creds) => ProvisioningEvent::CredentialsReceived(creds),
                    Err(e) => {
                        warn!("Bridge: undecodable credentials: {}", e);
                        return None;
                    }
                }
            }
            wifi_prov_cb_event_t_WIFI_PROV_CRED_FAIL => {
                if data.is_null() {
                    return None;
                }
                let reason = unsafe { *(data as *const wifi_prov_sta_fail_reason_t) };
                let reason = if reason == wifi_prov_sta_fail_reason_t_WIFI_PROV_STA_AUTH_ERROR {
                    FailureReason::AuthError
                } else {
                    FailureReason::ApNotFound
                };
                ProvisioningEvent::CredentialsFailed(reason)
            }
            wifi_prov_cb_event_t_WIFI_PROV_CRED_SUCCESS => ProvisioningEvent::CredentialsAccepted,
            wifi_prov_cb_event_t_WIFI_PROV_END => ProvisioningEvent::SessionEnded,
            _ => return None,
        };
        return Some(event.into());
    }

    if base == wifi {
        let event = match id as u32 {
            wifi_event_t_WIFI_EVENT_STA_START => LinkEvent::LinkStarted,
            wifi_event_t_WIFI_EVENT_STA_DISCONNECTED => LinkEvent::LinkDisconnected,
            wifi_event_t_WIFI_EVENT_SCAN_DONE => LinkEvent::ScanCompleted,
            _ => return None,
        };
        return Some(event.into());
    }

    if base == ip {
        if id as u32 != ip_event_t_IP_EVENT_STA_GOT_IP || data.is_null() {
            return None;
        }
        let got_ip = unsafe { &*(data as *const ip_event_got_ip_t) };
        // lwIP keeps the address in network order.
        let addr = Ipv4Addr::from(got_ip.ip_info.ip.addr.to_le_bytes());
        return Some(LinkEvent::AddressAcquired(addr).into());
    }

    if base == ble {
        let event = match id as u32 {
            protocomm_transport_ble_event_t_PROTOCOMM_TRANSPORT_BLE_CONNECTED => {
                TransportEvent::PeerConnected
            }
            protocomm_transport_ble_event_t_PROTOCOMM_TRANSPORT_BLE_DISCONNECTED => {
                TransportEvent::PeerDisconnected
            }
            _ => return None,
        };
        return Some(event.into());
    }

    if base == session {
        let event = match id as u32 {
            protocomm_security_session_event_t_PROTOCOMM_SECURITY_SESSION_SETUP_OK => {
                SessionEvent::Established
            }
            protocomm_security_session_event_t_PROTOCOMM_SECURITY_SESSION_INVALID_SECURITY_PARAMS => {
                SessionEvent::InvalidParams
            }
            protocomm_security_session_event_t_PROTOCOMM_SECURITY_SESSION_CREDENTIALS_MISMATCH => {
                SessionEvent::CredentialMismatch
            }
            _ => return None,
        };
        return Some(event.into());
    }

    None
}

unsafe extern "C" fn on_event(
    _arg: *mut c_void,
    base: esp_event_base_t,
    id: i32,
    data: *mut c_void,
) {
    // SAFETY: ESP-IDF passes the documented payload for (base, id).
    let Some(event) = (unsafe { decode(base, id, data) }) else {
        return;
    };
    debug!("Bridge: {:?}", event);
    if !EVENT_QUEUE.push(event) {
        warn!("Bridge: event queue near full, diagnostic event dropped");
    }
}

/// Register the bridge on the default event loop.  The loop must exist
/// (take `EspSystemEventLoop` first).
pub fn register() -> Result<(), EspError> {
    // SAFETY: registering a 'static handler with no user data.
    unsafe {
        for base in [
            WIFI_PROV_EVENT,
            PROTOCOMM_TRANSPORT_BLE_EVENT,
            PROTOCOMM_SECURITY_SESSION_EVENT,
            WIFI_EVENT,
        ] {
            esp!(esp_event_handler_register(
                base,
                ESP_EVENT_ANY_ID,
                Some(on_event),
                ptr::null_mut()
            ))?;
        }
        esp!(esp_event_handler_register(
            IP_EVENT,
            ip_event_t_IP_EVENT_STA_GOT_IP as i32,
            Some(on_event),
            ptr::null_mut()
        ))?;
    }
    Ok(())
}
