//! Full provisioning flow against the simulation adapters.
//!
//! The simulated provisioning manager enforces the real manager's call
//! order, so these tests catch commands issued in the wrong lifecycle
//! state.  Events travel through an `EventQueue` the way the ESP-IDF
//! bridge delivers them.

use std::sync::Arc;

use kaivac::Error;
use kaivac::adapters::nvs::NvsAdapter;
use kaivac::adapters::prov_mgr::{ERR_INVALID_STATE, Lifecycle, ProvisioningManager};
use kaivac::adapters::wifi::WifiLink;
use kaivac::app::orchestrator::{Dispatcher, Orchestrator};
use kaivac::app::ports::{CommandError, ConfigPort};
use kaivac::app::status::StatusBoard;
use kaivac::config::ProvisioningConfig;
use kaivac::events::{
    Event, EventQueue, FailureReason, LinkEvent, ProvisioningEvent, SessionEvent, StaCredentials,
    TransportEvent,
};
use kaivac::fsm::Phase;

const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x9E, 0x05, 0xB1];

fn launched(prov: ProvisioningManager) -> Dispatcher<ProvisioningManager, WifiLink> {
    let mut o = Orchestrator::new(
        ProvisioningConfig::default(),
        &MAC,
        prov,
        WifiLink::new(),
        Arc::new(StatusBoard::new()),
    )
    .unwrap();
    o.launch().unwrap();
    Dispatcher::new(o)
}

fn creds() -> StaCredentials {
    StaCredentials::new("HomeNet", "correct horse").unwrap()
}

#[test]
fn first_boot_provisioning_then_reboot_connects() {
    let nvs = NvsAdapter::new().unwrap();
    let config = nvs.load().unwrap();
    assert_eq!(config, ProvisioningConfig::default());

    let d = launched(ProvisioningManager::new(nvs));
    d.with(|o| {
        assert_eq!(o.identity().as_str(), "Kaivac_9E_05_B1");
        assert_eq!(o.provisioning().identity(), "Kaivac_9E_05_B1");
        assert_eq!(o.provisioning().lifecycle(), Lifecycle::Started);
        assert_eq!(o.provisioning().auto_stop_grace_ms(), Some(1000));
    })
    .unwrap();

    // Station starts before any credentials exist.
    assert_eq!(d.dispatch(LinkEvent::LinkStarted.into()).unwrap(), None);

    let queue = EventQueue::new();
    for e in [
        Event::from(ProvisioningEvent::Started),
        TransportEvent::PeerConnected.into(),
        SessionEvent::Established.into(),
        ProvisioningEvent::CredentialsReceived(creds()).into(),
        ProvisioningEvent::CredentialsFailed(FailureReason::AuthError).into(),
        ProvisioningEvent::CredentialsReceived(creds()).into(),
    ] {
        assert!(queue.push(e));
    }
    queue.drain(|e| {
        d.dispatch(e).unwrap();
    });
    assert!(queue.is_empty());
    assert_eq!(d.with(|o| o.phase()).unwrap(), Phase::CredentialExchange);

    // Client talks to the custom endpoint during the session.
    let reply = d
        .with(|o| o.provisioning().invoke_endpoint("custom-data", 7, Some(b"PING")))
        .unwrap()
        .unwrap();
    assert_eq!(reply, b"SUCCESS\0");

    d.dispatch(ProvisioningEvent::CredentialsAccepted.into())
        .unwrap();
    d.dispatch(LinkEvent::AddressAcquired([192, 168, 1, 40].into()).into())
        .unwrap();
    d.dispatch(ProvisioningEvent::SessionEnded.into()).unwrap();

    let o = d.into_inner().unwrap();
    assert_eq!(o.phase(), Phase::Terminated);
    assert_eq!(o.provisioning().lifecycle(), Lifecycle::Deinitialized);
    assert_eq!(o.provisioning().deinit_count(), 1);
    assert_eq!(
        o.provisioning()
            .invoke_endpoint("custom-data", 7, None),
        Err(CommandError::new("invoke_endpoint", ERR_INVALID_STATE))
    );

    // The manager persisted the accepted credentials; on the next boot
    // the link start triggers exactly one connect.
    let nvs = {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.store_sta_credentials(&creds()).unwrap();
        nvs
    };
    let d = launched(ProvisioningManager::new(nvs));
    d.dispatch(LinkEvent::LinkStarted.into()).unwrap();
    assert_eq!(d.with(|o| o.link().attempts()).unwrap(), 1);
}

#[test]
fn stored_credentials_drive_connect_through_manager_query() {
    let mut prov = ProvisioningManager::new(NvsAdapter::new().unwrap());
    prov.store_credentials(&creds()).unwrap();
    let d = launched(prov);

    d.dispatch(LinkEvent::LinkStarted.into()).unwrap();
    d.dispatch(LinkEvent::LinkDisconnected.into()).unwrap();
    d.dispatch(LinkEvent::ScanCompleted.into()).unwrap();
    assert_eq!(d.with(|o| o.link().attempts()).unwrap(), 1);
}

#[test]
fn failed_query_reaches_caller() {
    let mut prov = ProvisioningManager::new(NvsAdapter::new().unwrap());
    prov.fail_queries(true);
    let d = launched(prov);

    assert!(matches!(
        d.dispatch(LinkEvent::LinkStarted.into()),
        Err(Error::Storage(_))
    ));
    assert_eq!(d.with(|o| o.link().attempts()).unwrap(), 0);
}

#[test]
fn manager_rejection_halts_provisioning() {
    let mut prov = ProvisioningManager::new(NvsAdapter::new().unwrap());
    prov.fail_next("reset_for_reprovision");
    let d = launched(prov);

    let err = d
        .dispatch(ProvisioningEvent::CredentialsAccepted.into())
        .unwrap_err();
    assert!(err.halts_provisioning());
    assert_eq!(
        d.dispatch(ProvisioningEvent::SessionEnded.into()),
        Err(Error::Halted)
    );
    assert_eq!(d.with(|o| o.provisioning().deinit_count()).unwrap(), 0);
    assert!(d.with(|o| o.is_halted()).unwrap());
}

#[test]
fn repeated_session_end_deinitializes_each_time() {
    let d = launched(ProvisioningManager::new(NvsAdapter::new().unwrap()));
    d.dispatch(ProvisioningEvent::SessionEnded.into()).unwrap();
    d.dispatch(ProvisioningEvent::SessionEnded.into()).unwrap();
    assert_eq!(d.with(|o| o.provisioning().deinit_count()).unwrap(), 2);
}
