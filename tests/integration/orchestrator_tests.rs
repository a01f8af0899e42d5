//! Orchestrator command policy against recording mocks.

use std::sync::Arc;
use std::thread;

use kaivac::Error;
use kaivac::app::commands::Command;
use kaivac::app::orchestrator::{Dispatcher, Orchestrator};
use kaivac::app::ports::{LinkError, StorageError};
use kaivac::app::status::StatusBoard;
use kaivac::config::{DEFAULT_SERVICE_UUID, ProvisioningConfig, Security};
use kaivac::events::{
    Event, FailureReason, LinkEvent, ProvisioningEvent, SessionEvent, StaCredentials,
    TransportEvent,
};

use crate::mock_ports::{Call, CallLog, MockLink, MockProvisioning, calls, count, new_log};

const MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0x11, 0x22, 0x33];

fn orchestrator(prov: MockProvisioning, log: &CallLog) -> Orchestrator<MockProvisioning, MockLink> {
    Orchestrator::new(
        ProvisioningConfig::default(),
        &MAC,
        prov,
        MockLink::new(log.clone()),
        Arc::new(StatusBoard::new()),
    )
    .unwrap()
}

fn received(ssid: &str) -> Event {
    ProvisioningEvent::CredentialsReceived(StaCredentials::new(ssid, "password1").unwrap()).into()
}

// ── Launch ────────────────────────────────────────────────────

#[test]
fn launch_runs_in_manager_order() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::new(log.clone()), &log);
    o.launch().unwrap();

    assert_eq!(
        calls(&log),
        vec![
            Call::Init,
            Call::SetServiceUuid(DEFAULT_SERVICE_UUID),
            Call::CreateEndpoint("custom-data".into()),
            Call::DisableAutoStop(1000),
            Call::Start {
                level: 1,
                identity: "Kaivac_11_22_33".into()
            },
            Call::RegisterEndpoint("custom-data".into()),
        ]
    );

    let handler = o.provisioning().registered.unwrap();
    assert_eq!(handler(3, Some(b"PING")).unwrap(), b"SUCCESS\0");
}

#[test]
fn launch_without_grace_keeps_auto_stop() {
    let log = new_log();
    let config = ProvisioningConfig {
        auto_stop_grace_ms: None,
        security: Security::Sec0,
        ..Default::default()
    };
    let mut o = Orchestrator::new(
        config,
        &MAC,
        MockProvisioning::new(log.clone()),
        MockLink::new(log.clone()),
        Arc::new(StatusBoard::new()),
    )
    .unwrap();
    o.launch().unwrap();
    assert!(!calls(&log).iter().any(|c| matches!(c, Call::DisableAutoStop(_))));
    assert!(calls(&log).contains(&Call::Start {
        level: 0,
        identity: "Kaivac_11_22_33".into()
    }));
}

#[test]
fn launch_stops_at_first_failure() {
    let log = new_log();
    let mut prov = MockProvisioning::new(log.clone());
    prov.fail_op = Some("create_endpoint");
    let mut o = orchestrator(prov, &log);
    assert!(matches!(o.launch(), Err(Error::Command(_))));
    assert_eq!(
        calls(&log),
        vec![Call::Init, Call::SetServiceUuid(DEFAULT_SERVICE_UUID)]
    );
}

// ── Credential outcomes ───────────────────────────────────────

#[test]
fn auth_error_then_resubmit_has_one_reset_between() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::new(log.clone()), &log);

    o.handle(received("X")).unwrap();
    o.handle(ProvisioningEvent::CredentialsFailed(FailureReason::AuthError).into())
        .unwrap();
    let before = calls(&log).len();
    o.handle(received("X")).unwrap();

    assert_eq!(calls(&log), vec![Call::ResetAttemptState]);
    assert_eq!(calls(&log).len(), before);
}

#[test]
fn accepted_issues_one_reprovision_and_defers_deinit() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::new(log.clone()), &log);

    let cmd = o.handle(ProvisioningEvent::CredentialsAccepted.into()).unwrap();
    assert_eq!(cmd, Some(Command::ResetForReprovision));
    o.handle(TransportEvent::PeerDisconnected.into()).unwrap();
    assert_eq!(count(&log, &Call::Deinitialize), 0);

    o.handle(ProvisioningEvent::SessionEnded.into()).unwrap();
    assert_eq!(
        calls(&log),
        vec![Call::ResetForReprovision, Call::Deinitialize]
    );
}

#[test]
fn session_errors_are_observe_only() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::new(log.clone()), &log);
    for e in [SessionEvent::InvalidParams, SessionEvent::CredentialMismatch] {
        assert_eq!(o.handle(e.into()).unwrap(), None);
    }
    assert!(calls(&log).is_empty());
}

// ── Link start ────────────────────────────────────────────────

#[test]
fn link_start_connects_once_when_provisioned() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::provisioned(log.clone()), &log);
    assert_eq!(
        o.handle(LinkEvent::LinkStarted.into()).unwrap(),
        Some(Command::Connect)
    );
    assert_eq!(calls(&log), vec![Call::Connect]);
}

#[test]
fn link_start_without_credentials_does_nothing() {
    let log = new_log();
    let mut o = orchestrator(MockProvisioning::new(log.clone()), &log);
    assert_eq!(o.handle(LinkEvent::LinkStarted.into()).unwrap(), None);
    assert!(calls(&log).is_empty());
}

#[test]
fn link_start_query_failure_is_hard_error() {
    let log = new_log();
    let mut prov = MockProvisioning::provisioned(log.clone());
    prov.query_error = Some(StorageError::IoError);
    let mut o = orchestrator(prov, &log);

    assert_eq!(
        o.handle(LinkEvent::LinkStarted.into()),
        Err(Error::Storage(StorageError::IoError))
    );
    assert!(calls(&log).is_empty());
    // Provisioning continues; only the connect decision was aborted.
    assert_eq!(
        o.handle(ProvisioningEvent::SessionEnded.into()).unwrap(),
        Some(Command::Deinitialize)
    );
}

#[test]
fn connect_failure_left_to_link_service() {
    let log = new_log();
    let mut link = MockLink::new(log.clone());
    link.refuse = Some(LinkError::ConnectFailed(0x3007));
    let mut o = Orchestrator::new(
        ProvisioningConfig::default(),
        &MAC,
        MockProvisioning::provisioned(log.clone()),
        link,
        Arc::new(StatusBoard::new()),
    )
    .unwrap();

    assert_eq!(
        o.handle(LinkEvent::LinkStarted.into()).unwrap(),
        Some(Command::Connect)
    );
    o.handle(LinkEvent::LinkDisconnected.into()).unwrap();
    assert_eq!(count(&log, &Call::Connect), 1);
}

// ── Fatal command failures ────────────────────────────────────

#[test]
fn command_failure_halts_provisioning_only() {
    let log = new_log();
    let mut prov = MockProvisioning::provisioned(log.clone());
    prov.fail_op = Some("reset_attempt_state");
    let status = Arc::new(StatusBoard::new());
    let mut o = Orchestrator::new(
        ProvisioningConfig::default(),
        &MAC,
        prov,
        MockLink::new(log.clone()),
        status.clone(),
    )
    .unwrap();

    let r = o.handle(ProvisioningEvent::CredentialsFailed(FailureReason::ApNotFound).into());
    assert!(matches!(r, Err(Error::Command(e)) if e.op == "reset_attempt_state"));
    assert!(status.snapshot().halted);

    assert_eq!(
        o.handle(ProvisioningEvent::SessionEnded.into()),
        Err(Error::Halted)
    );
    assert_eq!(count(&log, &Call::Deinitialize), 0);

    assert_eq!(
        o.handle(LinkEvent::LinkStarted.into()).unwrap(),
        Some(Command::Connect)
    );
}

// ── End-to-end scenario ───────────────────────────────────────

#[test]
fn end_to_end_command_sequence() {
    let log = new_log();
    let o = orchestrator(MockProvisioning::provisioned(log.clone()), &log);
    let d = Dispatcher::new(o);

    let script: Vec<(Event, Option<Command>)> = vec![
        (LinkEvent::LinkStarted.into(), Some(Command::Connect)),
        (ProvisioningEvent::Started.into(), None),
        (received("X"), None),
        (
            ProvisioningEvent::CredentialsFailed(FailureReason::ApNotFound).into(),
            Some(Command::ResetAttemptState),
        ),
        (received("X"), None),
        (
            ProvisioningEvent::CredentialsAccepted.into(),
            Some(Command::ResetForReprovision),
        ),
        (
            ProvisioningEvent::SessionEnded.into(),
            Some(Command::Deinitialize),
        ),
    ];

    for (event, expected) in script {
        assert_eq!(d.dispatch(event).unwrap(), expected);
    }

    assert_eq!(
        calls(&log),
        vec![
            Call::Connect,
            Call::ResetAttemptState,
            Call::ResetForReprovision,
            Call::Deinitialize,
        ]
    );
}

// ── Concurrent delivery ───────────────────────────────────────

#[test]
fn concurrent_session_ends_deinit_once_each() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 25;

    let log = new_log();
    let d = Arc::new(Dispatcher::new(orchestrator(
        MockProvisioning::provisioned(log.clone()),
        &log,
    )));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|i| {
            let d = d.clone();
            thread::spawn(move || {
                for _ in 0..PER_PRODUCER {
                    let event: Event = if i % 2 == 0 {
                        ProvisioningEvent::SessionEnded.into()
                    } else {
                        LinkEvent::LinkStarted.into()
                    };
                    d.dispatch(event).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let ended = PRODUCERS.div_ceil(2) * PER_PRODUCER;
    let started = (PRODUCERS / 2) * PER_PRODUCER;
    assert_eq!(count(&log, &Call::Deinitialize), ended);
    assert_eq!(count(&log, &Call::Connect), started);
}
