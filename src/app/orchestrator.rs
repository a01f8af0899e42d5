//! Provisioning orchestrator, the hexagonal core.
//!
//! [`Orchestrator`] maps every event from the four producers to at most
//! one [`Command`] and applies it through the ports.  [`Dispatcher`] wraps
//! it in a mutex so producers on any thread can deliver events while
//! transitions stay serialized.
//!
//! ```text
//!  Prov mgr ─┐                                    ┌──▶ ProvisioningPort
//!  Wi-Fi    ─┤    ┌────────────┐    ┌─────────┐   │
//!  BLE      ─┼──▶ │ Dispatcher │──▶ │ Orchestr│───┤
//!  Session  ─┘    │  (Mutex)   │    │  ator   │   └──▶ LinkPort
//!                 └────────────┘    └─────────┘
//! ```
//!
//! Command failures on the provisioning service halt the provisioning
//! lifecycle: the error is returned once and every later provisioning
//! event is refused with [`Error::Halted`].  Link, transport and session
//! events keep flowing.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::adapters::device_id::{self, DeviceIdentity, MacAddress};
use crate::config::ProvisioningConfig;
use crate::error::{Error, Result};
use crate::events::{
    Event, LinkEvent, ProvisioningEvent, SessionEvent, StaCredentials, TransportEvent,
};
use crate::fsm::{self, Phase};

use super::commands::Command;
use super::launch;
use super::ports::{LinkPort, ProvisioningPort};
use super::registry;
use super::status::StatusBoard;

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Log text for received credentials.  The password appears only when
/// `reveal` is set; otherwise just its length.
pub fn describe_credentials(creds: &StaCredentials, reveal: bool) -> String {
    if reveal {
        format!(
            "Received Wi-Fi credentials\n\tSSID     : {}\n\tPassword : {}",
            creds.ssid, creds.password
        )
    } else {
        format!(
            "Received Wi-Fi credentials\n\tSSID     : {}\n\tPassword : <{} bytes>",
            creds.ssid,
            creds.password.len()
        )
    }
}

pub struct Orchestrator<P: ProvisioningPort, L: LinkPort> {
    config: ProvisioningConfig,
    mac: MacAddress,
    identity: DeviceIdentity,
    prov: P,
    link: L,
    phase: Phase,
    halted: bool,
    status: Arc<StatusBoard>,
}

impl<P: ProvisioningPort, L: LinkPort> Orchestrator<P, L> {
    /// Validate `config` and derive the device identity from `mac`.
    ///
    /// Does **not** touch the provisioning service; call [`launch`](Self::launch)
    /// to bring it up.
    pub fn new(
        config: ProvisioningConfig,
        mac: &MacAddress,
        prov: P,
        link: L,
        status: Arc<StatusBoard>,
    ) -> Result<Self> {
        config.validate()?;
        let identity = device_id::service_name(&config.identity_prefix, mac)?;
        info!("Orchestrator: device identity {}", identity);
        status.set_phase(Phase::Idle);

        Ok(Self {
            config,
            mac: *mac,
            identity,
            prov,
            link,
            phase: Phase::Idle,
            halted: false,
            status,
        })
    }

    /// Run the launch sequence against the owned provisioning service.
    pub fn launch(&mut self) -> Result<()> {
        launch::launch(&mut self.prov, &self.config, &self.identity)
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle one event.  Returns the command that was issued, if any.
    ///
    /// A link connect failure is logged and still reported as
    /// `Some(Command::Connect)`: retries belong to the link service.
    pub fn handle(&mut self, event: Event) -> Result<Option<Command>> {
        if self.halted && matches!(event, Event::Provisioning(_)) {
            warn!("Orchestrator: provisioning halted, dropping {:?}", event);
            return Err(Error::Halted);
        }

        let next = fsm::next(self.phase, &event);
        if next != self.phase {
            debug!("Phase {} -> {}", self.phase.name(), next.name());
            self.phase = next;
            self.status.set_phase(next);
        }

        match event {
            Event::Provisioning(e) => self.on_provisioning(e),
            Event::Link(e) => self.on_link(e),
            Event::Transport(e) => {
                self.on_transport(e);
                Ok(None)
            }
            Event::Session(e) => {
                self.on_session(e);
                Ok(None)
            }
        }
    }

    fn on_provisioning(&mut self, event: ProvisioningEvent) -> Result<Option<Command>> {
        match event {
            ProvisioningEvent::Started => {
                info!("Provisioning started");
                Ok(None)
            }
            ProvisioningEvent::CredentialsReceived(creds) => {
                self.log_credentials(&creds);
                Ok(None)
            }
            ProvisioningEvent::CredentialsFailed(reason) => {
                warn!(
                    "Provisioning failed!\n\tReason : {}\n\tPlease {} and resubmit",
                    reason,
                    reason.operator_hint()
                );
                warn!("Persistent failures require a factory reset to clear stored credentials");
                self.status.record_failure();
                self.apply(Command::ResetAttemptState)
            }
            ProvisioningEvent::CredentialsAccepted => {
                info!("Provisioning successful");
                self.status.record_accepted();
                self.apply(Command::ResetForReprovision)
            }
            ProvisioningEvent::SessionEnded => {
                info!("Provisioning ended");
                self.apply(Command::Deinitialize)
            }
        }
    }

    fn on_link(&mut self, event: LinkEvent) -> Result<Option<Command>> {
        match event {
            LinkEvent::LinkStarted => {
                info!("Wi-Fi started in STA mode");
                self.identity = device_id::service_name(&self.config.identity_prefix, &self.mac)?;
                debug!("Identity at link start: {}", self.identity);
                if registry::has_stored_credentials(&self.prov)? {
                    info!("Attempting to connect with stored credentials");
                    self.apply(Command::Connect)
                } else {
                    Ok(None)
                }
            }
            LinkEvent::LinkDisconnected => {
                self.status.set_link_up(false);
                info!("Wi-Fi disconnected");
                Ok(None)
            }
            LinkEvent::ScanCompleted => {
                info!("Wi-Fi scan complete");
                Ok(None)
            }
            LinkEvent::AddressAcquired(ip) => {
                self.status.set_link_up(true);
                info!("Connected with IP address: {}", ip);
                Ok(None)
            }
        }
    }

    fn on_transport(&self, event: TransportEvent) {
        match event {
            TransportEvent::PeerConnected => info!("BLE transport: connected"),
            TransportEvent::PeerDisconnected => info!("BLE transport: disconnected"),
        }
    }

    fn on_session(&self, event: SessionEvent) {
        match event {
            SessionEvent::Established => info!("Secure session established"),
            SessionEvent::InvalidParams => {
                error!("Received invalid security parameters for secure session")
            }
            SessionEvent::CredentialMismatch => {
                error!("Received incorrect username and/or PoP for secure session")
            }
        }
    }

    fn log_credentials(&self, creds: &StaCredentials) {
        info!("{}", describe_credentials(creds, self.config.log_credentials));
    }

    // ── Command application ───────────────────────────────────

    fn apply(&mut self, cmd: Command) -> Result<Option<Command>> {
        let res = match cmd {
            Command::ResetAttemptState => self.prov.reset_attempt_state(),
            Command::ResetForReprovision => self.prov.reset_for_reprovision(),
            Command::Deinitialize => self.prov.deinitialize(),
            Command::Connect => {
                if let Err(e) = self.link.connect() {
                    warn!("Connect request failed: {}", e);
                }
                return Ok(Some(cmd));
            }
        };

        match res {
            Ok(()) => {
                debug!("Issued {}", cmd);
                Ok(Some(cmd))
            }
            Err(e) => {
                error!("Command {} failed: {}; halting provisioning", cmd, e);
                self.halted = true;
                self.status.set_halted();
                Err(Error::Command(e))
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_session_open(&self) -> bool {
        self.phase.is_session_open()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    pub fn provisioning(&self) -> &P {
        &self.prov
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

/// Thread-safe entry point.  Every producer shares one `Dispatcher`; the
/// lock makes each event's transition and command atomic.
pub struct Dispatcher<P: ProvisioningPort, L: LinkPort> {
    inner: Mutex<Orchestrator<P, L>>,
}

impl<P: ProvisioningPort, L: LinkPort> Dispatcher<P, L> {
    pub fn new(orchestrator: Orchestrator<P, L>) -> Self {
        Self {
            inner: Mutex::new(orchestrator),
        }
    }

    pub fn dispatch(&self, event: Event) -> Result<Option<Command>> {
        let mut orch = self.inner.lock().map_err(|_| Error::Poisoned)?;
        orch.handle(event)
    }

    /// Run `f` with shared access to the orchestrator.
    pub fn with<R>(&self, f: impl FnOnce(&Orchestrator<P, L>) -> R) -> Result<R> {
        let orch = self.inner.lock().map_err(|_| Error::Poisoned)?;
        Ok(f(&orch))
    }

    pub fn into_inner(self) -> Result<Orchestrator<P, L>> {
        self.inner.into_inner().map_err(|_| Error::Poisoned)
    }
}
