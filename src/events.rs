//! Typed events from the four provisioning subsystems.
//!
//! Events are produced by:
//! - the provisioning manager (credential intake and lifecycle)
//! - the Wi-Fi station (link start, disconnect, scan, address)
//! - the BLE transport (peer connect/disconnect)
//! - the secure-session layer (handshake outcome)
//!
//! Each producer has its own enum so the orchestrator matches every kind
//! exhaustively.  Producers run in ESP-IDF callback context and hand
//! events to the main task through an [`EventQueue`].
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Prov mgr    │────▶│              │     │              │
//! │ Wi-Fi       │────▶│  EventQueue  │────▶│  Dispatcher  │
//! │ BLE         │────▶│  (bounded)   │     │  (main task) │
//! │ Session     │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::fmt;
use std::net::Ipv4Addr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::String;

const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Slots only events that drive a command or a status bit may fill.
pub const EVENT_QUEUE_RESERVED: usize = 4;

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Station credentials submitted by the provisioning client.
#[derive(Clone, PartialEq, Eq)]
pub struct StaCredentials {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_PASSWORD_LEN>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    DataTooLong,
    InvalidUtf8,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataTooLong => write!(f, "credential field exceeds its fixed length"),
            Self::InvalidUtf8 => write!(f, "credential field is not valid UTF-8"),
        }
    }
}

/// Cut a C field at its first NUL and check it fits `max_len`.
fn c_field(raw: &[u8], max_len: usize) -> Result<&str, CredentialError> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    if end > max_len {
        return Err(CredentialError::DataTooLong);
    }
    core::str::from_utf8(&raw[..end]).map_err(|_| CredentialError::InvalidUtf8)
}

impl StaCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, CredentialError> {
        Self::from_raw(ssid.as_bytes(), password.as_bytes())
    }

    /// Decode the fixed-size, possibly unterminated fields of a station config.
    pub fn from_raw(ssid: &[u8], password: &[u8]) -> Result<Self, CredentialError> {
        let mut creds = Self {
            ssid: String::new(),
            password: String::new(),
        };
        creds
            .ssid
            .push_str(c_field(ssid, MAX_SSID_LEN)?)
            .map_err(|_| CredentialError::DataTooLong)?;
        creds
            .password
            .push_str(c_field(password, MAX_PASSWORD_LEN)?)
            .map_err(|_| CredentialError::DataTooLong)?;
        Ok(creds)
    }
}

impl fmt::Debug for StaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why the station could not join with the submitted credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AuthError,
    ApNotFound,
}

impl FailureReason {
    /// What the operator should check before resubmitting.
    pub fn operator_hint(self) -> &'static str {
        match self {
            Self::AuthError => "re-enter the Wi-Fi password",
            Self::ApNotFound => "check that the access point is powered and in range",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthError => write!(f, "Wi-Fi station authentication failed"),
            Self::ApNotFound => write!(f, "Wi-Fi access-point not found"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Per-producer events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningEvent {
    Started,
    CredentialsReceived(StaCredentials),
    CredentialsFailed(FailureReason),
    CredentialsAccepted,
    SessionEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    LinkStarted,
    LinkDisconnected,
    ScanCompleted,
    AddressAcquired(Ipv4Addr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    PeerConnected,
    PeerDisconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Established,
    InvalidParams,
    CredentialMismatch,
}

/// An event tagged with its producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Provisioning(ProvisioningEvent),
    Link(LinkEvent),
    Transport(TransportEvent),
    Session(SessionEvent),
}

impl Event {
    /// Diagnostic-only events the queue may shed under pressure.
    /// Everything else is delivered even if the producer has to wait.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            Self::Link(LinkEvent::LinkDisconnected | LinkEvent::ScanCompleted)
                | Self::Transport(_)
                | Self::Session(_)
        )
    }
}

impl From<ProvisioningEvent> for Event {
    fn from(e: ProvisioningEvent) -> Self {
        Self::Provisioning(e)
    }
}

impl From<LinkEvent> for Event {
    fn from(e: LinkEvent) -> Self {
        Self::Link(e)
    }
}

impl From<TransportEvent> for Event {
    fn from(e: TransportEvent) -> Self {
        Self::Transport(e)
    }
}

impl From<SessionEvent> for Event {
    fn from(e: SessionEvent) -> Self {
        Self::Session(e)
    }
}

// ───────────────────────────────────────────────────────────────
// Event queue
// ───────────────────────────────────────────────────────────────

/// Bounded MPMC queue between callback context and the main task.
///
/// Droppable events are refused once the queue is within
/// [`EVENT_QUEUE_RESERVED`] slots of full.  All other events are never
/// lost: when the queue is full the producer blocks until the consumer
/// frees a slot.  Dropping never reorders the events that remain.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
}

/// Queue fed by the ESP-IDF event bridge.
pub static EVENT_QUEUE: EventQueue = EventQueue::new();

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue an event.  Returns `false` only when a droppable event was
    /// shed; any other event is queued, waiting for room if needed.
    pub fn push(&self, event: Event) -> bool {
        if event.is_droppable() {
            if self.channel.len() >= EVENT_QUEUE_CAP - EVENT_QUEUE_RESERVED {
                return false;
            }
            return self.channel.try_send(event).is_ok();
        }
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                futures_lite::future::block_on(self.channel.send(event));
                true
            }
        }
    }

    /// Wait for the next event.
    pub async fn next(&self) -> Event {
        self.channel.receive().await
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Ok(event) = self.channel.try_receive() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}
