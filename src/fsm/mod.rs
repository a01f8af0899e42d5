//! Provisioning phase machine.
//!
//! ```text
//!            Started            Established        CredentialsReceived
//!   Idle ───────────▶ Advertising ──────────▶ SessionOpen ──────────▶ CredentialExchange
//!    ▲                    ▲  ▲                  │    ▲                       │
//!    │                    │  └─ PeerDisconnected┘    └── Failed / Accepted ──┘
//!    │                    │
//!    │                 Started
//!    │                    │
//!    └────────────── Terminated ◀──────── SessionEnded (from any phase)
//! ```
//!
//! The phase is bookkeeping only: the orchestrator's command for an event
//! never depends on it.  It backs the "session open" flag and the status
//! shown by the heartbeat.

use crate::events::{Event, ProvisioningEvent, SessionEvent, TransportEvent};

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Advertising = 1,
    SessionOpen = 2,
    CredentialExchange = 3,
    Terminated = 4,
}

impl Phase {
    /// Convert a raw discriminant back to `Phase`.  Unknown values map to
    /// `Terminated` in release builds.
    pub fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Advertising,
            2 => Self::SessionOpen,
            3 => Self::CredentialExchange,
            4 => Self::Terminated,
            _ => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::Terminated
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Advertising => "advertising",
            Self::SessionOpen => "session-open",
            Self::CredentialExchange => "credential-exchange",
            Self::Terminated => "terminated",
        }
    }

    /// Whether a secure session with a provisioning client is open.
    pub fn is_session_open(self) -> bool {
        matches!(self, Self::SessionOpen | Self::CredentialExchange)
    }
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

/// Phase after `event` is applied to `phase`.
pub fn next(phase: Phase, event: &Event) -> Phase {
    match event {
        Event::Provisioning(ProvisioningEvent::Started) => Phase::Advertising,
        Event::Provisioning(ProvisioningEvent::SessionEnded) => Phase::Terminated,
        Event::Provisioning(ProvisioningEvent::CredentialsReceived(_))
            if phase != Phase::Terminated =>
        {
            Phase::CredentialExchange
        }
        Event::Provisioning(
            ProvisioningEvent::CredentialsFailed(_) | ProvisioningEvent::CredentialsAccepted,
        ) if phase != Phase::Terminated => Phase::SessionOpen,
        Event::Session(SessionEvent::Established)
            if matches!(phase, Phase::Idle | Phase::Advertising) =>
        {
            Phase::SessionOpen
        }
        Event::Transport(TransportEvent::PeerDisconnected) if phase.is_session_open() => {
            Phase::Advertising
        }
        _ => phase,
    }
}
