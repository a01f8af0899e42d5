//! Read-only status shared with the heartbeat.
//!
//! The orchestrator writes, the heartbeat reads.  Plain atomics: the
//! heartbeat must never wait on the dispatcher lock.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::fsm::Phase;

#[derive(Debug)]
pub struct StatusBoard {
    phase: AtomicU8,
    halted: AtomicBool,
    link_up: AtomicBool,
    failed_attempts: AtomicU32,
    accepted: AtomicU32,
}

/// Point-in-time copy of the [`StatusBoard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub halted: bool,
    pub link_up: bool,
    pub failed_attempts: u32,
    pub accepted: u32,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            halted: AtomicBool::new(false),
            link_up: AtomicBool::new(false),
            failed_attempts: AtomicU32::new(0),
            accepted: AtomicU32::new(0),
        }
    }

    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    pub fn set_halted(&self) {
        self.halted.store(true, Ordering::Relaxed);
    }

    pub fn set_link_up(&self, up: bool) {
        self.link_up.store(up, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: Phase::from_index(self.phase.load(Ordering::Relaxed)),
            halted: self.halted.load(Ordering::Relaxed),
            link_up: self.link_up.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
        }
    }
}
