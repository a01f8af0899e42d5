//! Outbound commands issued by the orchestrator.
//!
//! Each handled event produces at most one of these.  The first three go
//! to the provisioning service, `Connect` goes to the link service.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear a failed attempt so the client can resubmit credentials.
    ResetAttemptState,
    /// Arm a clean re-provision, keeping the accepted credentials.
    ResetForReprovision,
    /// Tear down the provisioning service.
    Deinitialize,
    /// Join the network with stored credentials.
    Connect,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Self::ResetAttemptState => "reset_attempt_state",
            Self::ResetForReprovision => "reset_for_reprovision",
            Self::Deinitialize => "deinitialize",
            Self::Connect => "connect",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
