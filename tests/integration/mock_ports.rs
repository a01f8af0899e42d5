//! Mock provisioning and link ports for integration tests.
//!
//! Both mocks append to one shared call log so tests can assert on the
//! global order of commands across the two services.

use std::sync::{Arc, Mutex};

use kaivac::app::endpoint::EndpointFn;
use kaivac::app::ports::{CommandError, LinkError, LinkPort, ProvisioningPort, StorageError};
use kaivac::config::Security;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    SetServiceUuid([u8; 16]),
    CreateEndpoint(String),
    DisableAutoStop(u32),
    Start { level: u8, identity: String },
    RegisterEndpoint(String),
    ResetAttemptState,
    ResetForReprovision,
    Deinitialize,
    Connect,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub fn count(log: &CallLog, call: &Call) -> usize {
    log.lock().unwrap().iter().filter(|c| *c == call).count()
}

// ── MockProvisioning ──────────────────────────────────────────

pub struct MockProvisioning {
    log: CallLog,
    pub provisioned: bool,
    pub query_error: Option<StorageError>,
    pub fail_op: Option<&'static str>,
    pub registered: Option<EndpointFn>,
}

#[allow(dead_code)]
impl MockProvisioning {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            provisioned: false,
            query_error: None,
            fail_op: None,
            registered: None,
        }
    }

    pub fn provisioned(log: CallLog) -> Self {
        Self {
            provisioned: true,
            ..Self::new(log)
        }
    }

    fn record(&mut self, op: &'static str, call: Call) -> Result<(), CommandError> {
        if self.fail_op == Some(op) {
            return Err(CommandError::new(op, -1));
        }
        self.log.lock().unwrap().push(call);
        Ok(())
    }
}

impl ProvisioningPort for MockProvisioning {
    fn init(&mut self) -> Result<(), CommandError> {
        self.record("init", Call::Init)
    }

    fn set_service_uuid(&mut self, uuid: &[u8; 16]) -> Result<(), CommandError> {
        self.record("set_service_uuid", Call::SetServiceUuid(*uuid))
    }

    fn create_endpoint(&mut self, name: &str) -> Result<(), CommandError> {
        self.record("create_endpoint", Call::CreateEndpoint(name.into()))
    }

    fn disable_auto_stop(&mut self, grace_ms: u32) -> Result<(), CommandError> {
        self.record("disable_auto_stop", Call::DisableAutoStop(grace_ms))
    }

    fn start(
        &mut self,
        security: &Security,
        identity: &str,
        _service_key: Option<&str>,
    ) -> Result<(), CommandError> {
        self.record(
            "start",
            Call::Start {
                level: security.level(),
                identity: identity.into(),
            },
        )
    }

    fn register_endpoint(&mut self, name: &str, handler: EndpointFn) -> Result<(), CommandError> {
        self.record("register_endpoint", Call::RegisterEndpoint(name.into()))?;
        self.registered = Some(handler);
        Ok(())
    }

    fn reset_attempt_state(&mut self) -> Result<(), CommandError> {
        self.record("reset_attempt_state", Call::ResetAttemptState)
    }

    fn reset_for_reprovision(&mut self) -> Result<(), CommandError> {
        self.record("reset_for_reprovision", Call::ResetForReprovision)
    }

    fn deinitialize(&mut self) -> Result<(), CommandError> {
        self.record("deinitialize", Call::Deinitialize)
    }

    fn is_provisioned(&self) -> Result<bool, StorageError> {
        match self.query_error {
            Some(e) => Err(e),
            None => Ok(self.provisioned),
        }
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    log: CallLog,
    pub refuse: Option<LinkError>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new(log: CallLog) -> Self {
        Self { log, refuse: None }
    }
}

impl LinkPort for MockLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.log.lock().unwrap().push(Call::Connect);
        match self.refuse {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
