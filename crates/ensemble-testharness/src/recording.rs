//! ---
//! ens_section: "11-testing"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Recording doubles for ensemble lifecycle tests."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::sync::Arc;

use async_trait::async_trait;
use ensemble_runtime::{Network, ResourceError, Service, StartedNetwork, StartedService};
use ensemble_wait::BoundPorts;
use parking_lot::Mutex;

/// Shared, ordered record of lifecycle calls made on doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Snapshot of every entry so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Entries starting with `prefix`, with the prefix stripped.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix(prefix).map(str::to_owned))
            .collect()
    }
}

/// Which lifecycle call of a double should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureScript {
    /// Fail `start`.
    pub start: bool,
    /// Fail `stop`.
    pub stop: bool,
}

/// Network double logging `start network:<name>` and `stop network:<name>`.
#[derive(Debug, Clone)]
pub struct RecordingNetwork {
    name: String,
    log: CallLog,
    script: FailureScript,
}

impl RecordingNetwork {
    /// Double called `name` writing to `log`.
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            script: FailureScript::default(),
        }
    }

    /// Make `start` fail.
    pub fn failing_start(mut self) -> Self {
        self.script.start = true;
        self
    }

    /// Make `stop` fail.
    pub fn failing_stop(mut self) -> Self {
        self.script.stop = true;
        self
    }

    /// Box the double for a provider.
    pub fn boxed(self) -> Box<dyn Network> {
        Box::new(self)
    }
}

#[async_trait]
impl Network for RecordingNetwork {
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedNetwork>, ResourceError> {
        self.log.record(format!("start network:{}", self.name));
        if self.script.start {
            return Err(ResourceError::runtime(format!("network {} refused to start", self.name)));
        }
        Ok(Box::new(StartedRecordingNetwork {
            id: format!("net-{}", self.name),
            name: self.name,
            log: self.log,
            fail_stop: self.script.stop,
        }))
    }
}

struct StartedRecordingNetwork {
    id: String,
    name: String,
    log: CallLog,
    fail_stop: bool,
}

#[async_trait]
impl StartedNetwork for StartedRecordingNetwork {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.log.record(format!("stop network:{}", self.name));
        if self.fail_stop {
            return Err(ResourceError::runtime(format!("network {} refused to stop", self.name)));
        }
        Ok(())
    }
}

/// Service double logging `start service:<name>` and `stop service:<name>`.
#[derive(Debug, Clone)]
pub struct RecordingService {
    name: String,
    networks: Vec<String>,
    ports: BoundPorts,
    log: CallLog,
    script: FailureScript,
}

impl RecordingService {
    /// Double called `name` writing to `log`.
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            networks: Vec::new(),
            ports: BoundPorts::new(),
            log: log.clone(),
            script: FailureScript::default(),
        }
    }

    /// Report attachment to `network` once started.
    pub fn on_network(mut self, network: impl Into<String>) -> Self {
        self.networks.push(network.into());
        self
    }

    /// Report `container_port` as bound to `host_port` once started.
    pub fn with_port(mut self, container_port: u16, host_port: u16) -> Self {
        self.ports.insert(container_port, host_port);
        self
    }

    /// Make `start` fail.
    pub fn failing_start(mut self) -> Self {
        self.script.start = true;
        self
    }

    /// Make `stop` fail.
    pub fn failing_stop(mut self) -> Self {
        self.script.stop = true;
        self
    }

    /// Box the double for a provider.
    pub fn boxed(self) -> Box<dyn Service> {
        Box::new(self)
    }
}

#[async_trait]
impl Service for RecordingService {
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedService>, ResourceError> {
        self.log.record(format!("start service:{}", self.name));
        if self.script.start {
            return Err(ResourceError::runtime(format!("service {} refused to start", self.name)));
        }
        Ok(Box::new(StartedRecordingService {
            id: format!("svc-{}", self.name),
            name: self.name,
            networks: self.networks,
            ports: self.ports,
            log: self.log,
            fail_stop: self.script.stop,
        }))
    }
}

struct StartedRecordingService {
    id: String,
    name: String,
    networks: Vec<String>,
    ports: BoundPorts,
    log: CallLog,
    fail_stop: bool,
}

#[async_trait]
impl StartedService for StartedRecordingService {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        "127.0.0.1"
    }

    fn bound_ports(&self) -> &BoundPorts {
        &self.ports
    }

    fn network_names(&self) -> &[String] {
        &self.networks
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.log.record(format!("stop service:{}", self.name));
        if self.fail_stop {
            return Err(ResourceError::runtime(format!("service {} refused to stop", self.name)));
        }
        Ok(())
    }
}
