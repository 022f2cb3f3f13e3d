//! ---
//! ens_section: "11-testing"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "In-memory container runtime for ensemble tests."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ensemble_runtime::{ContainerRuntime, ContainerSpec, ResourceError, RunningContainer};
use ensemble_wait::BoundPorts;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::recording::CallLog;

const FIRST_EPHEMERAL_PORT: u16 = 49152;

#[derive(Debug, Default)]
struct RuntimeState {
    next_id: u64,
    next_port: u16,
    networks: IndexMap<String, String>,
    containers: IndexMap<String, ContainerSpec>,
    published: IndexMap<u16, u16>,
    failing: HashSet<String>,
}

/// Container runtime that never touches a real engine.
///
/// Networks and containers live in memory. Exposed ports are published on
/// pinned host ports when [`RecordingRuntime::publish`] was called for them and
/// on made-up ephemeral ports otherwise. Every call is appended to a [`CallLog`]
/// as `create-network <name>`, `remove-network <name>`, `run <name>` and
/// `stop <name>`.
#[derive(Debug, Clone)]
pub struct RecordingRuntime {
    state: Arc<Mutex<RuntimeState>>,
    log: CallLog,
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self::new(&CallLog::new())
    }
}

impl RecordingRuntime {
    /// Runtime writing to `log`.
    pub fn new(log: &CallLog) -> Self {
        Self {
            state: Arc::new(Mutex::new(RuntimeState {
                next_port: FIRST_EPHEMERAL_PORT,
                ..RuntimeState::default()
            })),
            log: log.clone(),
        }
    }

    /// Publish container `container_port` on `host_port` for every container.
    pub fn publish(&self, container_port: u16, host_port: u16) -> &Self {
        self.state.lock().published.insert(container_port, host_port);
        self
    }

    /// Make every runtime call naming `name` (network or container) fail.
    pub fn fail_on(&self, name: impl Into<String>) -> &Self {
        self.state.lock().failing.insert(name.into());
        self
    }

    /// Names of networks currently present.
    pub fn networks(&self) -> Vec<String> {
        self.state.lock().networks.values().cloned().collect()
    }

    /// Specs of containers currently running, keyed by container name.
    pub fn containers(&self) -> IndexMap<String, ContainerSpec> {
        let state = self.state.lock();
        state
            .containers
            .values()
            .map(|spec| (container_name(spec), spec.clone()))
            .collect()
    }

    /// Spec of the running container called `name`.
    pub fn container(&self, name: &str) -> Option<ContainerSpec> {
        self.state
            .lock()
            .containers
            .values()
            .find(|spec| container_name(spec) == name)
            .cloned()
    }

    /// Shareable handle for [`GenericNetwork`](ensemble_runtime::GenericNetwork)
    /// and [`GenericContainer`](ensemble_runtime::GenericContainer).
    pub fn shared(&self) -> Arc<dyn ContainerRuntime> {
        Arc::new(self.clone())
    }

    fn check(&self, name: &str, operation: &str) -> Result<(), ResourceError> {
        if self.state.lock().failing.contains(name) {
            return Err(ResourceError::runtime(format!("{operation} {name} rejected")));
        }
        Ok(())
    }
}

fn container_name(spec: &ContainerSpec) -> String {
    spec.name().unwrap_or(spec.image()).to_owned()
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn create_network(&self, name: &str) -> Result<String, ResourceError> {
        self.log.record(format!("create-network {name}"));
        self.check(name, "create-network")?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("network-{}", state.next_id);
        state.networks.insert(id.clone(), name.to_owned());
        debug!(%id, network = name, "recorded network");
        Ok(id)
    }

    async fn remove_network(&self, id: &str) -> Result<(), ResourceError> {
        let name = self
            .state
            .lock()
            .networks
            .get(id)
            .cloned()
            .ok_or_else(|| ResourceError::runtime(format!("no such network {id}")))?;
        self.log.record(format!("remove-network {name}"));
        self.check(&name, "remove-network")?;
        self.state.lock().networks.shift_remove(id);
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<RunningContainer, ResourceError> {
        let name = container_name(spec);
        self.log.record(format!("run {name}"));
        self.check(&name, "run")?;
        let mut state = self.state.lock();
        for network in spec.networks() {
            if !state.networks.values().any(|existing| existing == network) {
                return Err(ResourceError::runtime(format!(
                    "container {name} refers to unknown network {network}"
                )));
            }
        }
        state.next_id += 1;
        let id = format!("container-{}", state.next_id);
        let mut ports = BoundPorts::new();
        for port in spec.exposed_ports() {
            let pinned = state.published.get(port).copied();
            let host_port = match pinned {
                Some(pinned) => pinned,
                None => {
                    let allocated = state.next_port;
                    state.next_port = state.next_port.wrapping_add(1).max(FIRST_EPHEMERAL_PORT);
                    allocated
                }
            };
            ports.insert(*port, host_port);
        }
        state.containers.insert(id.clone(), spec.clone());
        debug!(%id, container = %name, "recorded container");
        Ok(RunningContainer {
            id,
            host: "127.0.0.1".into(),
            ports,
        })
    }

    async fn stop_container(&self, id: &str) -> Result<(), ResourceError> {
        let name = self
            .state
            .lock()
            .containers
            .get(id)
            .map(container_name)
            .ok_or_else(|| ResourceError::runtime(format!("no such container {id}")))?;
        self.log.record(format!("stop {name}"));
        self.check(&name, "stop")?;
        self.state.lock().containers.shift_remove(id);
        Ok(())
    }
}
