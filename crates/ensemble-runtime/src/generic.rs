//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::sync::Arc;

use async_trait::async_trait;
use ensemble_wait::{BoundPorts, ReadinessProbe, WaitTarget};
use tracing::{debug, info, warn};

use crate::container::ContainerSpec;
use crate::error::ResourceError;
use crate::resource::{Network, Service, StartedNetwork, StartedService};
use crate::runtime::ContainerRuntime;

/// Network created through a [`ContainerRuntime`].
pub struct GenericNetwork {
    name: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl GenericNetwork {
    /// Describe a network called `name`.
    pub fn new(name: impl Into<String>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            name: name.into(),
            runtime,
        }
    }

    /// Name the network will be created with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Network for GenericNetwork {
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedNetwork>, ResourceError> {
        let id = self.runtime.create_network(&self.name).await?;
        info!(network = %self.name, %id, "network created");
        Ok(Box::new(StartedGenericNetwork {
            id,
            name: self.name,
            runtime: self.runtime,
        }))
    }
}

struct StartedGenericNetwork {
    id: String,
    name: String,
    runtime: Arc<dyn ContainerRuntime>,
}

#[async_trait]
impl StartedNetwork for StartedGenericNetwork {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.runtime.remove_network(&self.id).await?;
        info!(network = %self.name, id = %self.id, "network removed");
        Ok(())
    }
}

/// Container run through a [`ContainerRuntime`] and gated on its wait strategy.
pub struct GenericContainer {
    spec: ContainerSpec,
    runtime: Arc<dyn ContainerRuntime>,
}

impl GenericContainer {
    /// Describe a container from `spec`.
    pub fn new(spec: ContainerSpec, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { spec, runtime }
    }

    /// Descriptor the container will be run from.
    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }
}

#[async_trait]
impl Service for GenericContainer {
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedService>, ResourceError> {
        let running = self.runtime.run_container(&self.spec).await?;
        let name = self
            .spec
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| running.id.clone());
        debug!(container = %name, id = %running.id, image = self.spec.image(), "container running; waiting for readiness");

        let target = WaitTarget::new(running.id.clone(), running.host.clone(), running.ports.clone());
        let strategy = self.spec.wait_strategy();
        if let Err(err) = strategy
            .wait_until_ready(&target, self.spec.startup_timeout())
            .await
        {
            warn!(container = %name, strategy = strategy.strategy_name(), error = %err, "container not ready; stopping it");
            if let Err(stop_err) = self.runtime.stop_container(&running.id).await {
                warn!(container = %name, error = %stop_err, "failed to stop unready container");
            }
            return Err(err.into());
        }

        info!(container = %name, id = %running.id, "container ready");
        Ok(Box::new(StartedContainer {
            id: running.id,
            name,
            host: running.host,
            ports: running.ports,
            networks: self.spec.networks().to_vec(),
            runtime: self.runtime,
        }))
    }
}

struct StartedContainer {
    id: String,
    name: String,
    host: String,
    ports: BoundPorts,
    networks: Vec<String>,
    runtime: Arc<dyn ContainerRuntime>,
}

#[async_trait]
impl StartedService for StartedContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn bound_ports(&self) -> &BoundPorts {
        &self.ports
    }

    fn network_names(&self) -> &[String] {
        &self.networks
    }

    async fn stop(&self) -> Result<(), ResourceError> {
        self.runtime.stop_container(&self.id).await?;
        info!(container = %self.name, id = %self.id, "container stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RunningContainer;
    use ensemble_wait::{Wait, WaitError};
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Runtime double publishing every exposed port on a fixed host port.
    struct FixedPortRuntime {
        host_port: u16,
        calls: Mutex<Vec<String>>,
    }

    impl FixedPortRuntime {
        fn new(host_port: u16) -> Arc<Self> {
            Arc::new(Self {
                host_port,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ContainerRuntime for FixedPortRuntime {
        async fn create_network(&self, name: &str) -> Result<String, ResourceError> {
            self.calls.lock().push(format!("create-network {name}"));
            Ok(format!("net-{name}"))
        }

        async fn remove_network(&self, id: &str) -> Result<(), ResourceError> {
            self.calls.lock().push(format!("remove-network {id}"));
            Ok(())
        }

        async fn run_container(&self, spec: &ContainerSpec) -> Result<RunningContainer, ResourceError> {
            self.calls.lock().push(format!("run {}", spec.image()));
            Ok(RunningContainer {
                id: "c-1".into(),
                host: "127.0.0.1".into(),
                ports: spec
                    .exposed_ports()
                    .iter()
                    .map(|port| (*port, self.host_port))
                    .collect(),
            })
        }

        async fn stop_container(&self, id: &str) -> Result<(), ResourceError> {
            self.calls.lock().push(format!("stop {id}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn network_round_trip_goes_through_runtime() {
        let runtime = FixedPortRuntime::new(0);
        let network = Box::new(GenericNetwork::new("fixtures-0b7c", runtime.clone()));
        let started = network.start().await.unwrap();
        assert_eq!(started.id(), "net-fixtures-0b7c");
        assert_eq!(started.name(), "fixtures-0b7c");
        started.stop().await.unwrap();
        assert_eq!(
            runtime.calls(),
            vec!["create-network fixtures-0b7c", "remove-network net-fixtures-0b7c"]
        );
    }

    #[tokio::test]
    async fn container_is_started_once_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let runtime = FixedPortRuntime::new(listener.local_addr().unwrap().port());
        let spec = ContainerSpec::new("alpine/telnet")
            .with_name("telnet-0b7c")
            .with_network("fixtures-0b7c")
            .with_exposed_ports([8023])
            .with_wait_strategy(Wait::for_listening_ports().with_retry_interval(Duration::from_millis(20)));

        let started = Box::new(GenericContainer::new(spec, runtime.clone()))
            .start()
            .await
            .unwrap();
        assert_eq!(started.name(), "telnet-0b7c");
        assert_eq!(started.host(), "127.0.0.1");
        assert_eq!(started.mapped_port(8023), Some(listener.local_addr().unwrap().port()));
        assert_eq!(started.mapped_port(22), None);
        assert_eq!(started.network_names(), ["fixtures-0b7c"]);

        started.stop().await.unwrap();
        assert_eq!(runtime.calls(), vec!["run alpine/telnet", "stop c-1"]);
    }

    #[tokio::test]
    async fn unready_container_is_stopped_and_reported() {
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = closed.local_addr().unwrap().port();
        drop(closed);
        let runtime = FixedPortRuntime::new(port);
        let spec = ContainerSpec::new("alpine/telnet")
            .with_exposed_ports([8023])
            .with_wait_strategy(Wait::for_listening_ports().with_retry_interval(Duration::from_millis(20)))
            .with_startup_timeout(Duration::from_millis(80));

        let err = Box::new(GenericContainer::new(spec, runtime.clone()))
            .start()
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Wait(WaitError::Timeout { .. })));
        assert_eq!(runtime.calls(), vec!["run alpine/telnet", "stop c-1"]);
    }
}
