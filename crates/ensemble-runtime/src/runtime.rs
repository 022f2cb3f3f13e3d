//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use async_trait::async_trait;
use ensemble_wait::BoundPorts;

use crate::container::ContainerSpec;
use crate::error::ResourceError;

/// A container the runtime reports as running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    /// Runtime identifier.
    pub id: String,
    /// Host the published ports are reachable on.
    pub host: String,
    /// Published port bindings.
    pub ports: BoundPorts,
}

/// Container and network primitives provided by the host environment.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a network named `name`, returning its runtime identifier.
    async fn create_network(&self, name: &str) -> Result<String, ResourceError>;

    /// Remove the network with runtime identifier `id`.
    async fn remove_network(&self, id: &str) -> Result<(), ResourceError>;

    /// Create and run a container described by `spec`.
    async fn run_container(&self, spec: &ContainerSpec) -> Result<RunningContainer, ResourceError>;

    /// Stop and remove the container with runtime identifier `id`.
    async fn stop_container(&self, id: &str) -> Result<(), ResourceError>;
}
