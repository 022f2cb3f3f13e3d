//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fmt;

use async_trait::async_trait;
use ensemble_wait::BoundPorts;

use crate::error::ResourceError;

/// A network that has been described but not created yet.
#[async_trait]
pub trait Network: Send {
    /// Create the network and hand back its live handle.
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedNetwork>, ResourceError>;
}

/// Live handle to a created network.
#[async_trait]
pub trait StartedNetwork: Send + Sync {
    /// Runtime identifier.
    fn id(&self) -> &str;

    /// Network name as created, usually scoped by the ensemble id.
    fn name(&self) -> &str;

    /// Remove the network.
    async fn stop(&self) -> Result<(), ResourceError>;
}

/// A service that has been described but not started yet.
#[async_trait]
pub trait Service: Send {
    /// Start the service, gate it on readiness and hand back its live handle.
    async fn start(self: Box<Self>) -> Result<Box<dyn StartedService>, ResourceError>;
}

/// Live handle to a started service.
#[async_trait]
pub trait StartedService: Send + Sync {
    /// Runtime identifier.
    fn id(&self) -> &str;

    /// Service name as started.
    fn name(&self) -> &str;

    /// Host the service's ports are published on.
    fn host(&self) -> &str;

    /// Host port bound to container `port`.
    fn mapped_port(&self, port: u16) -> Option<u16> {
        self.bound_ports().get(port)
    }

    /// Every port binding of the service.
    fn bound_ports(&self) -> &BoundPorts;

    /// Names of the networks the service is attached to.
    fn network_names(&self) -> &[String];

    /// Stop the service.
    async fn stop(&self) -> Result<(), ResourceError>;
}

impl fmt::Debug for dyn StartedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedNetwork")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Debug for dyn StartedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedService")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("host", &self.host())
            .field("ports", self.bound_ports())
            .finish()
    }
}
