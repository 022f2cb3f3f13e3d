//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Gateway ensemble fixtures and shared exports."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Ready-made ensemble pieces for remote-desktop gateway tests: the default
//! gateway networks and services, VNC and Telnet servers to attach to the
//! fixture network, and the gateway's user-mapping configuration. The build
//! modules describe a guacamole-server builder image and the clone,
//! configure and compile steps run inside it.

use std::sync::Arc;

use ensemble_common::HarnessConfig;
use ensemble_orchestrator::ServicePairs;
use ensemble_runtime::{ContainerRuntime, ContainerSpec, GenericContainer, Service};

pub mod autotools;
pub mod builder;
pub mod command;
pub mod error;
pub mod gateway;
pub mod git;
pub mod guacamole;
pub mod telnet;
pub mod user_mapping;
pub mod vnc;

pub use autotools::{AutotoolsConfig, Compile, Configure};
pub use builder::{
    render_dockerfile, BuildDependency, BuildSystem, BuilderImage, BundledTemplates,
    DockerfileParams, DockerfileTemplates,
};
pub use command::{run, BuildCommand, CommandOutput, CommandRunner};
pub use error::{BuildError, FixtureError};
pub use gateway::{
    default_networks, default_services, gateway_ensemble, gateway_ensemble_with_users,
    GUACAMOLE_NETWORK, GUAC_PROXY, GUAC_SERVER, INGRESS_NETWORK,
};
pub use git::{GitClone, DEFAULT_BRANCH, GUACAMOLE_SERVER_REPO};
pub use guacamole::{GuacamoleClient, GuacdSettings, UserMappingAuth};
pub use telnet::{telnet_server, telnet_server_fixture, telnet_server_ready};
pub use user_mapping::{render_user_mapping, Connection, PasswordEncoding, UserMapping};
pub use vnc::{vnc_server, vnc_server_fixture, vnc_server_ready};

/// Host timezone file shared read-only with fixture containers.
pub const LOCALTIME: &str = "/etc/localtime";

/// Wrap `spec` as the service `role`, timed and pointed by the harness
/// configuration.
pub(crate) fn containerized(
    role: &str,
    spec: ContainerSpec,
    runtime: &Arc<dyn ContainerRuntime>,
    config: &HarnessConfig,
) -> ServicePairs {
    let spec = spec
        .with_wait_defaults(&config.wait)
        .with_supervisor_config(&config.supervisor);
    let service: Box<dyn Service> = Box::new(GenericContainer::new(spec, runtime.clone()));
    vec![(role.to_owned(), service)]
}
