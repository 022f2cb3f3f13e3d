//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "VNC server fixture descriptor."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::sync::Arc;

use ensemble_common::HarnessConfig;
use ensemble_orchestrator::{EnsembleError, EnsembleId, ServicePairs};
use ensemble_runtime::{BindMode, ContainerRuntime, ContainerSpec, StartedNetwork};
use ensemble_wait::{Wait, WaitStrategy};

use crate::error::FixtureError;
use crate::{containerized, LOCALTIME};

/// Locally built VNC server image.
pub const VNC_SERVER_IMAGE: &str = "vnc-server:latest";
/// VNC port.
pub const VNC_PORT: u16 = 5900;
/// XML-RPC port of the supervisor inside the image.
pub const VNC_SUPERVISOR_PORT: u16 = 9090;
/// Processes the supervisor must report RUNNING.
pub const VNC_PROCESSES: [&str; 4] = ["xvfb", "pulseaudio", "x11vnc", "fluxbox"];
/// `/dev/shm` size the desktop session needs.
pub const VNC_SHM_SIZE: u64 = 1024 * 1024 * 1024;
/// Service name of the fixture within an ensemble.
pub const VNC_SERVER_ROLE: &str = "vnc-server";

/// VNC server descriptor running `image`, sharing the host's timezone.
pub fn vnc_server(image: &str) -> ContainerSpec {
    ContainerSpec::new(image)
        .with_bind_mount(LOCALTIME, LOCALTIME, BindMode::ReadOnly)
        .with_shm_size(VNC_SHM_SIZE)
}

/// Ready once ports listen, the supervisor runs and every desktop process runs.
pub fn vnc_server_ready() -> Result<WaitStrategy, FixtureError> {
    Ok(Wait::for_all(vec![
        Wait::for_listening_ports(),
        Wait::for_supervisor(VNC_SUPERVISOR_PORT),
        Wait::for_supervisor_processes(VNC_SUPERVISOR_PORT, VNC_PROCESSES)?,
    ]))
}

/// Fixture provider attaching a VNC server to the fixture network, polled
/// and timed per `config`.
pub fn vnc_server_fixture(
    runtime: Arc<dyn ContainerRuntime>,
    config: &HarnessConfig,
) -> impl Fn(&EnsembleId, &dyn StartedNetwork) -> Result<ServicePairs, EnsembleError> + Send + Sync + 'static
{
    let config = config.clone();
    move |id, network| {
        let spec = vnc_server(VNC_SERVER_IMAGE)
            .with_name(id.scoped(VNC_SERVER_ROLE))
            .with_network(network.name())
            .with_exposed_ports([VNC_PORT, VNC_SUPERVISOR_PORT])
            .with_wait_strategy(vnc_server_ready()?);
        Ok(containerized(VNC_SERVER_ROLE, spec, &runtime, &config))
    }
}
