//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Telnet server fixture descriptor."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::sync::Arc;

use ensemble_common::HarnessConfig;
use ensemble_orchestrator::{EnsembleError, EnsembleId, ServicePairs};
use ensemble_runtime::{BindMode, ContainerRuntime, ContainerSpec, StartedNetwork};
use ensemble_wait::{LineProtocolWait, Wait, WaitStrategy};

use crate::{containerized, LOCALTIME};

/// Locally built Telnet server image.
pub const TELNET_SERVER_IMAGE: &str = "telnet-server:latest";
/// Telnet daemon port.
pub const TELNET_PORT: u16 = 8023;
/// Shell prompt printed once a session is open.
pub const TELNET_PROMPT: &str = "/ # ";
/// Service name of the fixture within an ensemble.
pub const TELNET_SERVER_ROLE: &str = "telnet-server";

/// Telnet server descriptor running `image`, sharing the host's timezone.
pub fn telnet_server(image: &str) -> ContainerSpec {
    ContainerSpec::new(image).with_bind_mount(LOCALTIME, LOCALTIME, BindMode::ReadOnly)
}

/// Ready once ports listen and a session shows the shell prompt.
pub fn telnet_server_ready() -> WaitStrategy {
    Wait::for_all(vec![
        Wait::for_listening_ports(),
        LineProtocolWait::new(TELNET_PORT)
            .with_prompt(TELNET_PROMPT)
            .into(),
    ])
}

/// Fixture provider attaching a Telnet server to the fixture network, polled
/// and timed per `config`.
pub fn telnet_server_fixture(
    runtime: Arc<dyn ContainerRuntime>,
    config: &HarnessConfig,
) -> impl Fn(&EnsembleId, &dyn StartedNetwork) -> Result<ServicePairs, EnsembleError> + Send + Sync + 'static
{
    let config = config.clone();
    move |id, network| {
        let spec = telnet_server(TELNET_SERVER_IMAGE)
            .with_name(id.scoped(TELNET_SERVER_ROLE))
            .with_network(network.name())
            .with_exposed_ports([TELNET_PORT])
            .with_wait_strategy(telnet_server_ready());
        Ok(containerized(TELNET_SERVER_ROLE, spec, &runtime, &config))
    }
}
