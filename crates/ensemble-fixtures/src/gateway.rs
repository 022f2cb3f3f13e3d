//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Default remote-desktop gateway ensemble."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! The remote-desktop gateway ensemble: a proxy daemon and a web client on a
//! private `guacamole` network, the client also on `ingress`, the proxy also on
//! the fixture network where test-support services attach.

use std::sync::Arc;

use ensemble_common::HarnessConfig;
use ensemble_orchestrator::{Ensemble, NetworkProvider, ServiceProvider};
use ensemble_runtime::{ContainerRuntime, GenericNetwork, Network};
use tracing::debug;

use crate::containerized;
use crate::guacamole::{guacd, GuacamoleClient, UserMappingAuth, GUACD_DEFAULT_HOSTNAME, GUACD_IMAGE};
use crate::user_mapping::UserMapping;

/// Network shared by the proxy daemon and the web client.
pub const GUACAMOLE_NETWORK: &str = "guacamole";
/// Network the web client is reachable on.
pub const INGRESS_NETWORK: &str = "ingress";
/// Service name of the proxy daemon.
pub const GUAC_PROXY: &str = "guac-proxy";
/// Service name of the web client.
pub const GUAC_SERVER: &str = "guac-server";

/// Networks `guacamole`, `ingress` and `fixtures_network`, each created as
/// `<role>-<ensemble id>`.
pub fn default_networks(
    runtime: Arc<dyn ContainerRuntime>,
    fixtures_network: impl Into<String>,
) -> NetworkProvider {
    let roles = [
        GUACAMOLE_NETWORK.to_owned(),
        INGRESS_NETWORK.to_owned(),
        fixtures_network.into(),
    ];
    NetworkProvider::batch(move |id| {
        Ok(roles
            .iter()
            .map(|role| {
                let network: Box<dyn Network> =
                    Box::new(GenericNetwork::new(id.scoped(role), runtime.clone()));
                (role.clone(), network)
            })
            .collect())
    })
}

/// Proxy daemon and web client, the client authenticating against `users`.
/// The proxy joins `config.ensemble.fixtures_network`; both are polled and
/// timed per `config.wait`.
pub fn default_services(
    runtime: Arc<dyn ContainerRuntime>,
    config: &HarnessConfig,
    users: Vec<UserMapping>,
) -> ServiceProvider {
    let config = config.clone();
    ServiceProvider::batch(move |id, networks| {
        let guacamole = networks.require(GUACAMOLE_NETWORK)?;
        let ingress = networks.require(INGRESS_NETWORK)?;
        let fixtures = networks.require(&config.ensemble.fixtures_network)?;

        let proxy = guacd(GUACD_IMAGE)
            .with_name(id.scoped(GUAC_PROXY))
            .with_network(guacamole.name())
            .with_network(fixtures.name())
            .with_network_alias(GUACD_DEFAULT_HOSTNAME);
        let client = GuacamoleClient::new()
            .with_auth(UserMappingAuth::from_users(&users))
            .into_spec()?
            .with_name(id.scoped(GUAC_SERVER))
            .with_network(guacamole.name())
            .with_network(ingress.name());
        debug!(ensemble = %id, users = users.len(), "gateway services described");

        let mut services = containerized(GUAC_PROXY, proxy, &runtime, &config);
        services.extend(containerized(GUAC_SERVER, client, &runtime, &config));
        Ok(services)
    })
}

/// Gateway ensemble with its default networks and services and no users.
/// Fixture services are added with [`Ensemble::with_fixture_services`].
pub fn gateway_ensemble(config: &HarnessConfig, runtime: Arc<dyn ContainerRuntime>) -> Ensemble {
    gateway_ensemble_with_users(config, runtime, Vec::new())
}

/// Gateway ensemble whose web client authenticates `users`.
pub fn gateway_ensemble_with_users(
    config: &HarnessConfig,
    runtime: Arc<dyn ContainerRuntime>,
    users: Vec<UserMapping>,
) -> Ensemble {
    let fixtures_network = config.ensemble.fixtures_network.as_str();
    Ensemble::from_config(&config.ensemble)
        .with_networks(default_networks(runtime.clone(), fixtures_network))
        .with_services(default_services(runtime, config, users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_common::EnsembleConfig;
    use ensemble_orchestrator::EnsembleId;
    use ensemble_testharness::{CallLog, RecordingRuntime};

    #[tokio::test]
    async fn default_networks_are_scoped_by_ensemble_id() {
        let runtime = RecordingRuntime::new(&CallLog::new());
        let provider = default_networks(runtime.shared(), "fixtures");
        let pairs = provider.provide(&EnsembleId::new("e1")).unwrap();
        let roles: Vec<_> = pairs.iter().map(|(role, _)| role.as_str()).collect();
        assert_eq!(roles, vec!["guacamole", "ingress", "fixtures"]);

        for (_, network) in pairs {
            network.start().await.unwrap();
        }
        assert_eq!(
            runtime.networks(),
            vec!["guacamole-e1", "ingress-e1", "fixtures-e1"]
        );
    }

    #[test]
    fn ensemble_follows_configuration() {
        let mut config = HarnessConfig::default();
        config.ensemble = EnsembleConfig {
            id: Some("pinned".into()),
            fixtures_network: "support".into(),
        };
        let ensemble = gateway_ensemble(&config, RecordingRuntime::default().shared());
        assert_eq!(ensemble.pinned_id().map(EnsembleId::as_str), Some("pinned"));
        assert_eq!(ensemble.fixtures_network(), "support");
    }
}
