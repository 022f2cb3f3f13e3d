//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fmt;

use ensemble_common::config::{EnsembleConfig, DEFAULT_FIXTURES_NETWORK};
use ensemble_logging::{
    ens_debug, ens_error, ens_warn, log_lifecycle_event, LifecycleOutcome, LogContext, Stage,
};
use ensemble_runtime::StartedNetwork;
use indexmap::IndexMap;

use crate::error::{ConfigurationError, EnsembleError, ResourceKind};
use crate::id::EnsembleId;
use crate::provider::{
    NetworkProvider, ServicePairs, ServiceProvider, StartedNetworks, StartedServices,
};
use crate::started::StartedEnsemble;

/// Not yet started ensemble: a set of providers plus an optional pinned id.
pub struct Ensemble {
    id: Option<EnsembleId>,
    fixtures_network: String,
    network_providers: Vec<NetworkProvider>,
    service_providers: Vec<ServiceProvider>,
}

impl Default for Ensemble {
    fn default() -> Self {
        Self::new()
    }
}

impl Ensemble {
    /// Empty ensemble generating a fresh id on every start.
    pub fn new() -> Self {
        Self {
            id: None,
            fixtures_network: DEFAULT_FIXTURES_NETWORK.to_owned(),
            network_providers: Vec::new(),
            service_providers: Vec::new(),
        }
    }

    /// Empty ensemble configured from the harness configuration.
    pub fn from_config(config: &EnsembleConfig) -> Self {
        Self {
            id: config.id.clone().map(EnsembleId::new),
            fixtures_network: config.fixtures_network.clone(),
            ..Self::new()
        }
    }

    /// Pin the id used when `start` is called without one.
    pub fn with_id(mut self, id: impl Into<EnsembleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Register a network provider.
    pub fn with_networks(mut self, provider: NetworkProvider) -> Self {
        self.network_providers.push(provider);
        self
    }

    /// Register a service provider.
    pub fn with_services(mut self, provider: ServiceProvider) -> Self {
        self.service_providers.push(provider);
        self
    }

    /// Register services attached to the fixture network.
    pub fn with_fixture_services<F>(self, f: F) -> Self
    where
        F: Fn(&EnsembleId, &dyn StartedNetwork) -> Result<ServicePairs, EnsembleError>
            + Send
            + Sync
            + 'static,
    {
        let provider = ServiceProvider::fixture(self.fixtures_network.clone(), f);
        self.with_services(provider)
    }

    /// Pinned id, if any.
    pub fn pinned_id(&self) -> Option<&EnsembleId> {
        self.id.as_ref()
    }

    /// Name of the network fixture services attach to.
    pub fn fixtures_network(&self) -> &str {
        &self.fixtures_network
    }

    /// Evaluate providers and start every network, then every service, one at
    /// a time in provider order.
    ///
    /// The id is `id` if given, else the pinned id, else a generated one.
    /// Duplicate names within a collection keep their first position and the
    /// last provided resource. An ensemble registered without network or
    /// service providers is rejected before anything starts. Once a network
    /// is up, every failure carries the resources started so far; take them
    /// with [`EnsembleError::into_partial`] and stop them.
    pub async fn start(self, id: Option<EnsembleId>) -> Result<StartedEnsemble, EnsembleError> {
        if self.network_providers.is_empty() {
            return Err(ConfigurationError::NoNetworks.into());
        }
        if self.service_providers.is_empty() {
            return Err(ConfigurationError::NoServices.into());
        }
        let id = id
            .or(self.id)
            .unwrap_or_else(EnsembleId::generate);
        let ensemble = id.as_str();

        let mut descriptors = IndexMap::new();
        for provider in &self.network_providers {
            merge(&mut descriptors, provider.provide(&id)?, ResourceKind::Network, ensemble);
        }
        if descriptors.is_empty() {
            return Err(ConfigurationError::NoNetworks.into());
        }
        ens_debug!(
            context = LogContext::new()
                .with_ensemble(ensemble)
                .with_stage(Stage::Provision),
            "starting {} network(s)",
            descriptors.len()
        );

        let mut networks = StartedNetworks::default();
        for (name, network) in descriptors {
            let ctx = LogContext::new()
                .with_ensemble(ensemble)
                .with_resource(ResourceKind::Network.as_str(), &name)
                .with_stage(Stage::Start);
            match network.start().await {
                Ok(started) => {
                    log_lifecycle_event(
                        Some(&ctx),
                        "network.started",
                        started.name(),
                        LifecycleOutcome::Success,
                    );
                    networks.insert(name, started);
                }
                Err(source) => {
                    log_lifecycle_event(
                        Some(&ctx),
                        "network.start_failed",
                        &source.to_string(),
                        LifecycleOutcome::Fault,
                    );
                    let partial = abandon(&id, networks, StartedServices::default());
                    return Err(EnsembleError::NetworkStart {
                        name,
                        source,
                        partial,
                    });
                }
            }
        }

        let mut descriptors = IndexMap::new();
        for provider in &self.service_providers {
            match provider.provide(&id, &networks) {
                Ok(pairs) => merge(&mut descriptors, pairs, ResourceKind::Service, ensemble),
                Err(err) => {
                    let source = match err {
                        EnsembleError::Configuration(source) => source,
                        other => ConfigurationError::InvalidProvider {
                            message: other.to_string(),
                        },
                    };
                    let partial = abandon(&id, networks, StartedServices::default());
                    return Err(EnsembleError::Aborted { source, partial });
                }
            }
        }
        if descriptors.is_empty() {
            let partial = abandon(&id, networks, StartedServices::default());
            return Err(EnsembleError::Aborted {
                source: ConfigurationError::NoServices,
                partial,
            });
        }

        let mut services = StartedServices::default();
        for (name, service) in descriptors {
            let ctx = LogContext::new()
                .with_ensemble(ensemble)
                .with_resource(ResourceKind::Service.as_str(), &name)
                .with_stage(Stage::Start);
            match service.start().await {
                Ok(started) => {
                    log_lifecycle_event(
                        Some(&ctx),
                        "service.started",
                        started.name(),
                        LifecycleOutcome::Success,
                    );
                    services.insert(name, started);
                }
                Err(source) => {
                    log_lifecycle_event(
                        Some(&ctx),
                        "service.start_failed",
                        &source.to_string(),
                        LifecycleOutcome::Fault,
                    );
                    let partial = abandon(&id, networks, services);
                    return Err(EnsembleError::ServiceStart {
                        name,
                        source,
                        partial,
                    });
                }
            }
        }

        log_lifecycle_event(
            Some(&LogContext::new().with_ensemble(ensemble)),
            "ensemble.started",
            "ensemble started",
            LifecycleOutcome::Success,
        );
        Ok(StartedEnsemble::new(id, networks, services))
    }
}

impl fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ensemble")
            .field("id", &self.id)
            .field("fixtures_network", &self.fixtures_network)
            .field("network_providers", &self.network_providers.len())
            .field("service_providers", &self.service_providers.len())
            .finish()
    }
}

fn merge<T>(
    target: &mut IndexMap<String, T>,
    pairs: Vec<(String, T)>,
    kind: ResourceKind,
    ensemble: &str,
) {
    for (name, resource) in pairs {
        let ctx = LogContext::new()
            .with_ensemble(ensemble)
            .with_resource(kind.as_str(), &name)
            .with_stage(Stage::Provision);
        if target.insert(name.clone(), resource).is_some() {
            ens_warn!(
                context = ctx,
                "duplicate {} name '{}'; the later definition replaces the earlier one",
                kind,
                name
            );
        }
    }
}

fn abandon(
    id: &EnsembleId,
    networks: StartedNetworks,
    services: StartedServices,
) -> Box<StartedEnsemble> {
    if !networks.is_empty() {
        ens_error!(
            context = LogContext::new().with_ensemble(id.as_str()).with_stage(Stage::Start),
            "start aborted; running until stopped: networks {:?}, services {:?}",
            networks.names(),
            services.names()
        );
    }
    Box::new(StartedEnsemble::new(id.clone(), networks, services))
}
