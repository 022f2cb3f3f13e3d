//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! Resource providers: pure, synchronous descriptions of the networks and
//! services an ensemble consists of, evaluated once per `start()`.

use std::fmt;

use ensemble_runtime::{Network, Service, StartedNetwork, StartedService};
use indexmap::IndexMap;

use crate::error::{ConfigurationError, EnsembleError};
use crate::id::EnsembleId;

/// Named, not yet started networks.
pub type NetworkPairs = Vec<(String, Box<dyn Network>)>;
/// Named, not yet started services.
pub type ServicePairs = Vec<(String, Box<dyn Service>)>;

type NetworkFn = dyn Fn(&EnsembleId) -> Result<NetworkPairs, EnsembleError> + Send + Sync;
type ServiceFn =
    dyn Fn(&EnsembleId, &StartedNetworks) -> Result<ServicePairs, EnsembleError> + Send + Sync;

/// Describes networks for an ensemble id.
pub struct NetworkProvider {
    provide: Box<NetworkFn>,
}

impl NetworkProvider {
    /// Provider yielding exactly one named network.
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&EnsembleId) -> Result<(String, Box<dyn Network>), EnsembleError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            provide: Box::new(move |id| f(id).map(|pair| vec![pair])),
        }
    }

    /// Provider yielding any number of named networks, in start order.
    pub fn batch<F>(f: F) -> Self
    where
        F: Fn(&EnsembleId) -> Result<NetworkPairs, EnsembleError> + Send + Sync + 'static,
    {
        Self {
            provide: Box::new(f),
        }
    }

    /// Evaluate the provider.
    pub fn provide(&self, id: &EnsembleId) -> Result<NetworkPairs, EnsembleError> {
        (self.provide)(id)
    }
}

impl fmt::Debug for NetworkProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkProvider").finish_non_exhaustive()
    }
}

/// Describes services for an ensemble id, given read access to the started
/// networks.
pub struct ServiceProvider {
    provide: Box<ServiceFn>,
}

impl ServiceProvider {
    /// Provider yielding exactly one named service.
    pub fn single<F>(f: F) -> Self
    where
        F: Fn(&EnsembleId, &StartedNetworks) -> Result<(String, Box<dyn Service>), EnsembleError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            provide: Box::new(move |id, networks| f(id, networks).map(|pair| vec![pair])),
        }
    }

    /// Provider yielding any number of named services, in start order.
    pub fn batch<F>(f: F) -> Self
    where
        F: Fn(&EnsembleId, &StartedNetworks) -> Result<ServicePairs, EnsembleError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            provide: Box::new(f),
        }
    }

    /// Provider attaching test-support services to the network called
    /// `network`. Fails with [`ConfigurationError::MissingNetwork`] when the
    /// ensemble did not start that network.
    pub fn fixture<F>(network: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EnsembleId, &dyn StartedNetwork) -> Result<ServicePairs, EnsembleError>
            + Send
            + Sync
            + 'static,
    {
        let network = network.into();
        Self::batch(move |id, networks| f(id, networks.require(&network)?))
    }

    /// Evaluate the provider.
    pub fn provide(
        &self,
        id: &EnsembleId,
        networks: &StartedNetworks,
    ) -> Result<ServicePairs, EnsembleError> {
        (self.provide)(id, networks)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider").finish_non_exhaustive()
    }
}

/// Started networks in start order, keyed by name.
#[derive(Debug, Default)]
pub struct StartedNetworks {
    inner: IndexMap<String, Box<dyn StartedNetwork>>,
}

impl StartedNetworks {
    pub(crate) fn insert(&mut self, name: String, network: Box<dyn StartedNetwork>) {
        self.inner.insert(name, network);
    }

    /// Network registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn StartedNetwork> {
        self.inner.get(name).map(|network| network.as_ref())
    }

    /// Network registered under `name`, or a configuration error naming it.
    pub fn require(&self, name: &str) -> Result<&dyn StartedNetwork, ConfigurationError> {
        self.get(name).ok_or_else(|| ConfigurationError::MissingNetwork {
            name: name.to_owned(),
        })
    }

    /// Entries in start order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &dyn StartedNetwork)> {
        self.inner
            .iter()
            .map(|(name, network)| (name.as_str(), network.as_ref()))
    }

    /// Names in start order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    /// Number of networks.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no network is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Started services in start order, keyed by name.
#[derive(Debug, Default)]
pub struct StartedServices {
    inner: IndexMap<String, Box<dyn StartedService>>,
}

impl StartedServices {
    pub(crate) fn insert(&mut self, name: String, service: Box<dyn StartedService>) {
        self.inner.insert(name, service);
    }

    /// Service registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn StartedService> {
        self.inner.get(name).map(|service| service.as_ref())
    }

    /// Entries in start order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &dyn StartedService)> {
        self.inner
            .iter()
            .map(|(name, service)| (name.as_str(), service.as_ref()))
    }

    /// Names in start order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    /// Number of services.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no service is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
