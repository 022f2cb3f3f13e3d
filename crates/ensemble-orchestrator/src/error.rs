//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::error::Error as StdError;
use std::fmt;

use ensemble_runtime::ResourceError;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::started::StartedEnsemble;

/// Kind of resource an ensemble manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    /// A network.
    Network,
    /// A service.
    Service,
}

impl ResourceKind {
    /// Lowercase label used in log fields.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The ensemble definition cannot be started as registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Network providers produced nothing.
    #[error("ensemble has no networks; register at least one network provider")]
    NoNetworks,
    /// Service providers produced nothing.
    #[error("ensemble has no services; register at least one service provider")]
    NoServices,
    /// A service provider asked for a network that was not started.
    #[error("network '{name}' is not part of the ensemble")]
    MissingNetwork {
        /// Name that was looked up.
        name: String,
    },
    /// A provider rejected its input.
    #[error("invalid provider: {message}")]
    InvalidProvider {
        /// Provider-supplied reason.
        message: String,
    },
}

/// One resource that failed to stop during teardown.
#[derive(Debug)]
pub struct StopFailure {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name within its collection.
    pub name: String,
    /// Failure reported by the resource.
    pub source: ResourceError,
}

/// Every stop failure of one teardown, in the order they happened.
#[derive(Debug)]
pub struct TeardownError {
    failures: Vec<StopFailure>,
}

impl TeardownError {
    pub(crate) fn new(failures: Vec<StopFailure>) -> Self {
        Self { failures }
    }

    /// All failures, in teardown order.
    pub fn failures(&self) -> &[StopFailure] {
        &self.failures
    }

    /// Names of the resources that failed to stop.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.name.as_str())
            .collect()
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to stop {} resource(s): ", self.failures.len())?;
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} '{}': {}", failure.kind, failure.name, failure.source)?;
        }
        Ok(())
    }
}

impl StdError for TeardownError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.failures
            .first()
            .map(|failure| &failure.source as &(dyn StdError + 'static))
    }
}

/// Errors raised by the ensemble lifecycle.
///
/// Start failures raised after the first network is up carry the resources
/// started so far; see [`EnsembleError::into_partial`].
#[derive(Debug, Error)]
pub enum EnsembleError {
    /// The ensemble definition is unusable. Nothing was started.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A service provider failed, or produced nothing, after networks started.
    #[error("ensemble start aborted: {source}")]
    Aborted {
        /// Provider failure.
        #[source]
        source: ConfigurationError,
        /// Networks started before the failure.
        partial: Box<StartedEnsemble>,
    },
    /// A network failed to start.
    #[error("failed to start network '{name}': {source}")]
    NetworkStart {
        /// Network name.
        name: String,
        /// Underlying failure.
        #[source]
        source: ResourceError,
        /// Networks started before it.
        partial: Box<StartedEnsemble>,
    },
    /// A service failed to start.
    #[error("failed to start service '{name}': {source}")]
    ServiceStart {
        /// Service name.
        name: String,
        /// Underlying failure.
        #[source]
        source: ResourceError,
        /// Networks and services started before it.
        partial: Box<StartedEnsemble>,
    },
    /// At least one resource failed to stop.
    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

impl EnsembleError {
    /// Shorthand for a provider rejecting its input.
    pub fn invalid_provider(message: impl Into<String>) -> Self {
        ConfigurationError::InvalidProvider {
            message: message.into(),
        }
        .into()
    }

    /// Configuration error, if this is one or it aborted a start.
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration(err) | Self::Aborted { source: err, .. } => Some(err),
            _ => None,
        }
    }

    /// Resources left running by a failed start.
    pub fn partial(&self) -> Option<&StartedEnsemble> {
        match self {
            Self::Aborted { partial, .. }
            | Self::NetworkStart { partial, .. }
            | Self::ServiceStart { partial, .. } => Some(partial.as_ref()),
            _ => None,
        }
    }

    /// Take ownership of the resources left running by a failed start so
    /// they can be stopped.
    pub fn into_partial(self) -> Option<StartedEnsemble> {
        match self {
            Self::Aborted { partial, .. }
            | Self::NetworkStart { partial, .. }
            | Self::ServiceStart { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}
