//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use ensemble_logging::{
    ens_debug, ens_error, ens_warn, log_lifecycle_event, LifecycleOutcome, LogContext, Stage,
};
use ensemble_runtime::{StartedNetwork, StartedService};

use crate::error::{EnsembleError, ResourceKind, StopFailure, TeardownError};
use crate::id::EnsembleId;
use crate::provider::{StartedNetworks, StartedServices};

/// Running ensemble. Owns every started resource until [`stop`](Self::stop).
#[derive(Debug)]
pub struct StartedEnsemble {
    id: EnsembleId,
    networks: StartedNetworks,
    services: StartedServices,
    started: bool,
}

impl StartedEnsemble {
    pub(crate) fn new(id: EnsembleId, networks: StartedNetworks, services: StartedServices) -> Self {
        Self {
            id,
            networks,
            services,
            started: true,
        }
    }

    /// Id scoping the ensemble's resources.
    pub fn id(&self) -> &EnsembleId {
        &self.id
    }

    /// Started networks in start order.
    pub fn networks(&self) -> &StartedNetworks {
        &self.networks
    }

    /// Started services in start order.
    pub fn services(&self) -> &StartedServices {
        &self.services
    }

    /// Network started under `name`.
    pub fn network(&self, name: &str) -> Option<&dyn StartedNetwork> {
        self.networks.get(name)
    }

    /// Service started under `name`.
    pub fn service(&self, name: &str) -> Option<&dyn StartedService> {
        self.services.get(name)
    }

    /// Whether `stop` has not run yet.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Stop every service in reverse start order, then every network in
    /// reverse start order.
    ///
    /// Each resource is attempted even when an earlier one failed, and the
    /// ensemble counts as stopped afterwards either way. Failures are returned
    /// together as [`EnsembleError::Teardown`]. Calling `stop` again is a no-op.
    pub async fn stop(&mut self) -> Result<(), EnsembleError> {
        let ensemble = self.id.as_str();
        if !self.started {
            ens_debug!(
                context = LogContext::new().with_ensemble(ensemble).with_stage(Stage::Stop),
                "ensemble already stopped"
            );
            return Ok(());
        }

        let mut failures = Vec::new();
        for (name, service) in self.services.iter().rev() {
            if let Err(source) = service.stop().await {
                failures.push(stop_failed(ensemble, ResourceKind::Service, name, source));
            }
        }
        for (name, network) in self.networks.iter().rev() {
            if let Err(source) = network.stop().await {
                failures.push(stop_failed(ensemble, ResourceKind::Network, name, source));
            }
        }
        self.started = false;

        let ctx = LogContext::new().with_ensemble(ensemble).with_stage(Stage::Stop);
        if failures.is_empty() {
            log_lifecycle_event(
                Some(&ctx),
                "ensemble.stopped",
                "ensemble stopped",
                LifecycleOutcome::Success,
            );
            Ok(())
        } else {
            let err = TeardownError::new(failures);
            log_lifecycle_event(
                Some(&ctx),
                "ensemble.stop_failed",
                &err.to_string(),
                LifecycleOutcome::Fault,
            );
            Err(err.into())
        }
    }
}

impl Drop for StartedEnsemble {
    fn drop(&mut self) {
        if self.started && !(self.networks.is_empty() && self.services.is_empty()) {
            ens_warn!(
                context = LogContext::new().with_ensemble(self.id.as_str()),
                "ensemble dropped without stop; networks {:?} and services {:?} keep running",
                self.networks.names(),
                self.services.names()
            );
        }
    }
}

fn stop_failed(
    ensemble: &str,
    kind: ResourceKind,
    name: &str,
    source: ensemble_runtime::ResourceError,
) -> StopFailure {
    ens_error!(
        context = LogContext::new()
            .with_ensemble(ensemble)
            .with_resource(kind.as_str(), name)
            .with_stage(Stage::Stop),
        "stop failed: {}",
        source
    );
    StopFailure {
        kind,
        name: name.to_owned(),
        source,
    }
}
