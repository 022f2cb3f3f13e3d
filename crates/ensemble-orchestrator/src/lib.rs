//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Ordered start and best-effort reverse teardown of ensembles: named groups of
//! networks and services scoped by an [`EnsembleId`].
//!
//! Networks start before services, each collection one resource at a time in
//! provider order. [`StartedEnsemble::stop`] mirrors that order, attempts every
//! resource and reports all failures together.

pub mod ensemble;
pub mod error;
pub mod id;
pub mod provider;
pub mod started;

pub use ensemble::Ensemble;
pub use error::{ConfigurationError, EnsembleError, ResourceKind, StopFailure, TeardownError};
pub use id::EnsembleId;
pub use provider::{
    NetworkPairs, NetworkProvider, ServicePairs, ServiceProvider, StartedNetworks,
    StartedServices,
};
pub use started::StartedEnsemble;
