//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Narrow interface between the ensemble orchestrator and the host's container
//! and network primitives.
//!
//! The orchestrator only ever calls `start` on a described resource and `stop`
//! on a live handle. [`GenericNetwork`] and [`GenericContainer`] implement those
//! traits over any [`ContainerRuntime`].

pub mod container;
pub mod error;
pub mod generic;
pub mod resource;
pub mod runtime;

pub use container::{BindMode, BindMount, ContainerSpec, CopiedContent};
pub use error::ResourceError;
pub use generic::{GenericContainer, GenericNetwork};
pub use resource::{Network, Service, StartedNetwork, StartedService};
pub use runtime::{ContainerRuntime, RunningContainer};
