//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Remote process supervisor client."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Minimal typed client over the state-query operations of a remote process
//! supervisor speaking XML-RPC over HTTP.
//!
//! The client performs no retries; callers that need to wait for a state are
//! expected to poll through a readiness probe.

pub mod client;
pub mod error;
pub mod types;
pub mod xmlrpc;

pub use client::SupervisorClient;
pub use error::SupervisorError;
pub use types::{ProcessInfo, ProcessState, SupervisorState};
pub use xmlrpc::Value;
