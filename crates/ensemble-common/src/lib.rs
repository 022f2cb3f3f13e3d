//! ---
//! ens_section: "01-core-functionality"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Shared configuration and tracing primitives."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! Shared primitives for the ensemble harness workspace.
//! This crate owns the single configuration-with-defaults structure and the
//! tracing bootstrap consumed by every other crate.

pub mod config;
pub mod logging;

pub use config::{
    EnsembleConfig, HarnessConfig, LoadedHarnessConfig, LoggingConfig, SupervisorConfig,
    WaitDefaults, DEFAULT_FIXTURES_NETWORK, DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_TIMEOUT,
};
pub use logging::{init_tracing, LogFormat};
