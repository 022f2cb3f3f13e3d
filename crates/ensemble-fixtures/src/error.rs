//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Fixture descriptor and builder errors."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use ensemble_orchestrator::EnsembleError;
use ensemble_wait::WaitError;
use thiserror::Error;

/// A fixture descriptor could not be built.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The web client was configured without authentication.
    #[error("guacamole client requires an authentication configuration")]
    MissingAuthentication,
    /// A readiness gate was misconfigured.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// A builder image or build step failed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The command could not be handed to the runner at all.
    #[error("command runner failed: {0}")]
    Runner(String),
    /// A build step ran and exited non-zero.
    #[error("{command} exited with status {exit_code}")]
    CommandFailed {
        /// Display name of the step.
        command: String,
        /// Exit code of the failing command.
        exit_code: i64,
        /// Output captured from the failing command.
        output: String,
    },
    /// No bundled Dockerfile template carries this name.
    #[error("unknown Dockerfile template {0}")]
    UnknownTemplate(String),
    /// A Dockerfile template failed to render.
    #[error("render Dockerfile template: {0}")]
    Template(#[from] askama::Error),
}

impl From<FixtureError> for EnsembleError {
    fn from(err: FixtureError) -> Self {
        EnsembleError::invalid_provider(err.to_string())
    }
}
