//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use ensemble_wait::WaitError;
use thiserror::Error;

/// Failures reported by resource handles and container runtimes.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The container runtime rejected or failed an operation.
    #[error("container runtime error: {message}")]
    Runtime {
        /// Runtime-provided description.
        message: String,
    },
    /// The resource started but never became ready.
    #[error(transparent)]
    Wait(#[from] WaitError),
    /// Local I/O failed while preparing or talking to the resource.
    #[error("resource i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResourceError {
    /// Shorthand for [`ResourceError::Runtime`].
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}
