//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Remote process supervisor client."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use thiserror::Error;

/// Errors raised by [`SupervisorClient`](crate::SupervisorClient) calls.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The host/port/path triple does not form a valid URL.
    #[error("invalid supervisor endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    /// Connecting, sending, or reading the response failed.
    #[error("supervisor transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a non-success HTTP status.
    #[error("supervisor returned HTTP status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },
    /// The response body is not a well-formed XML-RPC payload of the expected shape.
    #[error("malformed XML-RPC payload: {0}")]
    Protocol(String),
    /// The supervisor answered with an XML-RPC fault.
    #[error("XML-RPC fault {code}: {message}")]
    Fault {
        /// Fault code reported by the supervisor (e.g. 10 for `BAD_NAME`).
        code: i64,
        /// Fault string reported by the supervisor.
        message: String,
    },
}

impl SupervisorError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// True when the error stems from the connection rather than from the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}
