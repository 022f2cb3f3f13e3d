//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Readiness probes and wait strategies."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure of one readiness attempt, kept as the source of a timeout.
pub type AttemptError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while gating a resource on readiness.
#[derive(Debug, Error)]
pub enum WaitError {
    /// Readiness was not observed before the startup timeout.
    #[error(
        "resource {resource} not ready after {elapsed:?} waiting for {strategy}{}",
        last_error_suffix(.last_error)
    )]
    Timeout {
        /// Identifier of the resource being waited on.
        resource: String,
        /// Name of the strategy that gave up.
        strategy: &'static str,
        /// Time spent polling.
        elapsed: Duration,
        /// Most recent failed attempt, if any.
        #[source]
        last_error: Option<AttemptError>,
    },
    /// The strategy cannot run as configured.
    #[error("invalid wait strategy: {0}")]
    Configuration(String),
    /// The strategy refers to a container port that the resource does not expose.
    #[error("port {port} is not bound on the resource")]
    MissingPort {
        /// Container-side port that was requested.
        port: u16,
    },
}

impl WaitError {
    /// True for [`WaitError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Last attempt failure of a timeout, downcast to `E`.
    pub fn last_error_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Timeout {
                last_error: Some(err),
                ..
            } => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// A bound port refused or dropped the connection attempt.
#[derive(Debug, Error)]
#[error("port {container_port} ({host_port}): {source}")]
pub struct PortUnreachable {
    /// Container-side port.
    pub container_port: u16,
    /// Host port it is published on.
    pub host_port: u16,
    /// Connect failure; `TimedOut` when the attempt ran out of time.
    #[source]
    pub source: io::Error,
}

fn last_error_suffix(last_error: &Option<AttemptError>) -> String {
    match last_error {
        Some(reason) => format!(" (last error: {reason})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn timeout_message_carries_last_error() {
        let err = WaitError::Timeout {
            resource: "guac-server".into(),
            strategy: "http",
            elapsed: Duration::from_secs(2),
            last_error: Some("status 503".into()),
        };
        let text = err.to_string();
        assert!(text.contains("guac-server"));
        assert!(text.contains("http"));
        assert!(text.ends_with("(last error: status 503)"));
        assert!(err.is_timeout());
        assert!(!WaitError::MissingPort { port: 80 }.is_timeout());
    }

    #[test]
    fn timeout_exposes_the_last_failure_as_its_source() {
        let err = WaitError::Timeout {
            resource: "vnc".into(),
            strategy: "listening-ports",
            elapsed: Duration::from_millis(150),
            last_error: Some(Box::new(PortUnreachable {
                container_port: 5900,
                host_port: 32768,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })),
        };

        let source = err.source().unwrap();
        let unreachable = source.downcast_ref::<PortUnreachable>().unwrap();
        assert_eq!(unreachable.container_port, 5900);
        assert_eq!(
            source
                .source()
                .and_then(|inner| inner.downcast_ref::<io::Error>())
                .map(io::Error::kind),
            Some(io::ErrorKind::ConnectionRefused)
        );
        assert!(err.last_error_as::<PortUnreachable>().is_some());
        assert!(err.last_error_as::<io::Error>().is_none());

        let no_attempt = WaitError::Timeout {
            resource: "vnc".into(),
            strategy: "all",
            elapsed: Duration::ZERO,
            last_error: None,
        };
        assert!(no_attempt.source().is_none());
        assert!(WaitError::MissingPort { port: 80 }.source().is_none());
    }
}
