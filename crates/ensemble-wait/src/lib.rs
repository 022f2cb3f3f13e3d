//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Readiness probes and wait strategies."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Readiness probes deciding when a started resource is usable.
//!
//! Every polling probe runs on top of [`IntervalRetry`]: transient failures
//! (refused connections, unexpected statuses, supervisor transport errors) are
//! logged, remembered as the last error and retried until the startup timeout
//! of the resource elapses.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ensemble_retry::IntervalRetry;
use parking_lot::Mutex;
use tracing::debug;

pub mod composite;
pub mod error;
pub mod http;
pub mod line_protocol;
pub mod ports;
pub mod strategy;
pub mod supervisor;
pub mod target;

pub use composite::AllWait;
pub use error::{AttemptError, PortUnreachable, WaitError};
pub use http::HttpWait;
pub use line_protocol::LineProtocolWait;
pub use ports::ListeningPortsWait;
pub use strategy::{Wait, WaitStrategy};
pub use supervisor::{SupervisorProcessesRunningWait, SupervisorRunningWait};
pub use target::{BoundPorts, WaitTarget};

/// Capability shared by every readiness probe.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Stable name reported in timeouts and logs.
    fn strategy_name(&self) -> &'static str;

    /// Resolve once `target` is ready, or fail when `startup_timeout` elapses.
    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError>;
}

/// Poll `attempt` until it succeeds, turning the deadline into [`WaitError::Timeout`]
/// whose source is the last failed attempt.
pub(crate) async fn poll_until_ready<F, Fut>(
    retry: &IntervalRetry,
    target: &WaitTarget,
    strategy: &'static str,
    startup_timeout: Duration,
    mut attempt: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AttemptError>>,
{
    let last_error: Mutex<Option<AttemptError>> = Mutex::new(None);
    let last_error_ref = &last_error;

    retry
        .retry_until(
            || {
                let pending = attempt();
                async move {
                    match pending.await {
                        Ok(()) => true,
                        Err(reason) => {
                            debug!(
                                resource = target.resource_id(),
                                strategy,
                                error = %reason,
                                "resource not ready yet"
                            );
                            *last_error_ref.lock() = Some(reason);
                            false
                        }
                    }
                }
            },
            |ready| *ready,
            |timeout| WaitError::Timeout {
                resource: target.resource_id().to_owned(),
                strategy,
                elapsed: timeout.elapsed,
                last_error: last_error_ref.lock().take(),
            },
            startup_timeout,
        )
        .await
        .map(|_| ())
}
