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

use async_trait::async_trait;
use ensemble_retry::IntervalRetry;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{AttemptError, PortUnreachable, WaitError};
use crate::target::WaitTarget;
use crate::{poll_until_ready, ReadinessProbe};

/// Ready once every bound port accepts a TCP connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListeningPortsWait {
    retry: IntervalRetry,
}

impl ListeningPortsWait {
    /// Probe with the default polling interval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval between two attempts.
    pub fn retry_interval(&self) -> Duration {
        self.retry.interval()
    }

    /// Override the polling interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry = IntervalRetry::new(interval);
        self
    }
}

#[async_trait]
impl ReadinessProbe for ListeningPortsWait {
    fn strategy_name(&self) -> &'static str {
        "listening-ports"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        let connect_timeout = self.retry.interval();
        poll_until_ready(
            &self.retry,
            target,
            self.strategy_name(),
            startup_timeout,
            || async move {
                for (container_port, host_port) in target.ports().iter() {
                    connect(target.host(), host_port, connect_timeout)
                        .await
                        .map_err(|source| PortUnreachable {
                            container_port,
                            host_port,
                            source,
                        })?;
                }
                Ok::<(), AttemptError>(())
            },
        )
        .await
    }
}

pub(crate) async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> io::Result<TcpStream> {
    timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {connect_timeout:?}"),
            ))
        })
}
