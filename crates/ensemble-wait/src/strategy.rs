//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Readiness probes and wait strategies."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use ensemble_common::SupervisorConfig;

use crate::composite::AllWait;
use crate::error::WaitError;
use crate::http::HttpWait;
use crate::line_protocol::LineProtocolWait;
use crate::ports::ListeningPortsWait;
use crate::supervisor::{SupervisorProcessesRunningWait, SupervisorRunningWait};
use crate::target::WaitTarget;
use crate::ReadinessProbe;

/// Composable readiness configuration attached to a resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Every bound port accepts TCP connections.
    ListeningPorts(ListeningPortsWait),
    /// An HTTP endpoint answers with the expected status.
    Http(HttpWait),
    /// Every member strategy succeeds.
    All(AllWait),
    /// The process supervisor reports RUNNING.
    SupervisorRunning(SupervisorRunningWait),
    /// Named supervised processes are RUNNING.
    SupervisorProcessesRunning(SupervisorProcessesRunningWait),
    /// A line-protocol session can be opened.
    LineProtocol(LineProtocolWait),
}

impl WaitStrategy {
    /// Override the polling interval; applied to every member of [`WaitStrategy::All`].
    pub fn with_retry_interval(self, interval: Duration) -> Self {
        match self {
            Self::ListeningPorts(wait) => Self::ListeningPorts(wait.with_retry_interval(interval)),
            Self::Http(wait) => Self::Http(wait.with_retry_interval(interval)),
            Self::All(wait) => Self::All(wait.with_retry_interval(interval)),
            Self::SupervisorRunning(wait) => {
                Self::SupervisorRunning(wait.with_retry_interval(interval))
            }
            Self::SupervisorProcessesRunning(wait) => {
                Self::SupervisorProcessesRunning(wait.with_retry_interval(interval))
            }
            Self::LineProtocol(wait) => Self::LineProtocol(wait.with_retry_interval(interval)),
        }
    }

    /// Point every supervisor-backed strategy, nested ones included, at the
    /// RPC path and request timeout in `config`.
    pub fn with_supervisor_config(self, config: &SupervisorConfig) -> Self {
        match self {
            Self::SupervisorRunning(wait) => {
                Self::SupervisorRunning(wait.with_client_config(config.clone()))
            }
            Self::SupervisorProcessesRunning(wait) => {
                Self::SupervisorProcessesRunning(wait.with_client_config(config.clone()))
            }
            Self::All(wait) => {
                Self::All(wait.map_strategies(|strategy| strategy.with_supervisor_config(config)))
            }
            other => other,
        }
    }

    /// Polling interval of a leaf strategy, or the shared interval of a
    /// non-empty [`WaitStrategy::All`] whose members agree.
    pub fn retry_interval(&self) -> Option<Duration> {
        match self {
            Self::ListeningPorts(wait) => Some(wait.retry_interval()),
            Self::Http(wait) => Some(wait.retry_interval()),
            Self::SupervisorRunning(wait) => Some(wait.retry_interval()),
            Self::SupervisorProcessesRunning(wait) => Some(wait.retry_interval()),
            Self::LineProtocol(wait) => Some(wait.retry_interval()),
            Self::All(all) => {
                let mut intervals = all.strategies().iter().map(WaitStrategy::retry_interval);
                let first = intervals.next()??;
                intervals
                    .all(|interval| interval == Some(first))
                    .then_some(first)
            }
        }
    }

    fn probe(&self) -> &dyn ReadinessProbe {
        match self {
            Self::ListeningPorts(wait) => wait,
            Self::Http(wait) => wait,
            Self::All(wait) => wait,
            Self::SupervisorRunning(wait) => wait,
            Self::SupervisorProcessesRunning(wait) => wait,
            Self::LineProtocol(wait) => wait,
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::ListeningPorts(ListeningPortsWait::default())
    }
}

#[async_trait]
impl ReadinessProbe for WaitStrategy {
    fn strategy_name(&self) -> &'static str {
        self.probe().strategy_name()
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        self.probe()
            .wait_until_ready(target, startup_timeout)
            .await
    }
}

impl From<ListeningPortsWait> for WaitStrategy {
    fn from(wait: ListeningPortsWait) -> Self {
        Self::ListeningPorts(wait)
    }
}

impl From<HttpWait> for WaitStrategy {
    fn from(wait: HttpWait) -> Self {
        Self::Http(wait)
    }
}

impl From<AllWait> for WaitStrategy {
    fn from(wait: AllWait) -> Self {
        Self::All(wait)
    }
}

impl From<SupervisorRunningWait> for WaitStrategy {
    fn from(wait: SupervisorRunningWait) -> Self {
        Self::SupervisorRunning(wait)
    }
}

impl From<SupervisorProcessesRunningWait> for WaitStrategy {
    fn from(wait: SupervisorProcessesRunningWait) -> Self {
        Self::SupervisorProcessesRunning(wait)
    }
}

impl From<LineProtocolWait> for WaitStrategy {
    fn from(wait: LineProtocolWait) -> Self {
        Self::LineProtocol(wait)
    }
}

/// Factory for the built-in strategies with default intervals.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wait;

impl Wait {
    /// Every bound port accepts TCP connections.
    pub fn for_listening_ports() -> WaitStrategy {
        ListeningPortsWait::new().into()
    }

    /// `GET path` on container `port` returns 200.
    pub fn for_http(path: impl Into<String>, port: u16) -> WaitStrategy {
        HttpWait::new(path, port).into()
    }

    /// Every strategy in `strategies` succeeds.
    pub fn for_all(strategies: Vec<WaitStrategy>) -> WaitStrategy {
        AllWait::new(strategies).into()
    }

    /// The supervisor on container `port` reports RUNNING.
    pub fn for_supervisor(port: u16) -> WaitStrategy {
        SupervisorRunningWait::new(port).into()
    }

    /// Every process in `names` is RUNNING under the supervisor on container `port`.
    pub fn for_supervisor_processes<I, S>(port: u16, names: I) -> Result<WaitStrategy, WaitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SupervisorProcessesRunningWait::new(port, names).map(Into::into)
    }

    /// A TCP session to container `port` can be opened.
    pub fn for_line_protocol(port: u16) -> WaitStrategy {
        LineProtocolWait::new(port).into()
    }
}
