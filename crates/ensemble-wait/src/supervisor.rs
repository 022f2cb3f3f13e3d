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
use ensemble_retry::IntervalRetry;
use ensemble_supervisor::{ProcessInfo, SupervisorClient, SupervisorState};

use crate::error::{AttemptError, WaitError};
use crate::target::WaitTarget;
use crate::{poll_until_ready, ReadinessProbe};

fn client_for(
    target: &WaitTarget,
    port: u16,
    config: &SupervisorConfig,
) -> Result<SupervisorClient, WaitError> {
    let host_port = target.ports().require(port)?;
    SupervisorClient::with_config(target.host(), host_port, config)
        .map_err(|err| WaitError::Configuration(format!("supervisor client: {err}")))
}

/// Ready once the supervisor listening on `port` reports `RUNNING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorRunningWait {
    port: u16,
    client: SupervisorConfig,
    retry: IntervalRetry,
}

impl SupervisorRunningWait {
    /// Probe the supervisor RPC endpoint exposed on container `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            client: SupervisorConfig::default(),
            retry: IntervalRetry::default(),
        }
    }

    /// Override the RPC path and per-request timeout.
    pub fn with_client_config(mut self, config: SupervisorConfig) -> Self {
        self.client = config;
        self
    }

    /// RPC path and per-request timeout used by the client.
    pub fn client_config(&self) -> &SupervisorConfig {
        &self.client
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

    /// Container port of the supervisor RPC endpoint.
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl ReadinessProbe for SupervisorRunningWait {
    fn strategy_name(&self) -> &'static str {
        "supervisor-running"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        let client = client_for(target, self.port, &self.client)?;
        let client = &client;
        poll_until_ready(
            &self.retry,
            target,
            self.strategy_name(),
            startup_timeout,
            || async move {
                match client.get_state().await? {
                    SupervisorState::Running => Ok::<(), AttemptError>(()),
                    state => Err(format!("supervisor state is {state}").into()),
                }
            },
        )
        .await
    }
}

/// Ready once every named process is known to the supervisor and `RUNNING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorProcessesRunningWait {
    port: u16,
    process_names: Vec<String>,
    client: SupervisorConfig,
    retry: IntervalRetry,
}

impl SupervisorProcessesRunningWait {
    /// Probe the named processes through the supervisor exposed on container `port`.
    ///
    /// Names match either the bare process name or `group:name`. An empty list is
    /// rejected.
    pub fn new<I, S>(port: u16, process_names: I) -> Result<Self, WaitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let process_names: Vec<String> = process_names.into_iter().map(Into::into).collect();
        if process_names.is_empty() {
            return Err(WaitError::Configuration(
                "at least one supervised process name is required".into(),
            ));
        }
        Ok(Self {
            port,
            process_names,
            client: SupervisorConfig::default(),
            retry: IntervalRetry::default(),
        })
    }

    /// Override the RPC path and per-request timeout.
    pub fn with_client_config(mut self, config: SupervisorConfig) -> Self {
        self.client = config;
        self
    }

    /// RPC path and per-request timeout used by the client.
    pub fn client_config(&self) -> &SupervisorConfig {
        &self.client
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

    /// Container port of the supervisor RPC endpoint.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Processes that must be running.
    pub fn process_names(&self) -> &[String] {
        &self.process_names
    }
}

#[async_trait]
impl ReadinessProbe for SupervisorProcessesRunningWait {
    fn strategy_name(&self) -> &'static str {
        "supervisor-processes"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        let client = client_for(target, self.port, &self.client)?;
        let client = &client;
        let names = self.process_names.as_slice();
        poll_until_ready(
            &self.retry,
            target,
            self.strategy_name(),
            startup_timeout,
            || async move {
                let processes = client.get_all_process_info().await?;
                check_processes(names, &processes).map_err(AttemptError::from)
            },
        )
        .await
    }
}

fn check_processes(names: &[String], processes: &[ProcessInfo]) -> Result<(), String> {
    for name in names {
        let process = processes
            .iter()
            .find(|info| info.name == *name || format!("{}:{}", info.group, info.name) == *name)
            .ok_or_else(|| format!("process {name} is not supervised"))?;
        if !process.is_running() {
            return Err(format!("process {name} is {}", process.state));
        }
    }
    Ok(())
}
