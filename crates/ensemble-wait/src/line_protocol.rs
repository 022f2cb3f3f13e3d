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
use ensemble_retry::IntervalRetry;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{AttemptError, WaitError};
use crate::ports::connect;
use crate::target::WaitTarget;
use crate::{poll_until_ready, ReadinessProbe};

const MAX_PROMPT_SCAN: usize = 64 * 1024;

/// Telnet-style liveness: ready once a TCP session opens and, when configured,
/// the server has sent its prompt.
///
/// Both the connect and the prompt read are bounded by the retry interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProtocolWait {
    port: u16,
    prompt: Option<String>,
    retry: IntervalRetry,
}

impl LineProtocolWait {
    /// Probe the host port bound to container `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            prompt: None,
            retry: IntervalRetry::default(),
        }
    }

    /// Require the server to send `prompt` after connecting.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
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

    /// Container port of the line-protocol endpoint.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Expected prompt, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }
}

#[async_trait]
impl ReadinessProbe for LineProtocolWait {
    fn strategy_name(&self) -> &'static str {
        "line-protocol"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        let host_port = target.ports().require(self.port)?;
        let session_timeout = self.retry.interval();
        let prompt = self.prompt.as_deref();

        poll_until_ready(
            &self.retry,
            target,
            self.strategy_name(),
            startup_timeout,
            || async move {
                let mut stream = connect(target.host(), host_port, session_timeout).await?;
                let Some(prompt) = prompt else {
                    return Ok::<(), AttemptError>(());
                };
                match timeout(session_timeout, read_prompt(&mut stream, prompt)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(format!("no prompt within {session_timeout:?}").into()),
                }
            },
        )
        .await
    }
}

/// Read from `stream` until `prompt` shows up. Negotiation bytes sent before the
/// prompt are skipped over.
async fn read_prompt(stream: &mut TcpStream, prompt: &str) -> Result<(), AttemptError> {
    let needle = prompt.as_bytes();
    if needle.is_empty() {
        return Ok(());
    }
    let mut seen: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err("connection closed before prompt".into());
        }
        seen.extend_from_slice(&chunk[..read]);
        if seen.windows(needle.len()).any(|window| window == needle) {
            return Ok(());
        }
        if seen.len() > MAX_PROMPT_SCAN {
            return Err(format!("prompt {prompt:?} not found in {} bytes", seen.len()).into());
        }
    }
}
