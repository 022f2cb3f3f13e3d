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
use futures::future::try_join_all;

use crate::error::WaitError;
use crate::strategy::WaitStrategy;
use crate::target::WaitTarget;
use crate::ReadinessProbe;

/// Logical AND over several strategies.
///
/// Sub-probes are polled concurrently on the calling task. The first sub-probe
/// to fail aborts the others and its error is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllWait {
    strategies: Vec<WaitStrategy>,
}

impl AllWait {
    /// Combine `strategies`; an empty combination is ready immediately.
    pub fn new(strategies: Vec<WaitStrategy>) -> Self {
        Self { strategies }
    }

    /// Add another strategy to the combination.
    pub fn and(mut self, strategy: impl Into<WaitStrategy>) -> Self {
        self.strategies.push(strategy.into());
        self
    }

    /// Apply `interval` to every combined strategy.
    pub fn with_retry_interval(self, interval: Duration) -> Self {
        self.map_strategies(|strategy| strategy.with_retry_interval(interval))
    }

    pub(crate) fn map_strategies(self, f: impl FnMut(WaitStrategy) -> WaitStrategy) -> Self {
        Self {
            strategies: self.strategies.into_iter().map(f).collect(),
        }
    }

    /// Combined strategies, in registration order.
    pub fn strategies(&self) -> &[WaitStrategy] {
        &self.strategies
    }
}

#[async_trait]
impl ReadinessProbe for AllWait {
    fn strategy_name(&self) -> &'static str {
        "all"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        try_join_all(
            self.strategies
                .iter()
                .map(|strategy| strategy.wait_until_ready(target, startup_timeout)),
        )
        .await
        .map(|_| ())
    }
}
