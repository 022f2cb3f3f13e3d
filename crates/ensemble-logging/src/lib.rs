//! ---
//! ens_section: "03-logging"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Structured ensemble lifecycle logging."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Lifecycle logging helpers that stamp every event with the ensemble id, the
//! resource being operated on and the lifecycle stage.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for tests and local runs.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Lifecycle stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Provider invocation and collection merge.
    Provision,
    /// Resource start, including readiness gating.
    Start,
    /// Resource teardown.
    Stop,
}

impl Stage {
    /// Stable lowercase label used as the `stage` field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Provision => "provision",
            Stage::Start => "start",
            Stage::Stop => "stop",
        }
    }
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Ensemble identifier associated with the log event.
    pub ensemble: Option<&'a str>,
    /// Resource kind (`network` or `service`).
    pub kind: Option<&'a str>,
    /// Resource name within its collection.
    pub resource: Option<&'a str>,
    /// Lifecycle stage.
    pub stage: Option<Stage>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an ensemble identifier.
    pub fn with_ensemble(mut self, ensemble: &'a str) -> Self {
        self.ensemble = Some(ensemble);
        self
    }

    /// Attach a resource kind and name.
    pub fn with_resource(mut self, kind: &'a str, resource: &'a str) -> Self {
        self.kind = Some(kind);
        self.resource = Some(resource);
        self
    }

    /// Attach a lifecycle stage.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    #[doc(hidden)]
    pub fn stage_str(&self) -> &'static str {
        self.stage.map(|stage| stage.as_str()).unwrap_or("")
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level, hence one arm per outcome.
    match outcome {
        LifecycleOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %message
        ),
        LifecycleOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %message
        ),
    }
}
