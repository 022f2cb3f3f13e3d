//! ---
//! ens_section: "11-testing"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Test harness doubles and shared exports."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! Test doubles for ensemble lifecycle and readiness tests: scripted resources
//! sharing a call log, an in-memory container runtime, and local protocol servers
//! standing in for a process supervisor and a Telnet daemon.

pub mod prompt;
pub mod recording;
pub mod runtime;
pub mod supervisor;

pub use prompt::PromptServer;
pub use recording::{CallLog, FailureScript, RecordingNetwork, RecordingService};
pub use runtime::RecordingRuntime;
pub use supervisor::MockSupervisor;
