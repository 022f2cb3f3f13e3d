//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Build commands executed inside a builder container."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! Commands are plain values describing argv lists. They run through a
//! [`CommandRunner`], typically a started builder container, which keeps them
//! testable without one.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::error::BuildError;

/// Combined output and exit code of one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Interleaved stdout and stderr.
    pub output: String,
    /// Process exit code.
    pub exit_code: i64,
}

impl CommandOutput {
    /// Output of a command that exited with 0.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit_code: 0,
        }
    }

    /// Whether the command exited with 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes argv lists somewhere, e.g. inside a running container.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv`, in `working_dir` when given.
    async fn exec(&self, argv: &[String], working_dir: Option<&str>)
        -> Result<CommandOutput, BuildError>;
}

/// A build step expressed as one or more runner invocations.
#[async_trait]
pub trait BuildCommand: fmt::Display + Send + Sync {
    /// Run the step. A non-zero exit code is reported through the output, not
    /// as an error.
    async fn exec(&self, runner: &dyn CommandRunner) -> Result<CommandOutput, BuildError>;
}

/// Run `command` and return its output, failing on a non-zero exit code.
pub async fn run(runner: &dyn CommandRunner, command: &dyn BuildCommand) -> Result<String, BuildError> {
    let result = command.exec(runner).await?;
    if !result.is_success() {
        debug!(command = %command, exit_code = result.exit_code, output = %result.output, "build command failed");
        return Err(BuildError::CommandFailed {
            command: command.to_string(),
            exit_code: result.exit_code,
            output: result.output,
        });
    }
    Ok(result.output)
}

pub(crate) fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// Runner replaying scripted outputs and recording every invocation.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        replies: Mutex<VecDeque<CommandOutput>>,
        calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
    }

    impl ScriptedRunner {
        pub(crate) fn replying(replies: impl IntoIterator<Item = CommandOutput>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<(Vec<String>, Option<String>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn exec(
            &self,
            argv: &[String],
            working_dir: Option<&str>,
        ) -> Result<CommandOutput, BuildError> {
            self.calls
                .lock()
                .push((argv.to_vec(), working_dir.map(str::to_owned)));
            Ok(self.replies.lock().pop_front().unwrap_or_default())
        }
    }
}
