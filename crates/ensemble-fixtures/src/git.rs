//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Shallow git clone build step."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fmt;

use async_trait::async_trait;

use crate::command::{argv, BuildCommand, CommandOutput, CommandRunner};
use crate::error::BuildError;

/// Upstream proxy daemon sources.
pub const GUACAMOLE_SERVER_REPO: &str = "https://github.com/apache/guacamole-server.git";

/// Branch cloned unless another one is chosen.
pub const DEFAULT_BRANCH: &str = "master";

/// Single-branch, depth-1 `git clone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitClone {
    repo_url: String,
    branch: String,
    directory: Option<String>,
}

impl GitClone {
    /// Clone `repo_url` at [`DEFAULT_BRANCH`] into git's default directory.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: DEFAULT_BRANCH.to_owned(),
            directory: None,
        }
    }

    /// Clone `branch` instead.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Clone into `directory`.
    pub fn into_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Full argv of the clone.
    pub fn argv(&self) -> Vec<String> {
        let mut args = argv([
            "git",
            "clone",
            "--branch",
            self.branch.as_str(),
            "--single-branch",
            self.repo_url.as_str(),
            "--depth",
            "1",
        ]);
        args.extend(self.directory.clone());
        args
    }
}

impl fmt::Display for GitClone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("git clone")
    }
}

#[async_trait]
impl BuildCommand for GitClone {
    async fn exec(&self, runner: &dyn CommandRunner) -> Result<CommandOutput, BuildError> {
        runner.exec(&self.argv(), None).await
    }
}
