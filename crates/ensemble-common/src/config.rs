//! ---
//! ens_section: "01-core-functionality"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Shared configuration and tracing primitives."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Interval between two readiness probe attempts unless a strategy overrides it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Overall readiness deadline applied to a resource unless it overrides it.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Network name service providers use to attach fixture resources.
pub const DEFAULT_FIXTURES_NETWORK: &str = "fixtures";

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_startup_timeout() -> Duration {
    DEFAULT_STARTUP_TIMEOUT
}

fn default_fixtures_network() -> String {
    DEFAULT_FIXTURES_NETWORK.to_owned()
}

fn default_rpc_path() -> String {
    "/RPC2".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub wait: WaitDefaults,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`HarnessConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedHarnessConfig {
    pub config: HarnessConfig,
    pub source: PathBuf,
}

impl HarnessConfig {
    pub const ENV_CONFIG_PATH: &'static str = "ENSEMBLE_CONFIG";

    /// Load configuration from disk, respecting the `ENSEMBLE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedHarnessConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Load the first configuration file found, falling back to defaults when none exist.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let env_set = std::env::var(Self::ENV_CONFIG_PATH)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        if !env_set && !candidates.iter().any(|c| c.as_ref().exists()) {
            debug!("no harness configuration found; using defaults");
            return Ok(Self::default());
        }
        Self::load(candidates)
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<HarnessConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.wait.validate()?;
        self.ensemble.validate()?;
        if !self.supervisor.rpc_path.starts_with('/') {
            return Err(anyhow!(
                "supervisor rpc_path '{}' must start with '/'",
                self.supervisor.rpc_path
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for HarnessConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: HarnessConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Readiness polling defaults, documented once and shared by every wait strategy.
///
/// * `poll_interval_ms` is the delay between two probe attempts (500 ms).
/// * `startup_timeout_secs` is the overall deadline for a resource to become ready (60 s).
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitDefaults {
    #[serde(rename = "poll_interval_ms", default = "default_poll_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    #[serde(rename = "startup_timeout_secs", default = "default_startup_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub startup_timeout: Duration,
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            startup_timeout: default_startup_timeout(),
        }
    }
}

impl WaitDefaults {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!("wait poll interval must be greater than zero"));
        }
        if self.startup_timeout < self.poll_interval {
            return Err(anyhow!(
                "wait startup timeout ({:?}) must not be shorter than the poll interval ({:?})",
                self.startup_timeout,
                self.poll_interval
            ));
        }
        Ok(())
    }
}

/// Ensemble-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Pinned ensemble id. A random id is generated per start when unset.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_fixtures_network")]
    pub fixtures_network: String,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            id: None,
            fixtures_network: default_fixtures_network(),
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(anyhow!("ensemble id must not be blank when set"));
            }
        }
        if self.fixtures_network.trim().is_empty() {
            return Err(anyhow!("fixtures network name must not be blank"));
        }
        Ok(())
    }
}

/// Remote process supervisor endpoint settings.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
    #[serde(rename = "request_timeout_ms", default = "default_request_timeout")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            rpc_path: default_rpc_path(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Disable the rolling file layer, useful for short-lived test processes.
    #[serde(default)]
    pub stdout_only: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            stdout_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_documented_values() {
        let config = HarnessConfig::default();
        assert_eq!(config.wait.poll_interval, Duration::from_millis(500));
        assert_eq!(config.wait.startup_timeout, Duration::from_secs(60));
        assert_eq!(config.ensemble.fixtures_network, "fixtures");
        assert_eq!(config.supervisor.rpc_path, "/RPC2");
        assert!(config.ensemble.id.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: HarnessConfig = r#"
            [wait]
            poll_interval_ms = 100

            [ensemble]
            id = "ci-run"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.wait.poll_interval, Duration::from_millis(100));
        assert_eq!(config.wait.startup_timeout, DEFAULT_STARTUP_TIMEOUT);
        assert_eq!(config.ensemble.id.as_deref(), Some("ci-run"));
        assert_eq!(config.ensemble.fixtures_network, DEFAULT_FIXTURES_NETWORK);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let err = "[wait]\npoll_interval_ms = 0\n"
            .parse::<HarnessConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("poll interval"));
    }

    #[test]
    fn rejects_timeout_shorter_than_interval() {
        let defaults = WaitDefaults {
            poll_interval: Duration::from_secs(5),
            startup_timeout: Duration::from_secs(1),
        };
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn rejects_relative_rpc_path() {
        let err = "[supervisor]\nrpc_path = \"RPC2\"\n"
            .parse::<HarnessConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("rpc_path"));
    }

    #[test]
    fn load_reads_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[wait]\nstartup_timeout_secs = 5").unwrap();

        let missing = dir.path().join("missing.toml");
        let loaded = HarnessConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.wait.startup_timeout, Duration::from_secs(5));
    }

    #[test]
    fn load_or_default_without_files_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load_or_default(&[dir.path().join("absent.toml")]);
        // ENSEMBLE_CONFIG may be set by the surrounding environment; only assert the
        // default path when it is not.
        if std::env::var(HarnessConfig::ENV_CONFIG_PATH).is_err() {
            assert_eq!(config.unwrap().wait, WaitDefaults::default());
        }
    }
}
