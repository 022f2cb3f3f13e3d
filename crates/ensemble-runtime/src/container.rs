//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Resource collaborator interface."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use ensemble_common::{SupervisorConfig, WaitDefaults, DEFAULT_STARTUP_TIMEOUT};
use ensemble_wait::WaitStrategy;
use indexmap::IndexMap;
use strum::{AsRefStr, Display};

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
pub enum BindMode {
    /// Mounted read-only.
    #[default]
    #[strum(serialize = "ro")]
    ReadOnly,
    /// Mounted read-write.
    #[strum(serialize = "rw")]
    ReadWrite,
}

/// Host path mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub source: PathBuf,
    /// Path inside the container.
    pub target: String,
    /// Access mode.
    pub mode: BindMode,
}

/// File content copied into the container before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedContent {
    /// Destination path inside the container.
    pub target: String,
    /// File bytes.
    pub content: Vec<u8>,
    /// Unix permission bits.
    pub mode: u32,
}

/// Description of a container to run, consumed by a [`ContainerRuntime`](crate::ContainerRuntime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    image: String,
    name: Option<String>,
    networks: Vec<String>,
    network_aliases: Vec<String>,
    exposed_ports: Vec<u16>,
    environment: IndexMap<String, String>,
    bind_mounts: Vec<BindMount>,
    copied: Vec<CopiedContent>,
    shm_size: Option<u64>,
    wait: WaitStrategy,
    startup_timeout: Duration,
}

impl ContainerSpec {
    /// Describe a container running `image`, gated on listening ports by default.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            networks: Vec::new(),
            network_aliases: Vec::new(),
            exposed_ports: Vec::new(),
            environment: IndexMap::new(),
            bind_mounts: Vec::new(),
            copied: Vec::new(),
            shm_size: None,
            wait: WaitStrategy::default(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Container name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the container to `network`. May be called repeatedly.
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.networks.push(network.into());
        self
    }

    /// Alias the container is reachable under on its networks.
    pub fn with_network_alias(mut self, alias: impl Into<String>) -> Self {
        self.network_aliases.push(alias.into());
        self
    }

    /// Publish container `ports` on the host.
    pub fn with_exposed_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        for port in ports {
            if !self.exposed_ports.contains(&port) {
                self.exposed_ports.push(port);
            }
        }
        self
    }

    /// Set one environment variable; later values replace earlier ones.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables.
    pub fn with_environment<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.environment.insert(key.into(), value.into());
        }
        self
    }

    /// Mount a host path into the container.
    pub fn with_bind_mount(
        mut self,
        source: impl Into<PathBuf>,
        target: impl Into<String>,
        mode: BindMode,
    ) -> Self {
        self.bind_mounts.push(BindMount {
            source: source.into(),
            target: target.into(),
            mode,
        });
        self
    }

    /// Copy `content` to `target` inside the container with `0o644` permissions.
    pub fn with_copied_content(mut self, target: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.copied.push(CopiedContent {
            target: target.into(),
            content: content.into(),
            mode: 0o644,
        });
        self
    }

    /// Size of `/dev/shm` in bytes.
    pub fn with_shm_size(mut self, bytes: u64) -> Self {
        self.shm_size = Some(bytes);
        self
    }

    /// Readiness gate applied after the container runs.
    pub fn with_wait_strategy(mut self, wait: impl Into<WaitStrategy>) -> Self {
        self.wait = wait.into();
        self
    }

    /// Deadline for the readiness gate.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Take the startup timeout from `defaults` and poll the current wait
    /// strategy, nested members included, at its interval. A strategy set
    /// afterwards keeps its own interval.
    pub fn with_wait_defaults(mut self, defaults: &WaitDefaults) -> Self {
        self.startup_timeout = defaults.startup_timeout;
        self.wait = self.wait.with_retry_interval(defaults.poll_interval);
        self
    }

    /// Point supervisor-backed readiness checks at the endpoint in `config`.
    pub fn with_supervisor_config(mut self, config: &SupervisorConfig) -> Self {
        self.wait = self.wait.with_supervisor_config(config);
        self
    }

    /// Image reference.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Container name, if set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Networks to attach to, in order.
    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    /// Network aliases.
    pub fn network_aliases(&self) -> &[String] {
        &self.network_aliases
    }

    /// Published container ports.
    pub fn exposed_ports(&self) -> &[u16] {
        &self.exposed_ports
    }

    /// Environment variables, in insertion order.
    pub fn environment(&self) -> &IndexMap<String, String> {
        &self.environment
    }

    /// Bind mounts.
    pub fn bind_mounts(&self) -> &[BindMount] {
        &self.bind_mounts
    }

    /// Files copied into the container.
    pub fn copied_content(&self) -> &[CopiedContent] {
        &self.copied
    }

    /// Shared-memory size in bytes.
    pub fn shm_size(&self) -> Option<u64> {
        self.shm_size
    }

    /// Readiness gate.
    pub fn wait_strategy(&self) -> &WaitStrategy {
        &self.wait
    }

    /// Readiness deadline.
    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_wait::Wait;

    #[test]
    fn builder_collects_settings() {
        let spec = ContainerSpec::new("guacamole/guacd:1.5.5")
            .with_name("guac-proxy-0b7c")
            .with_network("guacamole-0b7c")
            .with_network("fixtures-0b7c")
            .with_exposed_ports([4822, 4822])
            .with_env("GUACD_LOG_LEVEL", "info")
            .with_env("GUACD_LOG_LEVEL", "debug")
            .with_bind_mount("/etc/localtime", "/etc/localtime", BindMode::ReadOnly)
            .with_copied_content("/etc/motd", "hello")
            .with_shm_size(1 << 30)
            .with_wait_strategy(Wait::for_line_protocol(4822))
            .with_startup_timeout(Duration::from_secs(5));

        assert_eq!(spec.image(), "guacamole/guacd:1.5.5");
        assert_eq!(spec.name(), Some("guac-proxy-0b7c"));
        assert_eq!(spec.networks(), ["guacamole-0b7c", "fixtures-0b7c"]);
        assert_eq!(spec.exposed_ports(), [4822]);
        assert_eq!(spec.environment()["GUACD_LOG_LEVEL"], "debug");
        assert_eq!(spec.bind_mounts()[0].mode.as_ref(), "ro");
        assert_eq!(spec.copied_content()[0].content, b"hello");
        assert_eq!(spec.copied_content()[0].mode, 0o644);
        assert_eq!(spec.shm_size(), Some(1 << 30));
        assert_eq!(spec.wait_strategy(), &Wait::for_line_protocol(4822));
        assert_eq!(spec.startup_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn defaults_to_listening_ports_and_global_timeout() {
        let spec = ContainerSpec::new("alpine");
        assert_eq!(spec.wait_strategy(), &Wait::for_listening_ports());
        assert_eq!(spec.startup_timeout(), DEFAULT_STARTUP_TIMEOUT);
        assert!(spec.name().is_none());
    }

    #[test]
    fn wait_defaults_retime_the_current_strategy() {
        let defaults = WaitDefaults {
            poll_interval: Duration::from_millis(25),
            startup_timeout: Duration::from_secs(3),
        };
        let spec = ContainerSpec::new("vnc-server")
            .with_wait_strategy(Wait::for_all(vec![
                Wait::for_listening_ports(),
                Wait::for_supervisor(9090),
            ]))
            .with_wait_defaults(&defaults);
        assert_eq!(spec.startup_timeout(), Duration::from_secs(3));
        assert_eq!(
            spec.wait_strategy().retry_interval(),
            Some(Duration::from_millis(25))
        );

        let replaced = spec.with_wait_strategy(Wait::for_line_protocol(23));
        assert_eq!(replaced.startup_timeout(), Duration::from_secs(3));
        assert_eq!(
            replaced.wait_strategy().retry_interval(),
            Some(ensemble_common::DEFAULT_POLL_INTERVAL)
        );
    }

    #[test]
    fn supervisor_config_reaches_the_wait_strategy() {
        let config = SupervisorConfig {
            rpc_path: "/rpc".into(),
            ..SupervisorConfig::default()
        };
        let spec = ContainerSpec::new("vnc-server")
            .with_wait_strategy(Wait::for_supervisor(9090))
            .with_supervisor_config(&config);
        let WaitStrategy::SupervisorRunning(wait) = spec.wait_strategy() else {
            panic!("expected a supervisor strategy");
        };
        assert_eq!(wait.client_config().rpc_path, "/rpc");
    }
}
