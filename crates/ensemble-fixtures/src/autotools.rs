//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Autotools configure and compile build steps."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fmt;

use async_trait::async_trait;

use crate::command::{argv, BuildCommand, CommandOutput, CommandRunner};
use crate::error::BuildError;

/// Feature switches passed to `./configure`.
///
/// The four components (`guacd`, `guacenc`, `guaclog`, `kubernetes`) are
/// disabled explicitly unless enabled; every library switch is only passed
/// when enabled, leaving the rest to autodetection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutotoolsConfig {
    /// Build the proxy daemon.
    pub guacd: bool,
    /// Build the video encoding tool.
    pub guacenc: bool,
    /// Build the input logging tool.
    pub guaclog: bool,
    /// Build support for attaching to Kubernetes pods.
    pub kubernetes: bool,
    /// Generate identifiers with libuuid.
    pub libuuid: bool,
    /// Encode video with libavcodec.
    pub libavcodec: bool,
    /// Encode video with libavformat.
    pub libavformat: bool,
    /// Encode video with libavutil.
    pub libavutil: bool,
    /// Encode video with libswscale.
    pub libswscale: bool,
    /// SSL encryption.
    pub ssl: bool,
    /// Windows Sockets API.
    pub winsock: bool,
    /// Ogg Vorbis.
    pub vorbis: bool,
    /// PulseAudio.
    pub pulse: bool,
    /// Pango text layout.
    pub pango: bool,
    /// Text-based protocols.
    pub terminal: bool,
    /// VNC.
    pub vnc: bool,
    /// RDP.
    pub rdp: bool,
    /// Install FreeRDP plugins into this directory.
    pub freerdp_plugin_dir: Option<String>,
    /// Allow unknown development snapshots of FreeRDP.
    pub allow_freerdp_snapshots: bool,
    /// SSH.
    pub ssh: bool,
    /// Built-in ssh-agent.
    pub ssh_agent: bool,
    /// Telnet.
    pub telnet: bool,
    /// WebP image encoding.
    pub webp: bool,
    /// WebSockets.
    pub websockets: bool,
}

impl AutotoolsConfig {
    /// Configuration building only the proxy daemon.
    pub fn guacd() -> Self {
        Self {
            guacd: true,
            ..Self::default()
        }
    }

    /// Arguments for `./configure`, in a stable order.
    pub fn configure_args(&self) -> Vec<String> {
        let disabled = [
            (self.guacd, "--disable-guacd"),
            (self.guacenc, "--disable-guacenc"),
            (self.guaclog, "--disable-guaclog"),
            (self.kubernetes, "--disable-kubernetes"),
        ];
        let enabled = [
            (self.libuuid, "--with-libuuid"),
            (self.libavcodec, "--with-libavcodec"),
            (self.libavformat, "--with-libavformat"),
            (self.libavutil, "--with-libavutil"),
            (self.libswscale, "--with-libswscale"),
            (self.ssl, "--with-ssl"),
            (self.winsock, "--with-winsock"),
            (self.vorbis, "--with-vorbis"),
            (self.pulse, "--with-pulse"),
            (self.pango, "--with-pango"),
            (self.terminal, "--with-terminal"),
            (self.vnc, "--with-vnc"),
            (self.rdp, "--with-rdp"),
        ];

        let mut args: Vec<String> = disabled
            .iter()
            .filter(|(on, _)| !on)
            .chain(enabled.iter().filter(|(on, _)| *on))
            .map(|(_, flag)| (*flag).to_owned())
            .collect();
        if let Some(dir) = self.freerdp_plugin_dir.as_deref().filter(|dir| !dir.is_empty()) {
            args.push(format!("--with-freerdp-plugins={dir}"));
        }
        let tail = [
            (self.allow_freerdp_snapshots, "--enable-freerdp-snapshots"),
            (self.ssh, "--with-ssh"),
            (self.ssh_agent, "--enable-ssh-agent"),
            (self.telnet, "--with-telnet"),
            (self.webp, "--with-webp"),
            (self.websockets, "--with-websockets"),
        ];
        args.extend(
            tail.iter()
                .filter(|(on, _)| *on)
                .map(|(_, flag)| (*flag).to_owned()),
        );
        args
    }
}

/// `autoreconf -fi` followed by `./configure`, both in the source directory.
///
/// Stops at the first failing step and reports only that step's output; on
/// success the outputs of both steps are concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configure {
    source_dir: String,
    config: AutotoolsConfig,
}

impl Configure {
    /// Configure the sources in `source_dir` with `config`.
    pub fn new(source_dir: impl Into<String>, config: AutotoolsConfig) -> Self {
        Self {
            source_dir: source_dir.into(),
            config,
        }
    }

    /// Full argv of the configure script.
    pub fn configure_argv(&self) -> Vec<String> {
        let mut args = argv(["./configure"]);
        args.extend(self.config.configure_args());
        args
    }
}

impl fmt::Display for Configure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("autotools configure")
    }
}

#[async_trait]
impl BuildCommand for Configure {
    async fn exec(&self, runner: &dyn CommandRunner) -> Result<CommandOutput, BuildError> {
        let dir = Some(self.source_dir.as_str());
        let reconf = runner.exec(&argv(["autoreconf", "-fi"]), dir).await?;
        if !reconf.is_success() {
            return Ok(reconf);
        }
        let configure = runner.exec(&self.configure_argv(), dir).await?;
        if !configure.is_success() {
            return Ok(configure);
        }
        Ok(CommandOutput::success(reconf.output + &configure.output))
    }
}

/// `make` in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compile {
    source_dir: String,
}

impl Compile {
    /// Compile the configured sources in `source_dir`.
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }
}

impl fmt::Display for Compile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("autotools compile")
    }
}

#[async_trait]
impl BuildCommand for Compile {
    async fn exec(&self, runner: &dyn CommandRunner) -> Result<CommandOutput, BuildError> {
        runner.exec(&argv(["make"]), Some(self.source_dir.as_str())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedRunner;
    use crate::command::run;

    #[test]
    fn empty_config_disables_every_component() {
        assert_eq!(
            AutotoolsConfig::default().configure_args(),
            vec![
                "--disable-guacd",
                "--disable-guacenc",
                "--disable-guaclog",
                "--disable-kubernetes",
            ]
        );
    }

    #[test]
    fn enabled_switches_follow_the_disabled_components() {
        let config = AutotoolsConfig {
            libuuid: true,
            ssh: true,
            ssh_agent: true,
            freerdp_plugin_dir: Some("/usr/lib/freerdp2".into()),
            ..AutotoolsConfig::guacd()
        };
        assert_eq!(
            config.configure_args(),
            vec![
                "--disable-guacenc",
                "--disable-guaclog",
                "--disable-kubernetes",
                "--with-libuuid",
                "--with-freerdp-plugins=/usr/lib/freerdp2",
                "--with-ssh",
                "--enable-ssh-agent",
            ]
        );
    }

    #[tokio::test]
    async fn configure_runs_autoreconf_then_configure_in_the_source_dir() {
        let runner = ScriptedRunner::replying([
            CommandOutput::success("autoreconf: done\n"),
            CommandOutput::success("guacd ...... yes\n"),
        ]);
        let configure = Configure::new("/build/guacamole-server", AutotoolsConfig::guacd());
        let output = run(&runner, &configure).await.unwrap();

        assert_eq!(output, "autoreconf: done\nguacd ...... yes\n");
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, vec!["autoreconf", "-fi"]);
        assert_eq!(calls[1].0[0], "./configure");
        assert!(calls[1].0.contains(&"--disable-guacenc".to_owned()));
        assert!(calls
            .iter()
            .all(|(_, dir)| dir.as_deref() == Some("/build/guacamole-server")));
    }

    #[tokio::test]
    async fn failed_autoreconf_skips_configure() {
        let runner = ScriptedRunner::replying([CommandOutput {
            output: "autoreconf: not found".into(),
            exit_code: 127,
        }]);
        let configure = Configure::new("/src", AutotoolsConfig::guacd());
        let result = configure.exec(&runner).await.unwrap();

        assert_eq!(result.exit_code, 127);
        assert_eq!(result.output, "autoreconf: not found");
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn compile_runs_make() {
        let runner = ScriptedRunner::default();
        let compile = Compile::new("/src");
        run(&runner, &compile).await.unwrap();
        assert_eq!(runner.calls(), vec![(vec!["make".to_owned()], Some("/src".to_owned()))]);
        assert_eq!(compile.to_string(), "autotools compile");
    }
}
