//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Gateway proxy and web client container descriptors."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use ensemble_runtime::ContainerSpec;
use ensemble_wait::Wait;

use crate::error::FixtureError;
use crate::user_mapping::{render_user_mapping, UserMapping};

/// Gateway proxy daemon image.
pub const GUACD_IMAGE: &str = "guacamole/guacd";
/// Gateway web client image.
pub const GUACAMOLE_IMAGE: &str = "guacamole/guacamole";
/// Configuration directory of the web client.
pub const DEFAULT_GUACAMOLE_HOME: &str = "/etc/guacamole";
/// Port the proxy daemon listens on.
pub const GUACD_PORT: u16 = 4822;
/// HTTP port of the web client.
pub const GUACAMOLE_HTTP_PORT: u16 = 8080;
/// Path answering 200 once the web client is up.
pub const GUACAMOLE_READY_PATH: &str = "/guacamole";
/// Host name the web client reaches the proxy daemon under.
pub const GUACD_DEFAULT_HOSTNAME: &str = "guac-proxy";

/// Proxy daemon descriptor.
pub fn guacd(image: &str) -> ContainerSpec {
    ContainerSpec::new(image)
}

/// Where the web client finds the proxy daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuacdSettings {
    /// Host name.
    pub hostname: String,
    /// Port.
    pub port: u16,
    /// Whether the daemon speaks TLS.
    pub ssl: bool,
}

impl Default for GuacdSettings {
    fn default() -> Self {
        Self {
            hostname: GUACD_DEFAULT_HOSTNAME.to_owned(),
            port: GUACD_PORT,
            ssl: false,
        }
    }
}

impl GuacdSettings {
    fn apply(&self, spec: ContainerSpec) -> ContainerSpec {
        spec.with_env("GUACD_HOSTNAME", self.hostname.as_str())
            .with_env("GUACD_PORT", self.port.to_string())
            .with_env("GUACD_SSL", self.ssl.to_string())
    }
}

/// File-based authentication: a `user-mapping.xml` copied into the client's
/// configuration directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMappingAuth {
    conf: String,
}

impl UserMappingAuth {
    /// Use an already rendered document.
    pub fn new(conf: impl Into<String>) -> Self {
        Self { conf: conf.into() }
    }

    /// Render `users` into a document.
    pub fn from_users(users: &[UserMapping]) -> Self {
        Self::new(render_user_mapping(users))
    }

    /// Document contents.
    pub fn conf(&self) -> &str {
        &self.conf
    }

    fn apply(&self, spec: ContainerSpec, home: &str) -> ContainerSpec {
        spec.with_env("GUACAMOLE_HOME", home)
            .with_copied_content(format!("{home}/user-mapping.xml"), self.conf.as_bytes())
    }
}

/// Web client descriptor builder. Authentication is mandatory.
#[derive(Debug, Clone)]
pub struct GuacamoleClient {
    image: String,
    home: String,
    auth: Option<UserMappingAuth>,
    guacd: GuacdSettings,
}

impl Default for GuacamoleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GuacamoleClient {
    /// Client from the official image, gated on its HTTP endpoint.
    pub fn new() -> Self {
        Self {
            image: GUACAMOLE_IMAGE.to_owned(),
            home: DEFAULT_GUACAMOLE_HOME.to_owned(),
            auth: None,
            guacd: GuacdSettings::default(),
        }
    }

    /// Use another image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Configuration directory (`GUACAMOLE_HOME`).
    pub fn with_guacamole_home(mut self, home: impl Into<String>) -> Self {
        self.home = home.into();
        self
    }

    /// Authentication configuration.
    pub fn with_auth(mut self, auth: UserMappingAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Proxy daemon location.
    pub fn with_guacd(mut self, guacd: GuacdSettings) -> Self {
        self.guacd = guacd;
        self
    }

    /// Build the container descriptor.
    pub fn into_spec(self) -> Result<ContainerSpec, FixtureError> {
        let auth = self.auth.ok_or(FixtureError::MissingAuthentication)?;
        let spec = ContainerSpec::new(self.image)
            .with_exposed_ports([GUACAMOLE_HTTP_PORT])
            .with_wait_strategy(Wait::for_http(GUACAMOLE_READY_PATH, GUACAMOLE_HTTP_PORT));
        let spec = auth.apply(spec, &self.home);
        Ok(self.guacd.apply(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_wait::ReadinessProbe;

    #[test]
    fn client_requires_authentication() {
        assert!(matches!(
            GuacamoleClient::new().into_spec(),
            Err(FixtureError::MissingAuthentication)
        ));
    }

    #[test]
    fn client_spec_carries_auth_and_proxy_settings() {
        let spec = GuacamoleClient::new()
            .with_auth(UserMappingAuth::from_users(&[]))
            .with_guacd(GuacdSettings {
                hostname: "proxy".into(),
                port: 4823,
                ssl: true,
            })
            .into_spec()
            .unwrap();

        assert_eq!(spec.image(), GUACAMOLE_IMAGE);
        assert_eq!(spec.exposed_ports(), [GUACAMOLE_HTTP_PORT]);
        assert_eq!(spec.wait_strategy().strategy_name(), "http");
        let env: Vec<_> = spec
            .environment()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        assert_eq!(
            env,
            vec![
                "GUACAMOLE_HOME=/etc/guacamole",
                "GUACD_HOSTNAME=proxy",
                "GUACD_PORT=4823",
                "GUACD_SSL=true",
            ]
        );
        let copied = &spec.copied_content()[0];
        assert_eq!(copied.target, "/etc/guacamole/user-mapping.xml");
        assert_eq!(copied.content, b"<user-mapping>\n</user-mapping>\n");
    }

    #[test]
    fn custom_home_moves_the_mapping_file() {
        let spec = GuacamoleClient::new()
            .with_guacamole_home("/config")
            .with_auth(UserMappingAuth::new("<user-mapping/>"))
            .into_spec()
            .unwrap();
        assert_eq!(spec.environment()["GUACAMOLE_HOME"], "/config");
        assert_eq!(spec.copied_content()[0].target, "/config/user-mapping.xml");
        assert_eq!(spec.environment()["GUACD_HOSTNAME"], GUACD_DEFAULT_HOSTNAME);
    }
}
