//! ---
//! ens_section: "06-resources"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Gateway user-mapping configuration rendering."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! `user-mapping.xml` rendering for the gateway's file-based authentication.
//!
//! Rendering is a pure function of the users passed in; every attribute and
//! text value is XML-escaped.

use std::borrow::Cow;
use std::fmt::Write;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

/// How a mapped user's password is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PasswordEncoding {
    /// Hex MD5 digest.
    Md5,
    /// Hex SHA-256 digest.
    Sha256,
}

/// Remote connection offered to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Protocol name, such as `vnc` or `telnet`.
    pub protocol: String,
    /// Protocol parameters in output order.
    #[serde(default)]
    pub params: IndexMap<String, String>,
}

impl Connection {
    /// Connection over `protocol` with no parameters.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            params: IndexMap::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }
}

/// One `<authorize>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    /// Login name.
    pub username: String,
    /// Password, encoded as `password_encoding` says.
    pub password: String,
    /// Password encoding; plain text when unset.
    #[serde(default)]
    pub password_encoding: Option<PasswordEncoding>,
    /// Connection used when the user has exactly one.
    #[serde(default)]
    pub default_connection: Option<Connection>,
    /// Named connections.
    #[serde(default)]
    pub connections: IndexMap<String, Connection>,
}

impl UserMapping {
    /// User with a plain-text password and no connections.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            password_encoding: None,
            default_connection: None,
            connections: IndexMap::new(),
        }
    }

    /// Declare the password encoding.
    pub fn with_password_encoding(mut self, encoding: PasswordEncoding) -> Self {
        self.password_encoding = Some(encoding);
        self
    }

    /// Set the unnamed default connection.
    pub fn with_default_connection(mut self, connection: Connection) -> Self {
        self.default_connection = Some(connection);
        self
    }

    /// Add a named connection.
    pub fn with_connection(mut self, name: impl Into<String>, connection: Connection) -> Self {
        self.connections.insert(name.into(), connection);
        self
    }
}

/// Render `users` as a `user-mapping.xml` document.
pub fn render_user_mapping(users: &[UserMapping]) -> String {
    let mut output = String::from("<user-mapping>\n");
    for user in users {
        let _ = write!(
            output,
            "    <authorize username=\"{}\" password=\"{}\"",
            escape_xml(&user.username),
            escape_xml(&user.password),
        );
        if let Some(encoding) = user.password_encoding {
            let _ = write!(output, " encoding=\"{encoding}\"");
        }
        output.push_str(">\n");
        if let Some(connection) = &user.default_connection {
            render_connection_body(&mut output, connection, "        ");
        }
        for (name, connection) in &user.connections {
            let _ = writeln!(output, "        <connection name=\"{}\">", escape_xml(name));
            render_connection_body(&mut output, connection, "            ");
            output.push_str("        </connection>\n");
        }
        output.push_str("    </authorize>\n");
    }
    output.push_str("</user-mapping>\n");
    output
}

fn render_connection_body(output: &mut String, connection: &Connection, indent: &str) {
    let _ = writeln!(
        output,
        "{indent}<protocol>{}</protocol>",
        escape_xml(&connection.protocol)
    );
    for (name, value) in &connection.params {
        let _ = writeln!(
            output,
            "{indent}<param name=\"{}\">{}</param>",
            escape_xml(name),
            escape_xml(value),
        );
    }
}

fn escape_xml(s: &str) -> Cow<'_, str> {
    if s.contains(['&', '<', '>', '"', '\'']) {
        Cow::Owned(
            s.replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;")
                .replace('"', "&quot;")
                .replace('\'', "&apos;"),
        )
    } else {
        Cow::Borrowed(s)
    }
}
