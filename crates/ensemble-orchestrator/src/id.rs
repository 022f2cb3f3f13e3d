//! ---
//! ens_section: "04-orchestration"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Ensemble lifecycle orchestrator."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::fmt;

use uuid::Uuid;

/// Identifier scoping every resource name of one ensemble instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnsembleId(String);

impl EnsembleId {
    /// Wrap a caller-chosen identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource name for `role` within this ensemble: `<role>-<id>`.
    pub fn scoped(&self, role: &str) -> String {
        format!("{role}-{}", self.0)
    }
}

impl fmt::Display for EnsembleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EnsembleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EnsembleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EnsembleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
