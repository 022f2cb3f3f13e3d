//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Readiness probes and wait strategies."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use indexmap::IndexMap;

use crate::error::WaitError;

/// Container port to host port bindings, in the order they were exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundPorts {
    ports: IndexMap<u16, u16>,
}

impl BoundPorts {
    /// Empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder variant of [`BoundPorts::insert`].
    pub fn with(mut self, container_port: u16, host_port: u16) -> Self {
        self.insert(container_port, host_port);
        self
    }

    /// Record that `container_port` is reachable on `host_port`.
    pub fn insert(&mut self, container_port: u16, host_port: u16) {
        self.ports.insert(container_port, host_port);
    }

    /// Host port bound to `container_port`.
    pub fn get(&self, container_port: u16) -> Option<u16> {
        self.ports.get(&container_port).copied()
    }

    /// Host port bound to `container_port`, or [`WaitError::MissingPort`].
    pub fn require(&self, container_port: u16) -> Result<u16, WaitError> {
        self.get(container_port).ok_or(WaitError::MissingPort {
            port: container_port,
        })
    }

    /// `(container_port, host_port)` pairs in exposure order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.ports.iter().map(|(container, host)| (*container, *host))
    }

    /// Number of bound ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl FromIterator<(u16, u16)> for BoundPorts {
    fn from_iter<I: IntoIterator<Item = (u16, u16)>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

/// Live data of a started resource that probes need to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTarget {
    resource_id: String,
    host: String,
    ports: BoundPorts,
}

impl WaitTarget {
    /// Describe a resource reachable on `host` through `ports`.
    pub fn new(resource_id: impl Into<String>, host: impl Into<String>, ports: BoundPorts) -> Self {
        Self {
            resource_id: resource_id.into(),
            host: host.into(),
            ports,
        }
    }

    /// Identifier of the resource, used in errors and logs.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Host the bound ports are published on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port bindings of the resource.
    pub fn ports(&self) -> &BoundPorts {
        &self.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_exposure_order_and_reports_missing_ports() {
        let ports = BoundPorts::new().with(9090, 32770).with(5900, 32771);
        assert_eq!(ports.iter().collect::<Vec<_>>(), vec![(9090, 32770), (5900, 32771)]);
        assert_eq!(ports.require(5900).unwrap(), 32771);
        assert!(matches!(
            ports.require(22),
            Err(WaitError::MissingPort { port: 22 })
        ));
        assert_eq!(ports.len(), 2);
        assert!(BoundPorts::new().is_empty());
    }
}
