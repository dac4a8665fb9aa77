use serde::{Deserialize, Serialize};

use super::AdminError;
use crate::types::{PropertyValue, VmKind, VmName, VmRef};

/// Which object a property read or write addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyTarget {
    /// The global admin object (`clockvm`, `default_template`, ...).
    Global,
    /// A single qube.
    Vm(VmName),
}

impl std::fmt::Display for PropertyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyTarget::Global => f.write_str("global"),
            PropertyTarget::Vm(name) => f.write_str(name.as_str()),
        }
    }
}

/// Argument bundle for creating a new qube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQubeRequest {
    pub name: VmName,
    pub label: String,
    pub kind: VmKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<VmName>,
}

/// Synchronous client for the Qubes administrative API.
///
/// Every call can fail with [`AdminError::DaemonAccess`] when the
/// privileged backend is unreachable. Callers must treat each call site as
/// a potential failure point and never let a caught error corrupt model
/// state: failed writes must not update caches, failed reads fall back to
/// the supplied default.
pub trait AdminClient {
    /// Enumerate currently existing qubes. The result is a snapshot; it is
    /// not re-queried automatically while a selector is open.
    fn domains(&self) -> Result<Vec<VmRef>, AdminError>;

    /// Label colors available for qubes.
    fn labels(&self) -> Result<Vec<String>, AdminError>;

    fn read_property(
        &self,
        target: &PropertyTarget,
        name: &str,
    ) -> Result<PropertyValue, AdminError>;

    fn write_property(
        &self,
        target: &PropertyTarget,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), AdminError>;

    /// Read a feature. `Ok(None)` means the feature is absent.
    fn read_feature(&self, vm: &VmName, name: &str) -> Result<Option<String>, AdminError>;

    /// Write a feature; `None` removes it. Features carry either no value
    /// or a non-empty string, per the wire convention.
    fn write_feature(&self, vm: &VmName, name: &str, value: Option<&str>)
        -> Result<(), AdminError>;

    fn create_vm(&self, request: &NewQubeRequest) -> Result<VmRef, AdminError>;
}

/// Look up a single qube in the enumeration snapshot.
///
/// A daemon outage reads as "not found", which is the degraded behavior
/// display-oriented callers want.
pub fn find_domain(admin: &dyn AdminClient, name: &VmName) -> Option<VmRef> {
    admin
        .domains()
        .ok()?
        .into_iter()
        .find(|vm| &vm.name == name)
}
