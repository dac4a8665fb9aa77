//! Shared identifier and value types used by the admin seam and the
//! selection model.

use serde::{Deserialize, Serialize};

/// Name of a qube. Names are unique among live qubes and are the identity
/// the model keys on; holding a `VmName` never implies the qube still
/// exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmName(pub String);

impl VmName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VmName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VmName {
    fn from(name: &str) -> Self {
        VmName(name.to_string())
    }
}

impl From<String> for VmName {
    fn from(name: String) -> Self {
        VmName(name)
    }
}

/// Class of a qube, as reported by the admin backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmKind {
    AppVm,
    TemplateVm,
    StandaloneVm,
    DispVm,
    AdminVm,
}

/// Snapshot handle to a qube, taken from one admin enumeration.
///
/// A weak reference in spirit: it records what the backend reported at
/// enumeration time, and two handles compare equal when they name the same
/// qube. The qube may be gone by the time the handle is used; lookups that
/// come back empty are a missing entry, not a fault.
#[derive(Debug, Clone)]
pub struct VmRef {
    pub name: VmName,
    pub kind: VmKind,
    /// Label color ("red", "blue", ...).
    pub label: String,
    /// Icon name derived from the kind and label.
    pub icon: String,
    pub provides_network: bool,
    pub template_for_dispvms: bool,
}

impl VmRef {
    pub fn new(name: impl Into<VmName>, kind: VmKind) -> Self {
        VmRef {
            name: name.into(),
            kind,
            label: "gray".to_string(),
            icon: "appvm-gray".to_string(),
            provides_network: false,
            template_for_dispvms: false,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self.icon = format!("appvm-{label}");
        self
    }

    pub fn with_provides_network(mut self) -> Self {
        self.provides_network = true;
        self
    }

    pub fn with_template_for_dispvms(mut self) -> Self {
        self.template_for_dispvms = true;
        self
    }
}

impl PartialEq for VmRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for VmRef {}

impl std::hash::Hash for VmRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A property value as the admin backend reports it.
///
/// Qubes properties distinguish an explicitly unset value from "inherit
/// the system default"; the two are never conflated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Explicitly set to nothing.
    None,
    /// Inherit the backend default.
    Default,
    /// References a qube by name.
    Vm(VmName),
    /// Free-form textual value.
    Text(String),
}

impl PropertyValue {
    pub fn vm_name(&self) -> Option<&VmName> {
        match self {
            PropertyValue::Vm(name) => Some(name),
            _ => None,
        }
    }
}

/// Tri-state value of a boolean-like qube feature.
///
/// On the wire a feature is either absent or a non-empty string; boolean
/// semantics are a convention on top of that encoding. The tri-state
/// exists only in memory and is converted at the admin edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFlag {
    Unset,
    Enabled,
    Disabled,
}

impl FeatureFlag {
    /// Decode the wire encoding. Absent and empty both read as no value.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => FeatureFlag::Unset,
            Some(_) => FeatureFlag::Enabled,
        }
    }

    /// Encode for the wire. Only an enabled flag is stored as a value.
    pub fn to_wire(self) -> Option<&'static str> {
        match self {
            FeatureFlag::Enabled => Some("1"),
            FeatureFlag::Unset | FeatureFlag::Disabled => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            FeatureFlag::Unset => None,
            FeatureFlag::Enabled => Some(true),
            FeatureFlag::Disabled => Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_ref_equality_is_by_name() {
        let a = VmRef::new("work", VmKind::AppVm).with_label("blue");
        let b = VmRef::new("work", VmKind::TemplateVm).with_label("red");
        let c = VmRef::new("personal", VmKind::AppVm).with_label("blue");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_feature_flag_wire_decoding() {
        assert_eq!(FeatureFlag::from_wire(None), FeatureFlag::Unset);
        assert_eq!(FeatureFlag::from_wire(Some("")), FeatureFlag::Unset);
        assert_eq!(FeatureFlag::from_wire(Some("1")), FeatureFlag::Enabled);
        assert_eq!(FeatureFlag::from_wire(Some("anything")), FeatureFlag::Enabled);
    }

    #[test]
    fn test_feature_flag_wire_encoding() {
        assert_eq!(FeatureFlag::Enabled.to_wire(), Some("1"));
        assert_eq!(FeatureFlag::Disabled.to_wire(), None);
        assert_eq!(FeatureFlag::Unset.to_wire(), None);
    }

    #[test]
    fn test_feature_flag_as_bool() {
        assert_eq!(FeatureFlag::Unset.as_bool(), None);
        assert_eq!(FeatureFlag::Enabled.as_bool(), Some(true));
        assert_eq!(FeatureFlag::Disabled.as_bool(), Some(false));
    }
}
