//! Trait holders: write-through bindings from a selected value to a qube
//! feature or property.
//!
//! A holder's cache mirrors the backend. It is refreshed immediately after
//! every write and never left stale; a refused write leaves it at its
//! pre-write value.

use std::rc::Rc;

use tracing::warn;

use crate::admin::{AdminClient, PropertyTarget};
use crate::model::ModelError;
use crate::types::{FeatureFlag, PropertyValue, VmName};

/// Cached value of a feature-backed holder.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Boolean interpretation of the wire encoding.
    Flag(FeatureFlag),
    /// Raw feature string; `None` when the feature is absent.
    Text(Option<String>),
}

impl FeatureValue {
    fn to_wire(&self) -> Option<String> {
        match self {
            FeatureValue::Flag(flag) => flag.to_wire().map(str::to_string),
            FeatureValue::Text(text) => text.clone(),
        }
    }
}

/// Binds a selected value to a feature on one qube.
pub struct FeatureHolder {
    admin: Rc<dyn AdminClient>,
    vm: VmName,
    feature: String,
    default: Option<String>,
    is_boolean: bool,
    current: FeatureValue,
}

impl FeatureHolder {
    pub fn new(
        admin: Rc<dyn AdminClient>,
        vm: VmName,
        feature: impl Into<String>,
        default: Option<String>,
    ) -> Self {
        Self::build(admin, vm, feature.into(), default, false)
    }

    /// Boolean holders normalize the wire value through [`FeatureFlag`]:
    /// absent or empty reads as no value, anything else as enabled.
    pub fn new_boolean(admin: Rc<dyn AdminClient>, vm: VmName, feature: impl Into<String>) -> Self {
        Self::build(admin, vm, feature.into(), None, true)
    }

    fn build(
        admin: Rc<dyn AdminClient>,
        vm: VmName,
        feature: String,
        default: Option<String>,
        is_boolean: bool,
    ) -> Self {
        let mut holder = FeatureHolder {
            admin,
            vm,
            feature,
            default,
            is_boolean,
            current: FeatureValue::Text(None),
        };
        holder.current = holder.read_current();
        holder
    }

    pub fn get_current_value(&self) -> &FeatureValue {
        &self.current
    }

    /// Boolean view of the cache. Non-boolean holders read as unset.
    pub fn flag(&self) -> FeatureFlag {
        match &self.current {
            FeatureValue::Flag(flag) => *flag,
            FeatureValue::Text(_) => FeatureFlag::Unset,
        }
    }

    /// Write through if the value differs from the cache, then re-read to
    /// normalize the backend encoding.
    pub fn set_trait(&mut self, new_value: FeatureValue) -> Result<(), ModelError> {
        if new_value == self.current {
            return Ok(());
        }
        let wire = new_value.to_wire();
        self.admin
            .write_feature(&self.vm, &self.feature, wire.as_deref())
            .map_err(|err| {
                warn!(vm = %self.vm, feature = %self.feature, %err, "feature write failed");
                ModelError::from(err)
            })?;
        self.current = self.read_current();
        Ok(())
    }

    fn read_current(&self) -> FeatureValue {
        let raw = match self.admin.read_feature(&self.vm, &self.feature) {
            Ok(raw) => raw.or_else(|| self.default.clone()),
            Err(err) => {
                warn!(vm = %self.vm, feature = %self.feature, %err,
                    "feature read failed, using default");
                self.default.clone()
            }
        };
        if self.is_boolean {
            FeatureValue::Flag(FeatureFlag::from_wire(raw.as_deref()))
        } else {
            FeatureValue::Text(raw)
        }
    }
}

/// Binds a selected value to a property on a qube or on the global admin
/// object.
pub struct PropertyHolder {
    admin: Rc<dyn AdminClient>,
    target: PropertyTarget,
    property: String,
    default: PropertyValue,
    current: PropertyValue,
}

impl PropertyHolder {
    pub fn new(
        admin: Rc<dyn AdminClient>,
        target: PropertyTarget,
        property: impl Into<String>,
        default: PropertyValue,
    ) -> Self {
        let property = property.into();
        let current = match admin.read_property(&target, &property) {
            Ok(value) => value,
            Err(err) => {
                warn!(target = %target, property = %property, %err,
                    "property read failed, using default");
                default.clone()
            }
        };
        PropertyHolder {
            admin,
            target,
            property,
            default,
            current,
        }
    }

    pub fn get_current_value(&self) -> &PropertyValue {
        &self.current
    }

    /// Write through if the value differs from the cache, then re-read.
    ///
    /// A target lacking the property is a configuration bug and fails with
    /// [`ModelError::AttributeMissing`] instead of being silently ignored.
    pub fn set_trait(&mut self, new_value: PropertyValue) -> Result<(), ModelError> {
        if new_value == self.current {
            return Ok(());
        }
        self.admin
            .write_property(&self.target, &self.property, &new_value)
            .map_err(|err| {
                warn!(target = %self.target, property = %self.property, %err,
                    "property write failed");
                ModelError::from(err)
            })?;
        self.current = match self.admin.read_property(&self.target, &self.property) {
            Ok(value) => value,
            Err(err) => {
                warn!(target = %self.target, property = %self.property, %err,
                    "property re-read failed, using default");
                self.default.clone()
            }
        };
        Ok(())
    }
}
