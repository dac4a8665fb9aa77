use std::cell::RefCell;
use std::collections::BTreeMap;

use super::client::{AdminClient, NewQubeRequest, PropertyTarget};
use super::AdminError;
use crate::types::{PropertyValue, VmName, VmRef};

const DEFAULT_LABELS: [&str; 8] = [
    "red", "orange", "yellow", "green", "gray", "blue", "purple", "black",
];

#[derive(Debug, Clone)]
struct QubeRecord {
    vm: VmRef,
    features: BTreeMap<String, String>,
    properties: BTreeMap<String, PropertyValue>,
}

impl QubeRecord {
    fn new(vm: VmRef) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("netvm".to_string(), PropertyValue::Default);
        QubeRecord {
            vm,
            features: BTreeMap::new(),
            properties,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    qubes: BTreeMap<VmName, QubeRecord>,
    global: BTreeMap<String, PropertyValue>,
    labels: Vec<String>,
    offline: bool,
}

/// In-memory [`AdminClient`] over a mutable qube store.
///
/// Properties must be defined (via the setters below or at qube creation)
/// before they can be written: writing an unknown property fails with
/// [`AdminError::NoSuchProperty`], matching the backend's behavior for
/// attributes a target does not have. `set_offline` simulates a daemon
/// outage so degraded-mode paths are exercisable.
pub struct MemoryAdmin {
    store: RefCell<Store>,
}

impl Default for MemoryAdmin {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdmin {
    pub fn new() -> Self {
        MemoryAdmin {
            store: RefCell::new(Store {
                labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
                ..Store::default()
            }),
        }
    }

    pub fn add_qube(&self, vm: VmRef) -> VmRef {
        let mut store = self.store.borrow_mut();
        store
            .qubes
            .insert(vm.name.clone(), QubeRecord::new(vm.clone()));
        vm
    }

    pub fn remove_qube(&self, name: &VmName) {
        self.store.borrow_mut().qubes.remove(name);
    }

    pub fn set_global_property(&self, name: &str, value: PropertyValue) {
        self.store
            .borrow_mut()
            .global
            .insert(name.to_string(), value);
    }

    pub fn set_vm_property(&self, vm: &VmName, name: &str, value: PropertyValue) {
        if let Some(record) = self.store.borrow_mut().qubes.get_mut(vm) {
            record.properties.insert(name.to_string(), value);
        }
    }

    pub fn set_feature(&self, vm: &VmName, name: &str, value: &str) {
        if let Some(record) = self.store.borrow_mut().qubes.get_mut(vm) {
            record.features.insert(name.to_string(), value.to_string());
        }
    }

    /// Simulate the qubesd connection going down (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.store.borrow_mut().offline = offline;
    }

    fn check_online(store: &Store) -> Result<(), AdminError> {
        if store.offline {
            Err(AdminError::DaemonAccess)
        } else {
            Ok(())
        }
    }
}

impl AdminClient for MemoryAdmin {
    fn domains(&self) -> Result<Vec<VmRef>, AdminError> {
        let store = self.store.borrow();
        Self::check_online(&store)?;
        Ok(store.qubes.values().map(|record| record.vm.clone()).collect())
    }

    fn labels(&self) -> Result<Vec<String>, AdminError> {
        let store = self.store.borrow();
        Self::check_online(&store)?;
        Ok(store.labels.clone())
    }

    fn read_property(
        &self,
        target: &PropertyTarget,
        name: &str,
    ) -> Result<PropertyValue, AdminError> {
        let store = self.store.borrow();
        Self::check_online(&store)?;
        let properties = match target {
            PropertyTarget::Global => &store.global,
            PropertyTarget::Vm(vm) => {
                let record = store
                    .qubes
                    .get(vm)
                    .ok_or_else(|| AdminError::Rejected(format!("no such qube: {vm}")))?;
                &record.properties
            }
        };
        properties
            .get(name)
            .cloned()
            .ok_or_else(|| AdminError::NoSuchProperty(name.to_string()))
    }

    fn write_property(
        &self,
        target: &PropertyTarget,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), AdminError> {
        let mut store = self.store.borrow_mut();
        Self::check_online(&store)?;
        let properties = match target {
            PropertyTarget::Global => &mut store.global,
            PropertyTarget::Vm(vm) => {
                let record = store
                    .qubes
                    .get_mut(vm)
                    .ok_or_else(|| AdminError::Rejected(format!("no such qube: {vm}")))?;
                &mut record.properties
            }
        };
        match properties.get_mut(name) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(AdminError::NoSuchProperty(name.to_string())),
        }
    }

    fn read_feature(&self, vm: &VmName, name: &str) -> Result<Option<String>, AdminError> {
        let store = self.store.borrow();
        Self::check_online(&store)?;
        let record = store
            .qubes
            .get(vm)
            .ok_or_else(|| AdminError::Rejected(format!("no such qube: {vm}")))?;
        Ok(record.features.get(name).cloned())
    }

    fn write_feature(
        &self,
        vm: &VmName,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), AdminError> {
        let mut store = self.store.borrow_mut();
        Self::check_online(&store)?;
        let record = store
            .qubes
            .get_mut(vm)
            .ok_or_else(|| AdminError::Rejected(format!("no such qube: {vm}")))?;
        match value {
            Some(value) => {
                record.features.insert(name.to_string(), value.to_string());
            }
            None => {
                record.features.remove(name);
            }
        }
        Ok(())
    }

    fn create_vm(&self, request: &NewQubeRequest) -> Result<VmRef, AdminError> {
        let mut store = self.store.borrow_mut();
        Self::check_online(&store)?;
        if store.qubes.contains_key(&request.name) {
            return Err(AdminError::Rejected(format!(
                "a qube named {} already exists",
                request.name
            )));
        }
        if !store.labels.iter().any(|l| l == &request.label) {
            return Err(AdminError::Rejected(format!(
                "no such label: {}",
                request.label
            )));
        }
        let vm = VmRef::new(request.name.clone(), request.kind).with_label(&request.label);
        let mut record = QubeRecord::new(vm.clone());
        if let Some(template) = &request.template {
            record
                .properties
                .insert("template".to_string(), PropertyValue::Vm(template.clone()));
        }
        store.qubes.insert(vm.name.clone(), record);
        Ok(vm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VmKind;

    fn admin_with_qube() -> MemoryAdmin {
        let admin = MemoryAdmin::new();
        admin.add_qube(VmRef::new("work", VmKind::AppVm).with_label("blue"));
        admin
    }

    #[test]
    fn test_offline_fails_every_call() {
        let admin = admin_with_qube();
        admin.set_offline(true);

        assert_eq!(admin.domains(), Err(AdminError::DaemonAccess));
        assert_eq!(admin.labels(), Err(AdminError::DaemonAccess));
        assert_eq!(
            admin.read_feature(&VmName::from("work"), "anything"),
            Err(AdminError::DaemonAccess)
        );

        admin.set_offline(false);
        assert_eq!(admin.domains().unwrap().len(), 1);
    }

    #[test]
    fn test_feature_roundtrip_and_removal() {
        let admin = admin_with_qube();
        let work = VmName::from("work");

        assert_eq!(admin.read_feature(&work, "flag").unwrap(), None);
        admin.write_feature(&work, "flag", Some("1")).unwrap();
        assert_eq!(
            admin.read_feature(&work, "flag").unwrap(),
            Some("1".to_string())
        );
        admin.write_feature(&work, "flag", None).unwrap();
        assert_eq!(admin.read_feature(&work, "flag").unwrap(), None);
    }

    #[test]
    fn test_undefined_property_write_fails() {
        let admin = admin_with_qube();
        let err = admin
            .write_property(
                &PropertyTarget::Vm(VmName::from("work")),
                "no_such_thing",
                &PropertyValue::None,
            )
            .unwrap_err();
        assert_eq!(err, AdminError::NoSuchProperty("no_such_thing".to_string()));
    }

    #[test]
    fn test_create_vm_rejects_duplicate_name() {
        let admin = admin_with_qube();
        let request = NewQubeRequest {
            name: VmName::from("work"),
            label: "red".to_string(),
            kind: VmKind::AppVm,
            template: None,
        };
        assert!(matches!(
            admin.create_vm(&request),
            Err(AdminError::Rejected(_))
        ));
    }

    #[test]
    fn test_create_vm_stores_template_property() {
        let admin = MemoryAdmin::new();
        let request = NewQubeRequest {
            name: VmName::from("mail"),
            label: "blue".to_string(),
            kind: VmKind::AppVm,
            template: Some(VmName::from("fedora-40")),
        };
        let vm = admin.create_vm(&request).unwrap();
        assert_eq!(vm.label, "blue");
        assert_eq!(
            admin
                .read_property(&PropertyTarget::Vm(vm.name.clone()), "template")
                .unwrap(),
            PropertyValue::Vm(VmName::from("fedora-40"))
        );
    }
}
