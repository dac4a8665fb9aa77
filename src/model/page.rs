//! Page aggregation: one save operation committing every changed binding.

use tracing::info;

use crate::model::holder::{FeatureHolder, FeatureValue, PropertyHolder};
use crate::model::selector::{ChoiceSelector, QubeSelector, SelectedValue, TraitSelector};
use crate::model::ModelError;
use crate::types::{PropertyValue, VmName};

/// One named selector/holder pair owned by a settings page.
pub trait SettingBinding {
    /// Stable name used in save reports ("clockvm", ...).
    fn name(&self) -> &str;

    fn is_changed(&self) -> bool;

    /// Write the selected value through to the backend.
    fn commit(&mut self) -> Result<(), ModelError>;

    /// Advance the saved baseline after a successful commit.
    fn mark_saved(&mut self);

    /// Drop unsaved edits.
    fn reset(&mut self);
}

/// Failed part of a page save.
#[derive(Debug)]
pub struct SaveFailure {
    pub binding: String,
    pub error: ModelError,
}

/// Outcome of a page save: the failed subset, with everything that
/// succeeded already committed and re-baselined.
#[derive(Debug, Default)]
pub struct SaveReport {
    failures: Vec<SaveFailure>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[SaveFailure] {
        &self.failures
    }
}

/// A logical settings page.
pub trait PageHandler {
    /// Commit all pending writes. Every changed binding is attempted; the
    /// saved baseline advances only for bindings whose write succeeded,
    /// and the failed subset is reported back to the caller.
    fn save(&mut self) -> SaveReport;

    /// Drop unsaved edits on every binding.
    fn reset(&mut self);
}

/// Shared commit loop for [`PageHandler::save`] implementations.
pub fn commit_all<'a, I>(bindings: I) -> SaveReport
where
    I: IntoIterator<Item = &'a mut dyn SettingBinding>,
{
    let mut report = SaveReport::default();
    for binding in bindings {
        if !binding.is_changed() {
            continue;
        }
        match binding.commit() {
            Ok(()) => binding.mark_saved(),
            Err(error) => report.failures.push(SaveFailure {
                binding: binding.name().to_string(),
                error,
            }),
        }
    }
    if report.is_ok() {
        info!("page saved");
    } else {
        info!(failed = report.failures.len(), "page saved with failures");
    }
    report
}

/// Feature-backed binding: a [`ChoiceSelector`] committed through a
/// [`FeatureHolder`]. `encode` maps the selected choice to the feature
/// value written out.
pub struct FeatureSetting<T> {
    name: String,
    pub selector: ChoiceSelector<T>,
    holder: FeatureHolder,
    encode: fn(&T) -> FeatureValue,
}

impl<T: Clone + PartialEq + std::fmt::Debug> FeatureSetting<T> {
    pub fn new(
        name: impl Into<String>,
        selector: ChoiceSelector<T>,
        holder: FeatureHolder,
        encode: fn(&T) -> FeatureValue,
    ) -> Self {
        FeatureSetting {
            name: name.into(),
            selector,
            holder,
            encode,
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> SettingBinding for FeatureSetting<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_changed(&self) -> bool {
        self.selector.is_changed()
    }

    fn commit(&mut self) -> Result<(), ModelError> {
        let value = (self.encode)(&self.selector.get_selected());
        self.holder.set_trait(value)
    }

    fn mark_saved(&mut self) {
        self.selector.update_initial();
    }

    fn reset(&mut self) {
        self.selector.reset();
    }
}

/// Property-backed binding: a [`QubeSelector`] committed through a
/// [`PropertyHolder`].
pub struct PropertySetting {
    name: String,
    pub selector: QubeSelector,
    holder: PropertyHolder,
}

impl PropertySetting {
    pub fn new(name: impl Into<String>, selector: QubeSelector, holder: PropertyHolder) -> Self {
        PropertySetting {
            name: name.into(),
            selector,
            holder,
        }
    }
}

/// Map a resolved selection onto the property value written out. Tokens
/// without a live backing qube still write as a name reference; the
/// backend validates them.
pub(crate) fn selected_to_property(value: SelectedValue) -> PropertyValue {
    match value {
        SelectedValue::ExplicitNone => PropertyValue::None,
        SelectedValue::SystemDefault => PropertyValue::Default,
        SelectedValue::Qube(vm) => PropertyValue::Vm(vm.name),
        SelectedValue::Token(token) => PropertyValue::Vm(VmName::from(token)),
    }
}

impl SettingBinding for PropertySetting {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_changed(&self) -> bool {
        self.selector.is_changed()
    }

    fn commit(&mut self) -> Result<(), ModelError> {
        let selected = self
            .selector
            .get_selected()
            .ok_or_else(|| ModelError::SelectionNotFound("nothing is selected".to_string()))?;
        self.holder.set_trait(selected_to_property(selected))
    }

    fn mark_saved(&mut self) {
        self.selector.update_initial();
    }

    fn reset(&mut self) {
        self.selector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminClient, MemoryAdmin, PropertyTarget};
    use crate::model::entry_table::EntryTableBuilder;
    use crate::types::{FeatureFlag, VmKind, VmRef};
    use std::rc::Rc;

    fn admin_fixture() -> Rc<MemoryAdmin> {
        let admin = Rc::new(MemoryAdmin::new());
        admin.add_qube(VmRef::new("dom0", VmKind::AdminVm).with_label("black"));
        admin.add_qube(VmRef::new("sys-net", VmKind::AppVm).with_provides_network());
        admin.set_global_property("clockvm", PropertyValue::None);
        admin
    }

    fn clockvm_setting(admin: &Rc<MemoryAdmin>) -> PropertySetting {
        let holder = PropertyHolder::new(
            admin.clone(),
            PropertyTarget::Global,
            "clockvm",
            PropertyValue::None,
        );
        let table = EntryTableBuilder::new(admin.as_ref()).allow_none().build();
        let selector = QubeSelector::new(table, Some(crate::model::entry_table::NONE_TOKEN));
        PropertySetting::new("clockvm", selector, holder)
    }

    fn fullscreen_setting(admin: &Rc<MemoryAdmin>) -> FeatureSetting<FeatureFlag> {
        let holder = FeatureHolder::new_boolean(
            admin.clone(),
            VmName::from("dom0"),
            "gui-default-allow-fullscreen",
        );
        let selector = ChoiceSelector::with_selected(
            vec![
                ("default (disallow)".to_string(), FeatureFlag::Unset),
                ("allow".to_string(), FeatureFlag::Enabled),
                ("disallow".to_string(), FeatureFlag::Disabled),
            ],
            &holder.flag(),
        );
        FeatureSetting::new(
            "gui-default-allow-fullscreen",
            selector,
            holder,
            |flag| FeatureValue::Flag(*flag),
        )
    }

    #[test]
    fn test_commit_all_skips_unchanged_bindings() {
        let admin = admin_fixture();
        let mut clockvm = clockvm_setting(&admin);
        let mut fullscreen = fullscreen_setting(&admin);

        // Nothing changed; an offline backend must not be touched at all.
        admin.set_offline(true);
        let report = commit_all([
            &mut clockvm as &mut dyn SettingBinding,
            &mut fullscreen as &mut dyn SettingBinding,
        ]);
        assert!(report.is_ok());
    }

    #[test]
    fn test_commit_all_advances_baseline_only_on_success() {
        let admin = admin_fixture();
        let mut clockvm = clockvm_setting(&admin);
        let mut fullscreen = fullscreen_setting(&admin);

        clockvm.selector.select("sys-net").unwrap();
        fullscreen.selector.select(&FeatureFlag::Enabled).unwrap();

        admin.set_offline(true);
        let report = commit_all([
            &mut clockvm as &mut dyn SettingBinding,
            &mut fullscreen as &mut dyn SettingBinding,
        ]);
        assert_eq!(report.failures().len(), 2);
        assert!(clockvm.is_changed(), "failed binding must stay changed");

        admin.set_offline(false);
        let report = commit_all([
            &mut clockvm as &mut dyn SettingBinding,
            &mut fullscreen as &mut dyn SettingBinding,
        ]);
        assert!(report.is_ok());
        assert!(!clockvm.is_changed());
        assert_eq!(
            admin
                .read_property(&PropertyTarget::Global, "clockvm")
                .unwrap(),
            PropertyValue::Vm(VmName::from("sys-net"))
        );
        assert_eq!(
            admin
                .read_feature(&VmName::from("dom0"), "gui-default-allow-fullscreen")
                .unwrap(),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_selected_to_property_mapping() {
        assert_eq!(
            selected_to_property(SelectedValue::ExplicitNone),
            PropertyValue::None
        );
        assert_eq!(
            selected_to_property(SelectedValue::SystemDefault),
            PropertyValue::Default
        );
        assert_eq!(
            selected_to_property(SelectedValue::Token("gone".to_string())),
            PropertyValue::Vm(VmName::from("gone"))
        );
    }
}
