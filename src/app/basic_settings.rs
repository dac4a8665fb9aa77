//! The Basic Settings page of the global configuration tool.

use std::rc::Rc;

use crate::admin::{AdminClient, PropertyTarget};
use crate::model::entry_table::{EntryTableBuilder, NONE_TOKEN};
use crate::model::holder::{FeatureHolder, FeatureValue, PropertyHolder};
use crate::model::page::{
    commit_all, FeatureSetting, PageHandler, PropertySetting, SaveReport, SettingBinding,
};
use crate::model::selector::{ChoiceSelector, QubeSelector, DEFAULT_TOKEN};
use crate::types::{FeatureFlag, PropertyValue, VmKind, VmName, VmRef};

/// Tray icon rendering modes understood by the GUI daemon.
const TRAY_ICON_MODES: [(&str, &str); 6] = [
    ("full background", "bg"),
    ("thin border", "border1"),
    ("thick border", "border2"),
    ("tinted icon", "tint"),
    ("tinted icon with modified white", "tint+whitehack"),
    ("tinted icon with 50% saturation", "tint+saturation50"),
];

/// System-wide defaults and GUI behavior toggles.
pub struct BasicSettingsPage {
    pub clockvm: PropertySetting,
    pub default_template: PropertySetting,
    pub default_dispvm: PropertySetting,
    pub fullscreen: FeatureSetting<FeatureFlag>,
    pub utf8_titles: FeatureSetting<FeatureFlag>,
    pub tray_icon: FeatureSetting<Option<String>>,
}

impl BasicSettingsPage {
    /// `local_vm` is the qube the GUI defaults live on as features (dom0,
    /// or the GUI domain).
    pub fn new(admin: Rc<dyn AdminClient>, local_vm: VmName) -> Self {
        BasicSettingsPage {
            clockvm: global_qube_setting(&admin, "clockvm", |vm| vm.kind != VmKind::TemplateVm),
            default_template: global_qube_setting(&admin, "default_template", |vm| {
                vm.kind == VmKind::TemplateVm
            }),
            default_dispvm: global_qube_setting(&admin, "default_dispvm", |vm| {
                vm.template_for_dispvms
            }),
            fullscreen: tri_state_setting(&admin, &local_vm, "gui-default-allow-fullscreen"),
            utf8_titles: tri_state_setting(&admin, &local_vm, "gui-default-allow-utf8-titles"),
            tray_icon: tray_icon_setting(&admin, &local_vm),
        }
    }

    fn bindings_mut(&mut self) -> [&mut dyn SettingBinding; 6] {
        [
            &mut self.clockvm,
            &mut self.default_template,
            &mut self.default_dispvm,
            &mut self.fullscreen,
            &mut self.utf8_titles,
            &mut self.tray_icon,
        ]
    }

    pub fn is_changed(&self) -> bool {
        self.clockvm.is_changed()
            || self.default_template.is_changed()
            || self.default_dispvm.is_changed()
            || self.fullscreen.is_changed()
            || self.utf8_titles.is_changed()
            || self.tray_icon.is_changed()
    }
}

impl PageHandler for BasicSettingsPage {
    fn save(&mut self) -> SaveReport {
        commit_all(self.bindings_mut())
    }

    fn reset(&mut self) {
        for binding in self.bindings_mut() {
            binding.reset();
        }
    }
}

/// Selector over qubes for one global property, initialized from the
/// property's current value.
fn global_qube_setting(
    admin: &Rc<dyn AdminClient>,
    property: &str,
    filter: fn(&VmRef) -> bool,
) -> PropertySetting {
    let holder = PropertyHolder::new(
        admin.clone(),
        PropertyTarget::Global,
        property,
        PropertyValue::None,
    );

    let mut builder = EntryTableBuilder::new(admin.as_ref())
        .filter(filter)
        .allow_none();
    let initial = match holder.get_current_value() {
        PropertyValue::None => NONE_TOKEN.to_string(),
        PropertyValue::Default => {
            builder = builder.extra(DEFAULT_TOKEN, "(system default)");
            DEFAULT_TOKEN.to_string()
        }
        PropertyValue::Vm(name) => {
            let token = name.to_string();
            builder = builder.current(&token);
            token
        }
        PropertyValue::Text(text) => {
            builder = builder.current(text);
            text.clone()
        }
    };

    let selector = QubeSelector::new(builder.build(), Some(initial.as_str()));
    PropertySetting::new(property, selector, holder)
}

/// Default/allow/disallow choice over one boolean GUI feature.
fn tri_state_setting(
    admin: &Rc<dyn AdminClient>,
    local_vm: &VmName,
    feature: &str,
) -> FeatureSetting<FeatureFlag> {
    let holder = FeatureHolder::new_boolean(admin.clone(), local_vm.clone(), feature);
    let selector = ChoiceSelector::with_selected(
        vec![
            ("default (disallow)".to_string(), FeatureFlag::Unset),
            ("allow".to_string(), FeatureFlag::Enabled),
            ("disallow".to_string(), FeatureFlag::Disabled),
        ],
        &holder.flag(),
    );
    FeatureSetting::new(feature, selector, holder, |flag| FeatureValue::Flag(*flag))
}

fn tray_icon_setting(
    admin: &Rc<dyn AdminClient>,
    local_vm: &VmName,
) -> FeatureSetting<Option<String>> {
    let holder = FeatureHolder::new(
        admin.clone(),
        local_vm.clone(),
        "gui-default-trayicon-mode",
        None,
    );
    let current = match holder.get_current_value() {
        FeatureValue::Text(text) => text.clone(),
        FeatureValue::Flag(_) => None,
    };

    let mut choices: Vec<(String, Option<String>)> =
        vec![("default (thin border)".to_string(), None)];
    choices.extend(
        TRAY_ICON_MODES
            .iter()
            .map(|(label, token)| (label.to_string(), Some(token.to_string()))),
    );
    // A mode this tool does not know about must still be representable.
    if let Some(token) = &current {
        if !TRAY_ICON_MODES.iter().any(|(_, known)| *known == token.as_str()) {
            choices.push((token.clone(), Some(token.clone())));
        }
    }

    let selector = ChoiceSelector::with_selected(choices, &current);

    FeatureSetting::new("gui-default-trayicon-mode", selector, holder, |mode| {
        FeatureValue::Text(mode.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminClient, MemoryAdmin};
    use crate::model::selector::TraitSelector;

    fn admin_fixture() -> Rc<MemoryAdmin> {
        let admin = Rc::new(MemoryAdmin::new());
        admin.add_qube(VmRef::new("dom0", VmKind::AdminVm).with_label("black"));
        admin.add_qube(
            VmRef::new("sys-net", VmKind::AppVm)
                .with_label("red")
                .with_provides_network(),
        );
        admin.add_qube(
            VmRef::new("fedora-40", VmKind::TemplateVm)
                .with_label("black")
                .with_template_for_dispvms(),
        );
        admin.add_qube(VmRef::new("default-dvm", VmKind::AppVm).with_template_for_dispvms());
        admin.set_global_property("clockvm", PropertyValue::Vm(VmName::from("sys-net")));
        admin.set_global_property(
            "default_template",
            PropertyValue::Vm(VmName::from("fedora-40")),
        );
        admin.set_global_property(
            "default_dispvm",
            PropertyValue::Vm(VmName::from("default-dvm")),
        );
        admin
    }

    #[test]
    fn test_fresh_page_is_unchanged() {
        let admin = admin_fixture();
        let page = BasicSettingsPage::new(admin, VmName::from("dom0"));
        assert!(!page.is_changed());
    }

    #[test]
    fn test_save_commits_only_changed_traits() {
        let admin = admin_fixture();
        let mut page = BasicSettingsPage::new(admin.clone(), VmName::from("dom0"));

        page.fullscreen.selector.select(&FeatureFlag::Enabled).unwrap();
        let report = page.save();
        assert!(report.is_ok());
        assert!(!page.is_changed());

        assert_eq!(
            admin
                .read_feature(&VmName::from("dom0"), "gui-default-allow-fullscreen")
                .unwrap(),
            Some("1".to_string())
        );
        // The untouched clockvm property kept its value.
        assert_eq!(
            admin
                .read_property(&PropertyTarget::Global, "clockvm")
                .unwrap(),
            PropertyValue::Vm(VmName::from("sys-net"))
        );
    }

    #[test]
    fn test_clockvm_selector_excludes_templates() {
        let admin = admin_fixture();
        let mut page = BasicSettingsPage::new(admin, VmName::from("dom0"));
        assert!(page.clockvm.selector.select("fedora-40").is_err());
        page.clockvm.selector.select("dom0").unwrap();
    }

    #[test]
    fn test_stale_dispvm_value_is_still_representable() {
        let admin = admin_fixture();
        admin.set_global_property(
            "default_dispvm",
            PropertyValue::Vm(VmName::from("gone-dvm")),
        );
        let page = BasicSettingsPage::new(admin, VmName::from("dom0"));

        // The selector shows the stale value without a live backing qube
        // and reports no change until the user touches it.
        assert!(!page.default_dispvm.is_changed());
        assert!(page.default_dispvm.selector.entry().unwrap().is_synthetic());
    }

    #[test]
    fn test_unknown_tray_mode_is_added_as_choice() {
        let admin = admin_fixture();
        admin.set_feature(
            &VmName::from("dom0"),
            "gui-default-trayicon-mode",
            "experimental-mode",
        );
        let page = BasicSettingsPage::new(admin, VmName::from("dom0"));

        assert_eq!(
            page.tray_icon.selector.get_selected(),
            Some("experimental-mode".to_string())
        );
        assert!(!page.tray_icon.is_changed());
    }

    #[test]
    fn test_tray_mode_save_writes_token() {
        let admin = admin_fixture();
        let mut page = BasicSettingsPage::new(admin.clone(), VmName::from("dom0"));

        page.tray_icon
            .selector
            .select(&Some("tint".to_string()))
            .unwrap();
        let report = page.save();
        assert!(report.is_ok());
        assert_eq!(
            admin
                .read_feature(&VmName::from("dom0"), "gui-default-trayicon-mode")
                .unwrap(),
            Some("tint".to_string())
        );
    }

    #[test]
    fn test_reset_drops_all_edits() {
        let admin = admin_fixture();
        let mut page = BasicSettingsPage::new(admin, VmName::from("dom0"));

        page.clockvm.selector.select(NONE_TOKEN).unwrap();
        page.utf8_titles.selector.select(&FeatureFlag::Enabled).unwrap();
        assert!(page.is_changed());

        page.reset();
        assert!(!page.is_changed());
    }
}
