// Integration tests - driving the wizard and settings pages end to end
// against the in-memory admin backend.

use std::rc::Rc;

use qubes_config::admin::{AdminClient, MemoryAdmin, PropertyTarget};
use qubes_config::app::applications::{ApplicationData, StaticAppSource};
use qubes_config::app::basic_settings::BasicSettingsPage;
use qubes_config::app::new_qube::{NetworkChoice, NewQubeController, NewQubeKind};
use qubes_config::config::ToolConfig;
use qubes_config::model::entry_table::EntryTableBuilder;
use qubes_config::model::flow::FlowCollection;
use qubes_config::model::page::PageHandler;
use qubes_config::model::selector::{QubeSelector, SelectedValue, TraitSelector};
use qubes_config::model::ModelError;
use qubes_config::types::{FeatureFlag, PropertyValue, VmKind, VmName, VmRef};

fn admin_fixture() -> Rc<MemoryAdmin> {
    let admin = Rc::new(MemoryAdmin::new());
    admin.add_qube(VmRef::new("dom0", VmKind::AdminVm).with_label("black"));
    admin.add_qube(
        VmRef::new("fedora-40", VmKind::TemplateVm)
            .with_label("black")
            .with_template_for_dispvms(),
    );
    admin.add_qube(VmRef::new("debian-12", VmKind::TemplateVm).with_label("black"));
    admin.add_qube(
        VmRef::new("sys-net", VmKind::AppVm)
            .with_label("red")
            .with_provides_network(),
    );
    admin.add_qube(
        VmRef::new("sys-firewall", VmKind::AppVm)
            .with_label("green")
            .with_provides_network(),
    );
    admin.add_qube(
        VmRef::new("sys-whonix", VmKind::AppVm)
            .with_label("black")
            .with_provides_network(),
    );
    admin.add_qube(VmRef::new("work", VmKind::AppVm).with_label("blue"));
    admin.set_global_property("clockvm", PropertyValue::Vm(VmName::from("sys-net")));
    admin.set_global_property(
        "default_template",
        PropertyValue::Vm(VmName::from("fedora-40")),
    );
    admin.set_global_property(
        "default_dispvm",
        PropertyValue::Vm(VmName::from("fedora-40")),
    );
    admin
}

fn app_source_fixture() -> Rc<StaticAppSource> {
    let mut source = StaticAppSource::default();
    let fedora = VmName::from("fedora-40");
    source.insert(
        fedora.clone(),
        vec![
            ApplicationData::from_line("firefox.desktop|Firefox|Browse the web", Some(&fedora))
                .unwrap(),
            ApplicationData::from_line("xterm.desktop|XTerm|", Some(&fedora)).unwrap(),
            ApplicationData::from_line("gimp.desktop|GIMP|Image editor", Some(&fedora)).unwrap(),
        ],
    );
    let debian = VmName::from("debian-12");
    source.insert(
        debian.clone(),
        vec![ApplicationData::from_line(
            "thunderbird.desktop|Thunderbird|Mail client",
            Some(&debian),
        )
        .unwrap()],
    );
    Rc::new(source)
}

/// Change a global property and a GUI feature on the basic settings page,
/// save, and verify the backend and the change-tracking baseline.
#[test]
fn test_basic_settings_save_roundtrip() {
    let admin = admin_fixture();
    let mut page = BasicSettingsPage::new(admin.clone(), VmName::from("dom0"));
    assert!(!page.is_changed());

    page.clockvm.selector.select("sys-firewall").unwrap();
    page.fullscreen
        .selector
        .select(&FeatureFlag::Enabled)
        .unwrap();
    assert!(page.is_changed());

    let report = page.save();
    assert!(report.is_ok(), "failures: {:?}", report.failures());
    assert!(!page.is_changed());

    assert_eq!(
        admin
            .read_property(&PropertyTarget::Global, "clockvm")
            .unwrap(),
        PropertyValue::Vm(VmName::from("sys-firewall"))
    );
    assert_eq!(
        admin
            .read_feature(&VmName::from("dom0"), "gui-default-allow-fullscreen")
            .unwrap(),
        Some("1".to_string())
    );

    // A second save has nothing left to write; an offline backend proves
    // it is not touched.
    admin.set_offline(true);
    assert!(page.save().is_ok());
}

/// A save against a dead daemon reports the failed subset and keeps the
/// unsaved edits pending; a later save completes them.
#[test]
fn test_basic_settings_save_reports_failures_and_recovers() {
    let admin = admin_fixture();
    let mut page = BasicSettingsPage::new(admin.clone(), VmName::from("dom0"));

    page.clockvm.selector.select("sys-firewall").unwrap();
    page.utf8_titles
        .selector
        .select(&FeatureFlag::Disabled)
        .unwrap();

    admin.set_offline(true);
    let report = page.save();
    assert_eq!(report.failures().len(), 2);
    assert!(report
        .failures()
        .iter()
        .all(|f| f.error == ModelError::BackendUnavailable));
    assert!(page.is_changed(), "failed bindings stay pending");

    admin.set_offline(false);
    assert!(page.save().is_ok());
    assert!(!page.is_changed());
    assert_eq!(
        admin
            .read_property(&PropertyTarget::Global, "clockvm")
            .unwrap(),
        PropertyValue::Vm(VmName::from("sys-firewall"))
    );
}

/// Full wizard flow: pick a kind, template, network and applications, then
/// create the qube and verify every follow-up write.
#[test]
fn test_new_qube_wizard_create_flow() {
    let admin = admin_fixture();
    let source = app_source_fixture();
    let mut wizard =
        NewQubeController::new(admin.clone(), source.clone(), ToolConfig::default());

    wizard.set_name("mail");
    wizard.label.select_label("blue").unwrap();
    // The default template is preselected, so Firefox and XTerm arrive
    // from the configured default whitelist.
    assert!(wizard.apps.is_chosen("firefox.desktop"));
    assert!(wizard.apps.is_chosen("xterm.desktop"));

    // A detour through another qube kind re-seeds the application list for
    // that kind's template and back.
    wizard.set_kind(NewQubeKind::Disposable);
    assert_eq!(
        wizard.templates.selected_template().map(|vm| vm.name),
        Some(VmName::from("fedora-40"))
    );
    wizard.set_kind(NewQubeKind::App);
    wizard.apps.toggle("gimp.desktop");

    wizard.network.set_choice(NetworkChoice::Custom).unwrap();
    wizard
        .network
        .custom_selector_mut()
        .select("sys-firewall")
        .unwrap();

    let outcome = wizard.create().unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.vm.name, VmName::from("mail"));
    assert_eq!(outcome.vm.label, "blue");

    let domains = admin.domains().unwrap();
    assert!(domains.iter().any(|vm| vm.name == VmName::from("mail")));
    assert_eq!(
        admin
            .read_property(&PropertyTarget::Vm(VmName::from("mail")), "netvm")
            .unwrap(),
        PropertyValue::Vm(VmName::from("sys-firewall"))
    );
    assert_eq!(
        admin
            .read_property(&PropertyTarget::Vm(VmName::from("mail")), "template")
            .unwrap(),
        PropertyValue::Vm(VmName::from("fedora-40"))
    );
    assert_eq!(
        source.whitelist(&VmName::from("mail")).unwrap(),
        vec!["firefox.desktop", "gimp.desktop", "xterm.desktop"]
    );
}

/// An application found only in another template triggers a confirmed
/// template switch and stays chosen afterwards.
#[test]
fn test_wizard_app_suggestion_switches_template() {
    let admin = admin_fixture();
    let source = app_source_fixture();
    let mut wizard =
        NewQubeController::new(admin.clone(), source.clone(), ToolConfig::default());

    wizard.apps.set_query("thunder");
    let all_apps = source.all_apps();
    let suggested = wizard.apps.suggestions(&all_apps);
    assert_eq!(suggested.len(), 1);
    let app = suggested[0].clone();

    // Declined switch changes nothing.
    assert!(!wizard.accept_app_suggestion(&app, |_| false).unwrap());
    assert_eq!(
        wizard.templates.selected_template().map(|vm| vm.name),
        Some(VmName::from("fedora-40"))
    );

    assert!(wizard.accept_app_suggestion(&app, |_| true).unwrap());
    assert_eq!(
        wizard.templates.selected_template().map(|vm| vm.name),
        Some(VmName::from("debian-12"))
    );
    assert!(wizard.apps.is_chosen("thunderbird.desktop"));
}

/// The exceptions flowbox flow: open the overlay, hit a duplicate, pick
/// another qube, save, reset.
#[test]
fn test_flow_collection_overlay_flow() {
    let admin = admin_fixture();
    let initial = vec![
        VmRef::new("work", VmKind::AppVm),
        VmRef::new("sys-net", VmKind::AppVm),
    ];
    let mut flow = FlowCollection::new(initial);
    assert!(!flow.is_changed());

    let selector = |token: &str| {
        let table = EntryTableBuilder::new(admin.as_ref())
            .filter(|vm| vm.kind == VmKind::AppVm)
            .build();
        QubeSelector::new(table, Some(token))
    };

    assert!(flow.begin_add(selector("work")));
    assert!(!flow.begin_add(selector("sys-firewall")), "one overlay at a time");

    let err = flow.confirm_add().unwrap_err();
    assert_eq!(err, ModelError::DuplicateMember(VmName::from("work")));
    assert!(flow.is_adding());

    flow.adding_selector_mut()
        .unwrap()
        .select("sys-firewall")
        .unwrap();
    flow.confirm_add().unwrap();
    assert!(!flow.is_adding());
    assert!(flow.is_changed());

    flow.commit_initial();
    assert!(!flow.is_changed());

    assert!(flow.remove(&VmName::from("work"), |_| true));
    assert!(flow.is_changed());
    flow.reset();
    assert!(!flow.is_changed());
    assert_eq!(flow.members().len(), 3);
}

/// With the daemon down the page still constructs: selectors carry the
/// stale current values as synthetic entries and nothing panics.
#[test]
fn test_degraded_mode_page_construction() {
    let admin = admin_fixture();
    admin.set_offline(true);

    let page = BasicSettingsPage::new(admin.clone(), VmName::from("dom0"));
    assert!(!page.is_changed());
    // Property reads failed, so the selectors fell back to the none
    // sentinel.
    assert_eq!(
        page.clockvm.selector.get_selected(),
        Some(SelectedValue::ExplicitNone)
    );

    admin.set_offline(false);
    let page = BasicSettingsPage::new(admin, VmName::from("dom0"));
    assert!(matches!(
        page.clockvm.selector.get_selected(),
        Some(SelectedValue::Qube(_))
    ));
}

/// A live set of two qubes plus a current value naming a qube that no
/// longer exists: the stale name stays visible but never resolves to a
/// live reference.
#[test]
fn test_stale_current_value_round_trip() {
    let admin = Rc::new(MemoryAdmin::new());
    admin.add_qube(VmRef::new("work", VmKind::AppVm));
    admin.add_qube(VmRef::new("personal", VmKind::AppVm));

    let table = EntryTableBuilder::new(admin.as_ref())
        .current("archived")
        .build();
    assert_eq!(table.len(), 3);

    let selector = QubeSelector::new(table, Some("archived"));
    assert_eq!(
        selector.get_selected(),
        Some(SelectedValue::Token("archived".to_string()))
    );
    assert!(!selector.is_changed());
}
