//! Controller for the new-qube creation wizard.

use std::rc::Rc;

use tracing::{info, warn};

use crate::admin::{find_domain, AdminClient, NewQubeRequest, PropertyTarget};
use crate::app::applications::{AppSelection, AppSource, ApplicationData};
use crate::config::ToolConfig;
use crate::model::entry_table::EntryTableBuilder;
use crate::model::selector::{ChoiceSelector, QubeSelector, SelectedValue, TraitSelector};
use crate::model::ModelError;
use crate::types::{PropertyValue, VmKind, VmName, VmRef};

/// Kinds of qube the wizard can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewQubeKind {
    App,
    Template,
    Standalone,
    Disposable,
}

impl NewQubeKind {
    pub const ALL: [NewQubeKind; 4] = [
        NewQubeKind::App,
        NewQubeKind::Template,
        NewQubeKind::Standalone,
        NewQubeKind::Disposable,
    ];

    fn vm_kind(self) -> VmKind {
        match self {
            NewQubeKind::App => VmKind::AppVm,
            NewQubeKind::Template => VmKind::TemplateVm,
            NewQubeKind::Standalone => VmKind::StandaloneVm,
            NewQubeKind::Disposable => VmKind::DispVm,
        }
    }

    /// Templates and standalones may be built from scratch, without a base
    /// image.
    fn allows_no_template(self) -> bool {
        matches!(self, NewQubeKind::Template | NewQubeKind::Standalone)
    }

    fn template_filter(self) -> fn(&VmRef) -> bool {
        match self {
            NewQubeKind::App | NewQubeKind::Template => |vm| vm.kind == VmKind::TemplateVm,
            NewQubeKind::Standalone => {
                |vm| matches!(vm.kind, VmKind::TemplateVm | VmKind::StandaloneVm)
            }
            NewQubeKind::Disposable => |vm| vm.template_for_dispvms,
        }
    }
}

/// One template selector per creatable kind. Switching kinds swaps the
/// visible selector and notifies the template-changed observer, which the
/// application list listens to.
pub struct TemplateChooser {
    selectors: Vec<(NewQubeKind, QubeSelector)>,
    kind: NewQubeKind,
    observer: Option<Box<dyn FnMut()>>,
}

impl TemplateChooser {
    pub fn new(admin: &dyn AdminClient) -> Self {
        let default_template = admin
            .read_property(&PropertyTarget::Global, "default_template")
            .ok()
            .and_then(|value| value.vm_name().cloned());

        let selectors = NewQubeKind::ALL
            .iter()
            .map(|&kind| {
                let mut builder = EntryTableBuilder::new(admin).filter(kind.template_filter());
                if let Some(name) = &default_template {
                    builder = builder.default_value(name.clone());
                }
                if kind.allows_no_template() {
                    builder = builder.allow_none();
                }
                let initial = default_template.as_ref().map(VmName::as_str);
                (kind, QubeSelector::new(builder.build(), initial))
            })
            .collect();

        TemplateChooser {
            selectors,
            kind: NewQubeKind::App,
            observer: None,
        }
    }

    pub fn kind(&self) -> NewQubeKind {
        self.kind
    }

    /// Switch the wizard to another qube kind.
    pub fn set_kind(&mut self, kind: NewQubeKind) {
        self.kind = kind;
        self.notify();
    }

    /// The template the visible selector points at; `None` for the none
    /// sentinel and for entries without a live backing qube.
    pub fn selected_template(&self) -> Option<VmRef> {
        match self.current_selector().get_selected() {
            Some(SelectedValue::Qube(vm)) => Some(vm),
            _ => None,
        }
    }

    /// Select a template by name on the visible selector.
    pub fn select_template(&mut self, name: &str) -> Result<(), ModelError> {
        self.current_selector_mut().select(name)?;
        self.notify();
        Ok(())
    }

    /// Replace the template-changed observer.
    pub fn set_observer(&mut self, observer: impl FnMut() + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn selector_mut(&mut self) -> &mut QubeSelector {
        self.current_selector_mut()
    }

    fn current_selector(&self) -> &QubeSelector {
        &self
            .selectors
            .iter()
            .find(|(kind, _)| *kind == self.kind)
            .expect("every kind has a selector")
            .1
    }

    fn current_selector_mut(&mut self) -> &mut QubeSelector {
        let kind = self.kind;
        &mut self
            .selectors
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .expect("every kind has a selector")
            .1
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer();
        }
    }
}

/// The wizard's four-way network choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkChoice {
    /// Inherit the system default netvm.
    Default,
    /// No networking.
    None,
    /// Route through the configured Tor gateway.
    Tor,
    /// A specific network-providing qube.
    Custom,
}

/// Resolves the wizard's network choice to the property value written to
/// the created qube.
pub struct NetworkChooser {
    choice: NetworkChoice,
    custom: QubeSelector,
    tor_gateway: Option<VmRef>,
}

impl NetworkChooser {
    pub fn new(admin: &dyn AdminClient, config: &ToolConfig) -> Self {
        let table = EntryTableBuilder::new(admin)
            .filter(|vm| vm.provides_network)
            .build();
        let tor_gateway = find_domain(admin, &VmName::from(config.tor_gateway_qube.as_str()));
        NetworkChooser {
            choice: NetworkChoice::Default,
            custom: QubeSelector::new(table, None),
            tor_gateway,
        }
    }

    pub fn choice(&self) -> NetworkChoice {
        self.choice
    }

    /// Tor routing is offered only when the configured gateway qube
    /// exists.
    pub fn tor_available(&self) -> bool {
        self.tor_gateway.is_some()
    }

    pub fn set_choice(&mut self, choice: NetworkChoice) -> Result<(), ModelError> {
        if choice == NetworkChoice::Tor && !self.tor_available() {
            return Err(ModelError::SelectionNotFound(
                "no Tor gateway qube".to_string(),
            ));
        }
        self.choice = choice;
        Ok(())
    }

    /// Candidate selector for the custom choice, for the UI to drive.
    pub fn custom_selector_mut(&mut self) -> &mut QubeSelector {
        &mut self.custom
    }

    /// The netvm value the chosen option stands for.
    pub fn selected_netvm(&self) -> PropertyValue {
        match self.choice {
            NetworkChoice::Default => PropertyValue::Default,
            NetworkChoice::None => PropertyValue::None,
            NetworkChoice::Tor => match &self.tor_gateway {
                Some(vm) => PropertyValue::Vm(vm.name.clone()),
                None => PropertyValue::Default,
            },
            NetworkChoice::Custom => match self.custom.get_selected() {
                Some(SelectedValue::Qube(vm)) => PropertyValue::Vm(vm.name),
                _ => PropertyValue::Default,
            },
        }
    }
}

/// Result of a successful create: the new qube plus any non-fatal
/// follow-up failures (network assignment, menu whitelist).
#[derive(Debug)]
pub struct CreateOutcome {
    pub vm: VmRef,
    pub warnings: Vec<ModelError>,
}

/// State of the whole wizard.
pub struct NewQubeController {
    admin: Rc<dyn AdminClient>,
    apps_source: Rc<dyn AppSource>,
    config: ToolConfig,
    name: String,
    pub label: ChoiceSelector<String>,
    pub templates: TemplateChooser,
    pub network: NetworkChooser,
    pub apps: AppSelection,
}

impl NewQubeController {
    pub fn new(
        admin: Rc<dyn AdminClient>,
        apps_source: Rc<dyn AppSource>,
        config: ToolConfig,
    ) -> Self {
        let labels = admin.labels().unwrap_or_else(|err| {
            warn!(%err, "label list unavailable, offering red only");
            vec!["red".to_string()]
        });
        let label = ChoiceSelector::new(
            labels
                .into_iter()
                .map(|label| (label.clone(), label))
                .collect(),
        );
        let templates = TemplateChooser::new(admin.as_ref());
        let network = NetworkChooser::new(admin.as_ref(), &config);

        let mut controller = NewQubeController {
            admin,
            apps_source,
            config,
            name: String::new(),
            label,
            templates,
            network,
            apps: AppSelection::empty(),
        };
        controller.refresh_apps();
        controller
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Switch the qube kind and re-seed the application list for the
    /// kind's template.
    pub fn set_kind(&mut self, kind: NewQubeKind) {
        self.templates.set_kind(kind);
        self.refresh_apps();
    }

    /// Re-seed the application list after a template change.
    pub fn refresh_apps(&mut self) {
        self.apps = match self.templates.selected_template() {
            Some(template) => AppSelection::for_template(
                self.apps_source.as_ref(),
                &template.name,
                &self.config.default_applications,
            ),
            None => AppSelection::empty(),
        };
    }

    /// Accept an application found in another template: asks the caller to
    /// confirm the switch, then re-targets the template chooser and keeps
    /// the application chosen. Returns whether the switch happened.
    pub fn accept_app_suggestion(
        &mut self,
        app: &ApplicationData,
        confirm: impl FnOnce(&VmName) -> bool,
    ) -> Result<bool, ModelError> {
        let Some(template) = app.template.clone() else {
            return Ok(false);
        };
        if !confirm(&template) {
            return Ok(false);
        }
        self.templates.select_template(template.as_str())?;
        self.refresh_apps();
        if !self.apps.is_chosen(&app.ident) {
            self.apps.toggle(&app.ident);
        }
        Ok(true)
    }

    /// Name must be non-empty and not taken by a live qube.
    pub fn validate_name(&self) -> Result<(), ModelError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ModelError::Rejected("qube name cannot be empty".to_string()));
        }
        if find_domain(self.admin.as_ref(), &VmName::from(name)).is_some() {
            return Err(ModelError::Rejected(format!(
                "a qube named {name} already exists"
            )));
        }
        Ok(())
    }

    /// Create the qube, then apply the network choice and the menu
    /// whitelist. Follow-up failures do not undo the creation; they are
    /// reported in the outcome.
    pub fn create(&mut self) -> Result<CreateOutcome, ModelError> {
        self.validate_name()?;

        let kind = self.templates.kind();
        let template = self.templates.selected_template().map(|vm| vm.name);
        if template.is_none() && !kind.allows_no_template() {
            return Err(ModelError::Rejected(
                "this qube kind requires a template".to_string(),
            ));
        }

        let request = NewQubeRequest {
            name: VmName::from(self.name.trim()),
            label: self.label.get_selected(),
            kind: kind.vm_kind(),
            template,
        };
        let vm = self.admin.create_vm(&request)?;
        info!(name = %vm.name, kind = ?request.kind, "qube created");

        let mut warnings = Vec::new();

        let netvm = self.network.selected_netvm();
        if netvm != PropertyValue::Default {
            if let Err(err) = self.admin.write_property(
                &PropertyTarget::Vm(vm.name.clone()),
                "netvm",
                &netvm,
            ) {
                warn!(name = %vm.name, %err, "netvm assignment failed");
                warnings.push(ModelError::from(err));
            }
        }

        let idents = self.apps.chosen_idents();
        if !idents.is_empty() {
            if let Err(err) = self.apps_source.set_whitelist(&vm.name, &idents) {
                warn!(name = %vm.name, %err, "menu whitelist update failed");
                warnings.push(ModelError::from(err));
            }
        }

        Ok(CreateOutcome { vm, warnings })
    }
}
