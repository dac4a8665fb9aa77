//! Application selection for the new-qube wizard.
//!
//! Enumerating the `.desktop` shortcuts a template provides happens
//! outside this crate; an [`AppSource`] supplies the parsed records and
//! applies the chosen menu whitelist to the created qube.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::admin::AdminError;
use crate::types::VmName;

/// One application shortcut provided by a template.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationData {
    pub name: String,
    /// `.desktop` file name; the identity the whitelist uses.
    pub ident: String,
    pub comment: String,
    /// Template the shortcut came from.
    pub template: Option<VmName>,
}

impl ApplicationData {
    pub fn new(
        name: &str,
        ident: &str,
        comment: Option<&str>,
        template: Option<&VmName>,
    ) -> Self {
        let file_note = format!(".desktop filename: {ident}");
        let comment = match comment {
            Some(comment) if !comment.is_empty() => format!("{comment}\n{file_note}"),
            _ => file_note,
        };
        ApplicationData {
            name: name.to_string(),
            ident: ident.to_string(),
            comment,
            template: template.cloned(),
        }
    }

    /// Parse one `ident|name|comment` line of the enumeration format.
    /// Malformed lines are dropped with a warning.
    pub fn from_line(line: &str, template: Option<&VmName>) -> Option<Self> {
        let mut fields = line.splitn(3, '|');
        let ident = fields.next()?;
        let Some(name) = fields.next() else {
            warn!(line, "malformed application entry");
            return None;
        };
        let comment = fields.next();
        Some(Self::new(name, ident, comment, template))
    }
}

/// Supplies application shortcut data and applies menu whitelists.
pub trait AppSource {
    /// Shortcuts provided by one template.
    fn app_list(&self, template: &VmName) -> Result<Vec<ApplicationData>, AdminError>;

    /// Set the menu whitelist of a qube.
    fn set_whitelist(&self, vm: &VmName, idents: &[String]) -> Result<(), AdminError>;
}

/// [`AppSource`] over a fixed catalog; used in tests and offline tooling.
#[derive(Default)]
pub struct StaticAppSource {
    catalog: BTreeMap<VmName, Vec<ApplicationData>>,
    whitelists: RefCell<BTreeMap<VmName, Vec<String>>>,
}

impl StaticAppSource {
    pub fn insert(&mut self, template: VmName, apps: Vec<ApplicationData>) {
        self.catalog.insert(template, apps);
    }

    /// The last whitelist applied to a qube.
    pub fn whitelist(&self, vm: &VmName) -> Option<Vec<String>> {
        self.whitelists.borrow().get(vm).cloned()
    }

    /// Every shortcut in the catalog, across all templates.
    pub fn all_apps(&self) -> Vec<ApplicationData> {
        self.catalog.values().flatten().cloned().collect()
    }
}

impl AppSource for StaticAppSource {
    fn app_list(&self, template: &VmName) -> Result<Vec<ApplicationData>, AdminError> {
        Ok(self.catalog.get(template).cloned().unwrap_or_default())
    }

    fn set_whitelist(&self, vm: &VmName, idents: &[String]) -> Result<(), AdminError> {
        self.whitelists
            .borrow_mut()
            .insert(vm.clone(), idents.to_vec());
        Ok(())
    }
}

/// The set of applications chosen for the qube being created.
pub struct AppSelection {
    available: Vec<ApplicationData>,
    chosen: BTreeSet<String>,
    query: String,
}

impl AppSelection {
    /// Selection with no template chosen yet.
    pub fn empty() -> Self {
        AppSelection {
            available: Vec::new(),
            chosen: BTreeSet::new(),
            query: String::new(),
        }
    }

    /// Load the catalog for a template, seeding the chosen set from the
    /// configured default whitelist. An unavailable catalog degrades to an
    /// empty list.
    pub fn for_template(source: &dyn AppSource, template: &VmName, defaults: &[String]) -> Self {
        let available = match source.app_list(template) {
            Ok(apps) => apps,
            Err(err) => {
                warn!(%template, %err, "application list unavailable");
                Vec::new()
            }
        };
        let chosen = defaults
            .iter()
            .filter(|ident| available.iter().any(|app| &app.ident == *ident))
            .cloned()
            .collect();
        AppSelection {
            available,
            chosen,
            query: String::new(),
        }
    }

    pub fn is_chosen(&self, ident: &str) -> bool {
        self.chosen.contains(ident)
    }

    /// Toggle one application. Unknown idents are ignored. Returns whether
    /// the application is chosen afterwards.
    pub fn toggle(&mut self, ident: &str) -> bool {
        if !self.available.iter().any(|app| app.ident == ident) {
            warn!(ident, "toggle of an application the template does not provide");
            return false;
        }
        if self.chosen.remove(ident) {
            false
        } else {
            self.chosen.insert(ident.to_string());
            true
        }
    }

    /// Chosen `.desktop` idents, in stable order.
    pub fn chosen_idents(&self) -> Vec<String> {
        self.chosen.iter().cloned().collect()
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    /// Rows to display: filtered by the search query, chosen rows first,
    /// then by name.
    pub fn visible(&self) -> Vec<&ApplicationData> {
        let mut rows: Vec<&ApplicationData> = self
            .available
            .iter()
            .filter(|app| matches_query(&app.name, &self.query))
            .collect();
        rows.sort_by(|a, b| {
            self.is_chosen(&b.ident)
                .cmp(&self.is_chosen(&a.ident))
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }

    /// Apps from other templates matching the query; offered only when the
    /// current template has no match. Accepting one is a template switch,
    /// decided by the caller.
    pub fn suggestions<'a>(&self, others: &'a [ApplicationData]) -> Vec<&'a ApplicationData> {
        if !self.visible().is_empty() {
            return Vec::new();
        }
        others
            .iter()
            .filter(|app| matches_query(&app.name, &self.query))
            .collect()
    }
}

fn matches_query(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}
