//! Entry tables: the label-to-backing-record mapping behind every qube
//! selector.
//!
//! A table is built once per selector from a single enumeration snapshot
//! and never refreshed behind the caller's back; qubes created or removed
//! by other processes are picked up the next time a selector is built.

use std::collections::BTreeMap;

use tracing::warn;

use crate::admin::AdminClient;
use crate::types::{VmName, VmRef};

/// Reserved display label of the none sentinel. "(" sorts before
/// alphanumerics, so the sentinel leads the list.
pub const NONE_LABEL: &str = "(none)";

/// Canonical token of the none sentinel.
pub const NONE_TOKEN: &str = "None";

const DEFAULT_SUFFIX: &str = " (default)";

/// One selectable row.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Unique within a table; also the sort key.
    pub display_label: String,
    /// Token the entry stands for: a qube name for live and name-only
    /// entries, or an arbitrary token for extras ("None", ...).
    pub canonical_id: String,
    /// Icon name, where the backing qube provides one.
    pub icon: Option<String>,
    /// Live backing qube. `None` marks a synthetic entry.
    pub vm: Option<VmRef>,
}

impl Entry {
    fn synthetic(canonical_id: &str, display_label: &str) -> Self {
        Entry {
            display_label: display_label.to_string(),
            canonical_id: canonical_id.to_string(),
            icon: None,
            vm: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.vm.is_none()
    }
}

/// Sorted display-label to entry mapping.
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    entries: BTreeMap<String, Entry>,
}

impl EntryTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&Entry> {
        self.entries.get(label)
    }

    /// Display labels in presentation order.
    pub fn labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn first_label(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }

    /// Resolve a canonical id or display label to an entry label. Live
    /// entries win over synthetic ones, keeping qube-name lookups
    /// unambiguous.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        let mut synthetic = None;
        for entry in self.entries.values() {
            if entry.canonical_id == token {
                if entry.is_synthetic() {
                    synthetic.get_or_insert(entry.display_label.as_str());
                } else {
                    return Some(&entry.display_label);
                }
            }
        }
        synthetic.or_else(|| self.entries.get(token).map(|e| e.display_label.as_str()))
    }

    /// Is this qube present as a live entry?
    pub fn contains_vm(&self, name: &VmName) -> bool {
        self.entries
            .values()
            .any(|entry| entry.vm.as_ref().is_some_and(|vm| &vm.name == name))
    }

    fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.display_label.clone(), entry);
    }
}

/// Builds an [`EntryTable`] from the live enumeration plus synthetic rows.
///
/// If the enumeration source is unavailable, the table is built empty
/// except for synthetic and current-value rows; the selector keeps
/// functioning in a degraded mode.
pub struct EntryTableBuilder<'a> {
    admin: &'a dyn AdminClient,
    filter: Option<Box<dyn Fn(&VmRef) -> bool + 'a>>,
    default_value: Option<VmName>,
    extras: Vec<(String, String)>,
    current: Option<String>,
    allow_none: bool,
}

impl<'a> EntryTableBuilder<'a> {
    pub fn new(admin: &'a dyn AdminClient) -> Self {
        EntryTableBuilder {
            admin,
            filter: None,
            default_value: None,
            extras: Vec::new(),
            current: None,
            allow_none: false,
        }
    }

    /// Keep only qubes the predicate accepts.
    pub fn filter(mut self, filter: impl Fn(&VmRef) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Decorate this qube's label with the default marker.
    pub fn default_value(mut self, name: VmName) -> Self {
        self.default_value = Some(name);
        self
    }

    /// Include the reserved none sentinel row.
    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Add a synthetic row for an arbitrary token.
    pub fn extra(mut self, token: &str, label: &str) -> Self {
        self.extras.push((token.to_string(), label.to_string()));
        self
    }

    /// Token that must be representable even if it matches no live qube; a
    /// synthetic row is added for it when nothing else resolves it.
    pub fn current(mut self, token: &str) -> Self {
        self.current = Some(token.to_string());
        self
    }

    pub fn build(self) -> EntryTable {
        let mut table = EntryTable::default();

        if self.allow_none {
            table.insert(Entry::synthetic(NONE_TOKEN, NONE_LABEL));
        }
        for (token, label) in &self.extras {
            table.insert(Entry::synthetic(token, label));
        }

        match self.admin.domains() {
            Ok(domains) => {
                for vm in domains {
                    if let Some(filter) = &self.filter {
                        if !filter(&vm) {
                            continue;
                        }
                    }
                    let mut display_label = vm.name.to_string();
                    if self.default_value.as_ref() == Some(&vm.name) {
                        display_label.push_str(DEFAULT_SUFFIX);
                    }
                    table.insert(Entry {
                        display_label,
                        canonical_id: vm.name.to_string(),
                        icon: Some(vm.icon.clone()),
                        vm: Some(vm),
                    });
                }
            }
            Err(err) => {
                warn!(%err, "qube enumeration unavailable, building degraded entry table");
            }
        }

        if let Some(current) = &self.current {
            if table.resolve(current).is_none() {
                table.insert(Entry::synthetic(current, current));
            }
        }

        table
    }
}
