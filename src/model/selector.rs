//! Change-tracked selectors over entry tables and enumerated choices.
//!
//! Every selector owns a current and an initial value. The initial value
//! advances only through `update_initial`, called once per successful
//! save; cancel paths call `reset` instead.

use tracing::debug;

use crate::model::entry_table::{Entry, EntryTable, NONE_TOKEN};
use crate::model::ModelError;
use crate::types::{VmName, VmRef};
use crate::view::{NullSelectorView, SelectorView};

/// Canonical token used by selectors offering a "use the system default"
/// row.
pub const DEFAULT_TOKEN: &str = "default";

/// Value a qube selector resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedValue {
    /// The reserved "(none)" sentinel row.
    ExplicitNone,
    /// The row standing for "inherit the system default".
    SystemDefault,
    /// A live qube from the enumeration snapshot.
    Qube(VmRef),
    /// A token with no live backing qube: a synthetic row or free text.
    Token(String),
}

/// The shared change-tracking protocol of every selectable trait.
pub trait TraitSelector {
    type Value;

    /// Current value of the trait.
    fn get_selected(&self) -> Self::Value;

    /// Has the value changed from the last saved one?
    fn is_changed(&self) -> bool;

    /// Restore the last saved value.
    fn reset(&mut self);

    /// Mark the current value as the new saved baseline. Called once per
    /// successful save, never on cancel.
    fn update_initial(&mut self);
}

type ChangeObserver = Box<dyn FnMut()>;

/// Single-valued qube choice over an [`EntryTable`], with the free-text
/// escape path of a combo-with-entry widget: typed text that matches an
/// entry activates it, anything else leaves the selector with no active
/// entry until resolved.
pub struct QubeSelector {
    table: EntryTable,
    /// Active entry label; `None` while free text matches nothing.
    current: Option<String>,
    initial: Option<String>,
    /// Unresolved text typed into the entry box.
    typed: Option<String>,
    observer: Option<ChangeObserver>,
    view: Box<dyn SelectorView>,
}

impl QubeSelector {
    pub fn new(table: EntryTable, initial_token: Option<&str>) -> Self {
        Self::with_view(table, initial_token, Box::new(NullSelectorView))
    }

    /// Build with an injected view. The initial token is resolved against
    /// the table; an unresolvable or absent token selects the first entry.
    pub fn with_view(
        table: EntryTable,
        initial_token: Option<&str>,
        mut view: Box<dyn SelectorView>,
    ) -> Self {
        let current = initial_token
            .and_then(|token| table.resolve(token))
            .or_else(|| table.first_label())
            .map(str::to_string);
        view.set_entries(&table.labels());
        view.set_active(current.as_deref());
        view.mark_changed(false);
        QubeSelector {
            table,
            initial: current.clone(),
            current,
            typed: None,
            observer: None,
            view,
        }
    }

    /// Select by canonical id or display label. On failure the previous
    /// selection is retained.
    pub fn select(&mut self, token: &str) -> Result<(), ModelError> {
        let label = self
            .table
            .resolve(token)
            .map(str::to_string)
            .ok_or_else(|| ModelError::SelectionNotFound(token.to_string()))?;
        self.current = Some(label);
        self.typed = None;
        self.after_change();
        Ok(())
    }

    /// Text typed into the entry box.
    pub fn set_entry_text(&mut self, text: &str) {
        match self.table.resolve(text) {
            Some(label) => {
                self.current = Some(label.to_string());
                self.typed = None;
            }
            None => {
                self.current = None;
                self.typed = Some(text.to_string());
            }
        }
        self.after_change();
    }

    /// Replace the change observer. One observer at a time; it runs after
    /// every selection change and must not call back into the selector.
    pub fn set_observer(&mut self, observer: impl FnMut() + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Text the entry box currently shows: the active label, or the
    /// unresolved typed text.
    pub fn entry_text(&self) -> Option<&str> {
        self.current.as_deref().or(self.typed.as_deref())
    }

    /// The active entry, if any.
    pub fn entry(&self) -> Option<&Entry> {
        self.current.as_deref().and_then(|label| self.table.get(label))
    }

    /// The live qube currently selected, if the active entry is backed by
    /// one.
    pub fn selected_qube(&self) -> Option<VmRef> {
        self.entry().and_then(|entry| entry.vm.clone())
    }

    /// Is this qube offered by the selector's snapshot?
    pub fn is_vm_available(&self, name: &VmName) -> bool {
        self.table.contains_vm(name)
    }

    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    fn after_change(&mut self) {
        let changed = self.is_changed();
        self.view.set_active(self.current.as_deref());
        self.view.mark_changed(changed);
        debug!(current = ?self.current, changed, "selection changed");
        if let Some(observer) = self.observer.as_mut() {
            observer();
        }
    }

    fn entry_value(entry: &Entry) -> SelectedValue {
        if entry.canonical_id == NONE_TOKEN {
            return SelectedValue::ExplicitNone;
        }
        if entry.canonical_id == DEFAULT_TOKEN {
            return SelectedValue::SystemDefault;
        }
        match &entry.vm {
            Some(vm) => SelectedValue::Qube(vm.clone()),
            None => SelectedValue::Token(entry.canonical_id.clone()),
        }
    }
}

impl TraitSelector for QubeSelector {
    type Value = Option<SelectedValue>;

    fn get_selected(&self) -> Option<SelectedValue> {
        self.entry().map(Self::entry_value)
    }

    fn is_changed(&self) -> bool {
        self.current != self.initial
    }

    fn reset(&mut self) {
        self.current = self.initial.clone();
        self.typed = None;
        self.after_change();
    }

    fn update_initial(&mut self) {
        self.initial = self.current.clone();
        self.view.mark_changed(false);
    }
}

/// Choice over an arbitrary enumerated label-to-value mapping, for traits
/// that are not qube references (tri-state flags, tray icon modes, label
/// colors).
pub struct ChoiceSelector<T> {
    choices: Vec<(String, T)>,
    current: usize,
    initial: usize,
}

impl<T: Clone + PartialEq + std::fmt::Debug> ChoiceSelector<T> {
    /// The first choice starts selected. `choices` must be non-empty and
    /// carry unique labels.
    pub fn new(choices: Vec<(String, T)>) -> Self {
        debug_assert!(!choices.is_empty());
        ChoiceSelector {
            choices,
            current: 0,
            initial: 0,
        }
    }

    /// Start with the choice matching `selected`; falls back to the first
    /// choice when nothing matches.
    pub fn with_selected(choices: Vec<(String, T)>, selected: &T) -> Self {
        let mut selector = Self::new(choices);
        let index = selector
            .choices
            .iter()
            .position(|(_, value)| value == selected)
            .unwrap_or(0);
        selector.current = index;
        selector.initial = index;
        selector
    }

    /// Append a choice; used to make an out-of-catalog current value
    /// representable.
    pub fn push_choice(&mut self, label: impl Into<String>, value: T) {
        self.choices.push((label.into(), value));
    }

    pub fn select(&mut self, value: &T) -> Result<(), ModelError> {
        match self.choices.iter().position(|(_, v)| v == value) {
            Some(index) => {
                self.current = index;
                Ok(())
            }
            None => Err(ModelError::SelectionNotFound(format!("{value:?}"))),
        }
    }

    pub fn select_label(&mut self, label: &str) -> Result<(), ModelError> {
        match self.choices.iter().position(|(l, _)| l == label) {
            Some(index) => {
                self.current = index;
                Ok(())
            }
            None => Err(ModelError::SelectionNotFound(label.to_string())),
        }
    }

    pub fn selected_label(&self) -> &str {
        &self.choices[self.current].0
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.choices.iter().map(|(label, _)| label.as_str())
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> TraitSelector for ChoiceSelector<T> {
    type Value = T;

    fn get_selected(&self) -> T {
        self.choices[self.current].1.clone()
    }

    fn is_changed(&self) -> bool {
        self.current != self.initial
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }

    fn update_initial(&mut self) {
        self.initial = self.current;
    }
}
