//! Multi-valued qube collections (exception lists) with the same
//! change-tracking protocol as single-value selectors, plus the
//! add-overlay state machine.
//!
//! Membership is fully user-driven: after the initial load the collection
//! never syncs itself with external state.

use tracing::debug;

use crate::model::selector::{QubeSelector, SelectedValue, TraitSelector};
use crate::model::ModelError;
use crate::types::{VmName, VmRef};

/// Ordered, de-duplicated set of qubes with a saved baseline.
pub struct FlowCollection {
    members: Vec<VmRef>,
    initial: Vec<VmRef>,
    /// Candidate selector of the open add overlay, if any.
    adding: Option<QubeSelector>,
}

impl FlowCollection {
    pub fn new(mut initial: Vec<VmRef>) -> Self {
        initial.sort_by(|a, b| a.name.cmp(&b.name));
        initial.dedup_by(|a, b| a.name == b.name);
        FlowCollection {
            members: initial.clone(),
            initial,
            adding: None,
        }
    }

    pub fn members(&self) -> &[VmRef] {
        &self.members
    }

    /// Add a member. A candidate that is already present is rejected with
    /// a user-facing error and no state change.
    pub fn add(&mut self, candidate: VmRef) -> Result<(), ModelError> {
        if self.members.iter().any(|vm| vm.name == candidate.name) {
            return Err(ModelError::DuplicateMember(candidate.name));
        }
        self.members.push(candidate);
        Ok(())
    }

    /// Remove a member after asking the caller-supplied confirmation; a
    /// declined confirmation is a full no-op. Returns whether the member
    /// was removed.
    pub fn remove(&mut self, name: &VmName, confirm: impl FnOnce(&VmRef) -> bool) -> bool {
        let Some(index) = self.members.iter().position(|vm| &vm.name == name) else {
            return false;
        };
        if !confirm(&self.members[index]) {
            return false;
        }
        self.members.remove(index);
        true
    }

    /// Order-insensitive comparison against the saved baseline.
    pub fn is_changed(&self) -> bool {
        sorted_names(&self.members) != sorted_names(&self.initial)
    }

    /// Drop unsaved membership edits.
    pub fn reset(&mut self) {
        self.members = self.initial.clone();
    }

    /// Mark current membership as the new saved baseline. Called once per
    /// successful save, never on cancel.
    pub fn commit_initial(&mut self) {
        self.initial = self.members.clone();
    }

    /// Open the add overlay with the supplied candidate selector. Refused
    /// while a previous overlay is still open: it must be dismissed, by
    /// confirm or cancel, first.
    pub fn begin_add(&mut self, selector: QubeSelector) -> bool {
        if self.adding.is_some() {
            debug!("add overlay already open");
            return false;
        }
        self.adding = Some(selector);
        true
    }

    pub fn is_adding(&self) -> bool {
        self.adding.is_some()
    }

    /// The open overlay's candidate selector, for the UI to drive.
    pub fn adding_selector_mut(&mut self) -> Option<&mut QubeSelector> {
        self.adding.as_mut()
    }

    /// Dismiss the overlay and discard its candidate selection.
    pub fn cancel_add(&mut self) {
        self.adding = None;
    }

    /// Try to add the overlay's current candidate. On success the overlay
    /// closes; on a duplicate or an unresolvable candidate it stays open
    /// with the error surfaced.
    pub fn confirm_add(&mut self) -> Result<VmRef, ModelError> {
        let Some(selector) = &self.adding else {
            return Err(ModelError::Rejected("no add in progress".to_string()));
        };
        let candidate = match selector.get_selected() {
            Some(SelectedValue::Qube(vm)) => vm,
            Some(SelectedValue::Token(token)) => {
                return Err(ModelError::SelectionNotFound(token));
            }
            _ => {
                return Err(ModelError::SelectionNotFound(
                    "no qube selected".to_string(),
                ));
            }
        };
        self.add(candidate.clone())?;
        self.adding = None;
        Ok(candidate)
    }
}

fn sorted_names(members: &[VmRef]) -> Vec<&VmName> {
    let mut names: Vec<&VmName> = members.iter().map(|vm| &vm.name).collect();
    names.sort();
    names
}
