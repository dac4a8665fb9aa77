//! Toolkit seam.
//!
//! The widget toolkit is an external collaborator: the model pushes label
//! lists and active-row updates through this trait, and receives discrete
//! selection events via controller methods. Views are injected into the
//! model, never subclassed.

/// Display sink for a single selector widget.
pub trait SelectorView {
    /// Replace the displayed entries. Labels arrive pre-sorted.
    fn set_entries(&mut self, labels: &[String]);

    /// Move the active row; `None` clears the selection display.
    fn set_active(&mut self, label: Option<&str>);

    /// Toggle the changed-from-saved styling.
    fn mark_changed(&mut self, changed: bool);
}

/// View that displays nothing. The default seam for tests and headless
/// use.
#[derive(Debug, Default)]
pub struct NullSelectorView;

impl SelectorView for NullSelectorView {
    fn set_entries(&mut self, _labels: &[String]) {}
    fn set_active(&mut self, _label: Option<&str>) {}
    fn mark_changed(&mut self, _changed: bool) {}
}

/// View that records what it was told to display, for assertions.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub entries: Vec<String>,
    pub active: Option<String>,
    pub changed: bool,
}

impl SelectorView for RecordingView {
    fn set_entries(&mut self, labels: &[String]) {
        self.entries = labels.to_vec();
    }

    fn set_active(&mut self, label: Option<&str>) {
        self.active = label.map(str::to_string);
    }

    fn mark_changed(&mut self, changed: bool) {
        self.changed = changed;
    }
}

/// Shared-handle forwarding, so a caller can keep inspecting a view after
/// handing it to a selector.
impl<V: SelectorView> SelectorView for std::rc::Rc<std::cell::RefCell<V>> {
    fn set_entries(&mut self, labels: &[String]) {
        self.borrow_mut().set_entries(labels);
    }

    fn set_active(&mut self, label: Option<&str>) {
        self.borrow_mut().set_active(label);
    }

    fn mark_changed(&mut self, changed: bool) {
        self.borrow_mut().mark_changed(changed);
    }
}
