//! The selectable-trait model: entry tables, change-tracked selectors,
//! trait holders that write through to the admin API, page aggregation,
//! and the multi-valued flow collection.

pub mod entry_table;
pub mod flow;
pub mod holder;
pub mod page;
pub mod selector;

use thiserror::Error;

use crate::admin::AdminError;
use crate::types::VmName;

/// Errors surfaced by the selection model. None of these are fatal to the
/// process; the worst outcome is a page save reporting a partial-failure
/// list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The privileged backend is unreachable. The caller falls back to the
    /// supplied default and keeps working in a degraded mode.
    #[error("cannot reach the qubes daemon")]
    BackendUnavailable,

    /// Attempted to add a flow-collection member that is already present.
    #[error("{0} is already in the list")]
    DuplicateMember(VmName),

    /// A property-backed trait holder points at an attribute its target
    /// does not have. A configuration bug, so it fails loudly.
    #[error("target has no attribute {0:?}")]
    AttributeMissing(String),

    /// A selection token resolved to no entry. The previous selection is
    /// retained.
    #[error("no entry matches {0:?}")]
    SelectionNotFound(String),

    /// The backend refused a write, or a local precondition failed.
    #[error("{0}")]
    Rejected(String),
}

impl From<AdminError> for ModelError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::DaemonAccess => ModelError::BackendUnavailable,
            AdminError::NoSuchProperty(name) => ModelError::AttributeMissing(name),
            AdminError::Rejected(reason) => ModelError::Rejected(reason),
        }
    }
}
