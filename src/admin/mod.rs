//! Seam to the Qubes administrative API.
//!
//! The real client library lives outside this crate; everything here talks
//! to it through the [`AdminClient`] trait. [`MemoryAdmin`] is a
//! deterministic in-memory implementation used by tests and by callers
//! that need a backend without a running qubesd.

mod client;
mod memory;

pub use client::{find_domain, AdminClient, NewQubeRequest, PropertyTarget};
pub use memory::MemoryAdmin;

use thiserror::Error;

/// Errors surfaced by the administrative backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The privileged qubesd connection is down. Recoverable: callers fall
    /// back to defaults and keep working in a degraded mode.
    #[error("cannot reach the qubes daemon")]
    DaemonAccess,

    /// The target object has no such property.
    #[error("no such property: {0}")]
    NoSuchProperty(String),

    /// The backend refused the operation (permissions, validation).
    #[error("operation refused by the backend: {0}")]
    Rejected(String),
}
