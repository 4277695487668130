//! Administrative error taxonomy.
//!
//! Every failure surfaced to an administrative caller is one of these
//! variants, independent of which transport or catalog produced it.
//! `PatchFailed` is only ever raised by a completed (or abandoned) patch
//! job and carries one formatted reason per failed node, sorted
//! lexicographically.

use thiserror::Error;

/// Domain errors raised by administrative operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("application `{0}` does not exist")]
    ApplicationNotFound(String),

    #[error("server `{0}` does not exist")]
    ServerNotFound(String),

    #[error("node `{0}` does not exist")]
    NodeNotFound(String),

    #[error("registry `{0}` does not exist")]
    RegistryNotFound(String),

    #[error("object `{0}` does not exist")]
    ObjectNotFound(String),

    #[error("adapter `{0}` does not exist")]
    AdapterNotFound(String),

    #[error("node `{node}` is unreachable: {reason}")]
    NodeUnreachable { node: String, reason: String },

    #[error("registry `{name}` is unreachable: {reason}")]
    RegistryUnreachable { name: String, reason: String },

    /// Malformed deployment, a mutation attempted on a non-master
    /// registry, or a mutation of a reserved identity.
    #[error("deployment error: {reason}")]
    Deployment { reason: String },

    /// Aggregate outcome of a distributed patch with at least one failed
    /// node. Never raised for an individual node by itself.
    #[error("patch failed:\n{}", reasons.join("\n"))]
    PatchFailed { reasons: Vec<String> },
}

impl AdminError {
    /// Shorthand for a `Deployment` error with the given reason.
    pub fn deployment(reason: impl Into<String>) -> Self {
        Self::Deployment {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
