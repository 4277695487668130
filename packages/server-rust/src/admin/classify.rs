//! Transport failure classification.
//!
//! Maps an `RpcError` observed while calling into a specific target to a
//! domain `AdminError`, so callers can distinguish "this target was
//! removed" from "this target is currently unreachable" without inspecting
//! transport internals. Domain failures raised by the remote peer pass
//! through unchanged.

use crate::transport::RpcError;

use super::error::AdminError;

/// Classifies a failure observed while invoking a managed server.
///
/// `ObjectNotFound` means the server record was removed out from under the
/// caller; anything else transport-level is folded into the hosting node
/// being unreachable.
#[must_use]
pub fn classify_server(id: &str, node: &str, err: RpcError) -> AdminError {
    match err {
        RpcError::Remote(domain) => domain,
        RpcError::ObjectNotFound => AdminError::ServerNotFound(id.to_string()),
        other => AdminError::NodeUnreachable {
            node: node.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Classifies a failure observed while invoking a node agent.
#[must_use]
pub fn classify_node(name: &str, err: RpcError) -> AdminError {
    match err {
        RpcError::Remote(domain) => domain,
        RpcError::ObjectNotFound => AdminError::NodeNotFound(name.to_string()),
        other => AdminError::NodeUnreachable {
            node: name.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Classifies a failure observed while invoking a registry replica.
#[must_use]
pub fn classify_replica(name: &str, err: RpcError) -> AdminError {
    match err {
        RpcError::Remote(domain) => domain,
        RpcError::ObjectNotFound => AdminError::RegistryNotFound(name.to_string()),
        other => AdminError::RegistryUnreachable {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
