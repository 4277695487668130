//! Domain records exchanged between the control plane and its embedders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{ApplicationDescriptor, ApplicationUpdateDescriptor, ServerDescriptor};

// ---------------------------------------------------------------------------
// Server lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a managed server process, as reported by its node agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerState {
    /// Process is not running.
    Inactive,
    /// Activation requested; the process has not yet reported ready.
    Activating,
    /// Activation exceeded the server's activation timeout.
    ActivationTimedOut,
    /// Process is running and ready.
    Active,
    /// Deactivation requested; the process is shutting down.
    Deactivating,
    /// Deactivation exceeded the server's deactivation timeout.
    DeactivationTimedOut,
    /// The server record is being removed; the process is being stopped.
    Destroying,
    /// The server record has been removed.
    Destroyed,
}

/// Load averages reported by a node agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadInfo {
    /// 1-minute load average.
    pub avg1: f32,
    /// 5-minute load average.
    pub avg5: f32,
    /// 15-minute load average.
    pub avg15: f32,
}

// ---------------------------------------------------------------------------
// Node and registry records
// ---------------------------------------------------------------------------

/// Static description of a worker node, captured when its agent registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Node name, unique across the cluster.
    pub name: String,
    /// Operating system name.
    pub os: String,
    /// Network hostname of the node.
    pub hostname: String,
    /// OS release string.
    pub release: String,
    /// Machine hardware identifier.
    pub machine: String,
    /// Number of processors available to managed servers.
    pub n_processors: u32,
    /// Directory where the node agent keeps server data and distributions.
    pub data_dir: String,
}

/// Description of a registry instance (the elected master or a replica).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryInfo {
    /// Registry instance name.
    pub name: String,
    /// Network hostname of the registry.
    pub hostname: String,
}

// ---------------------------------------------------------------------------
// Application records
// ---------------------------------------------------------------------------

/// A deployed application record with audit metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    /// Stable identifier assigned when the application was first added.
    pub uuid: String,
    /// Milliseconds since the Unix epoch at creation.
    pub create_time: i64,
    /// Session user that created the application.
    pub create_user: String,
    /// Milliseconds since the Unix epoch at the last update.
    pub update_time: i64,
    /// Session user that performed the last update.
    pub update_user: String,
    /// Revision counter, incremented on every update.
    pub revision: u64,
    /// The application's current deployment descriptor.
    pub descriptor: ApplicationDescriptor,
}

/// An application update with audit metadata, applied against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdateInfo {
    /// Milliseconds since the Unix epoch at update time.
    pub update_time: i64,
    /// Session user performing the update.
    pub update_user: String,
    /// Revision to assign; the catalog assigns the next revision when zero.
    pub revision: u64,
    /// The sections being replaced.
    pub descriptor: ApplicationUpdateDescriptor,
}

/// A managed server record: which application and node it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Owning application name.
    pub application: String,
    /// Node the server is deployed on.
    pub node: String,
    /// The server's resolved descriptor.
    pub descriptor: ServerDescriptor,
}

// ---------------------------------------------------------------------------
// Well-known object records
// ---------------------------------------------------------------------------

/// Identity of a well-known object: a category-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectId {
    /// Namespace of the identity. Identities in the registry's own
    /// category are reserved and cannot be mutated by operators.
    pub category: String,
    /// Name within the category.
    pub name: String,
}

impl ObjectId {
    /// Creates an identity from category and name parts.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.category, self.name)
        }
    }
}

/// A registered well-known object and its most-derived type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// The object's identity.
    pub id: ObjectId,
    /// The object's most-derived type identifier.
    pub type_id: String,
}

/// A registered object adapter and its replica group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    /// Adapter identifier.
    pub id: String,
    /// Replica group this adapter belongs to; empty when standalone.
    pub replica_group_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_display_with_category() {
        let id = ObjectId::new("FleetGrid", "Query");
        assert_eq!(id.to_string(), "FleetGrid/Query");
    }

    #[test]
    fn object_id_display_without_category() {
        let id = ObjectId::new("", "router");
        assert_eq!(id.to_string(), "router");
    }

    #[test]
    fn server_state_serializes_camel_case() {
        let json = serde_json::to_string(&ServerState::ActivationTimedOut).unwrap();
        assert_eq!(json, "\"activationTimedOut\"");
    }
}
