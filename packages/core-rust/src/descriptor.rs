//! Deployment descriptors.
//!
//! These are the resolved shapes the control plane consumes. Descriptor
//! parsing and template expansion happen upstream; by the time a descriptor
//! reaches the catalog, templates and references have been flattened into
//! these structs. `BTreeMap` keeps variable and node ordering deterministic
//! across serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// The set of files a node must fetch to bring a deployment up to date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionDescriptor {
    /// Endpoint of the distribution source serving the files; empty when
    /// the deployment carries no distribution.
    pub source: String,
    /// Directories to sync, relative to the distribution root. An empty
    /// list with a non-empty source means "sync everything".
    pub directories: Vec<String>,
}

impl DistributionDescriptor {
    /// Returns `true` when this deployment has nothing to distribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.directories.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Server descriptors
// ---------------------------------------------------------------------------

/// A managed server process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    /// Server identifier, unique across the cluster.
    pub id: String,
    /// Executable the node agent launches.
    pub exe: String,
    /// Budget for the process to report ready after activation, in seconds.
    pub activation_timeout_s: u64,
    /// Budget for the process to exit after deactivation, in seconds.
    pub deactivation_timeout_s: u64,
}

/// A server instantiated from a template with concrete parameter values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInstanceDescriptor {
    /// Name of the server template being instantiated.
    pub template: String,
    /// Values bound to the template's parameters.
    pub parameter_values: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Application descriptors
// ---------------------------------------------------------------------------

/// Per-node deployment section of an application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Servers deployed on this node.
    pub servers: Vec<ServerDescriptor>,
    /// Node-scoped variables, overriding application-scoped ones.
    pub variables: BTreeMap<String, String>,
}

/// A complete application deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDescriptor {
    /// Application name, unique across the cluster.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Application-scoped variables available to node sections.
    pub variables: BTreeMap<String, String>,
    /// Application-wide distribution; nodes hosting this application's
    /// servers fetch it on patch.
    pub distribution: DistributionDescriptor,
    /// Server templates instantiable on any node, keyed by template name.
    /// Template fields may reference `${param}` placeholders bound at
    /// instantiation time.
    pub server_templates: BTreeMap<String, ServerDescriptor>,
    /// Per-node deployment sections, keyed by node name.
    pub nodes: BTreeMap<String, NodeDescriptor>,
}

/// A partial application update: only the present sections are replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdateDescriptor {
    /// Name of the application being updated.
    pub name: String,
    /// Replacement description, when present.
    pub description: Option<String>,
    /// Variables to add or overwrite.
    pub variables: BTreeMap<String, String>,
    /// Variables to remove.
    pub remove_variables: Vec<String>,
    /// Replacement distribution, when present.
    pub distribution: Option<DistributionDescriptor>,
    /// Replacement node sections, keyed by node name.
    pub nodes: BTreeMap<String, NodeDescriptor>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
