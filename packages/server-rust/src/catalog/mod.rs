//! Catalog seams: the replicated registry store, distribution resolution,
//! and the local registry handle.
//!
//! The control plane consumes these traits; replication, persistence, and
//! master election live behind them. `memory` provides a `DashMap`-backed
//! implementation for tests and light embedders.

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use fleetgrid_core::{
    AdapterInfo, ApplicationDescriptor, ApplicationInfo, ApplicationUpdateInfo,
    DistributionDescriptor, NodeInfo, ObjectId, ObjectInfo, RegistryInfo, ServerInfo,
    ServerInstanceDescriptor,
};

use crate::admin::AdminError;
use crate::transport::{NodeEndpoint, ReplicaEndpoint, ServerEndpoint};

pub use memory::MemoryCatalog;

// ---------------------------------------------------------------------------
// Resolved entries
// ---------------------------------------------------------------------------

/// A managed server resolved to its live endpoint and timeout profiles.
#[derive(Clone)]
pub struct ResolvedServer {
    /// Endpoint of the server's control surface on its node agent.
    pub endpoint: Arc<dyn ServerEndpoint>,
    /// Node the server is deployed on.
    pub node: String,
    /// Budget for activation-profile calls.
    pub activation_timeout: Duration,
    /// Budget for deactivation-profile calls.
    pub deactivation_timeout: Duration,
}

/// A worker node resolved to its record and live agent endpoint.
#[derive(Clone)]
pub struct NodeEntry {
    pub info: NodeInfo,
    pub endpoint: Arc<dyn NodeEndpoint>,
}

/// A registry replica resolved to its record and live endpoint.
#[derive(Clone)]
pub struct ReplicaEntry {
    pub info: RegistryInfo,
    pub endpoint: Arc<dyn ReplicaEndpoint>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The replicated registry store.
///
/// Mutations succeed only through the elected master; the facade enforces
/// that gate before calling in, so implementations may assume callers
/// hold it.
pub trait Catalog: Send + Sync {
    /// Returns `true` if this registry instance is the elected master.
    fn is_master(&self) -> bool;

    /// The local registry's instance name. Object identities in this
    /// category are reserved.
    fn instance_name(&self) -> String;

    // ----- applications ---------------------------------------------------

    /// Adds a new application record.
    ///
    /// # Errors
    ///
    /// `Deployment` if an application with the same name already exists.
    fn add_application(&self, info: ApplicationInfo) -> Result<(), AdminError>;

    /// Replaces an application's descriptor wholesale.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` if no such application exists.
    fn sync_application(
        &self,
        descriptor: ApplicationDescriptor,
        update_time: i64,
        update_user: &str,
    ) -> Result<(), AdminError>;

    /// Applies a partial update to an application.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` if no such application exists.
    fn update_application(&self, update: ApplicationUpdateInfo) -> Result<(), AdminError>;

    /// Removes an application record and its server records.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` if no such application exists.
    fn remove_application(&self, name: &str) -> Result<(), AdminError>;

    /// Returns an application record.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` if no such application exists.
    fn application_info(&self, name: &str) -> Result<ApplicationInfo, AdminError>;

    /// All application names, sorted.
    fn application_names(&self) -> Vec<String>;

    /// Instantiates a server template onto a node, updating the
    /// application's descriptor.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound`/`NodeNotFound` for missing targets,
    /// `Deployment` for an unknown template.
    fn instantiate_server(
        &self,
        application: &str,
        node: &str,
        instance: ServerInstanceDescriptor,
    ) -> Result<(), AdminError>;

    // ----- servers --------------------------------------------------------

    /// Returns a server record.
    ///
    /// # Errors
    ///
    /// `ServerNotFound` if no such server exists.
    fn server_info(&self, id: &str) -> Result<ServerInfo, AdminError>;

    /// All server ids, sorted.
    fn server_ids(&self) -> Vec<String>;

    /// Resolves a server to its live endpoint and timeout profiles.
    ///
    /// # Errors
    ///
    /// `ServerNotFound` if no such server exists.
    fn resolve_server(&self, id: &str) -> Result<ResolvedServer, AdminError>;

    // ----- nodes ----------------------------------------------------------

    /// Resolves a node to its record and agent endpoint.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no such node exists.
    fn node_entry(&self, name: &str) -> Result<NodeEntry, AdminError>;

    /// All node names, sorted.
    fn node_names(&self) -> Vec<String>;

    // ----- registry replicas ----------------------------------------------

    /// Resolves a replica to its record and endpoint.
    ///
    /// # Errors
    ///
    /// `RegistryNotFound` if no such replica exists.
    fn replica_entry(&self, name: &str) -> Result<ReplicaEntry, AdminError>;

    /// All replica names (excluding the local registry), sorted.
    fn replica_names(&self) -> Vec<String>;

    // ----- adapters -------------------------------------------------------

    /// Returns the adapter record, or the records of a replica group's
    /// members when `id` names a replica group.
    ///
    /// # Errors
    ///
    /// `AdapterNotFound` if neither matches.
    fn adapter_info(&self, id: &str) -> Result<Vec<AdapterInfo>, AdminError>;

    /// Removes an adapter, or every member of a replica group.
    ///
    /// # Errors
    ///
    /// `AdapterNotFound` if neither matches.
    fn remove_adapter(&self, id: &str) -> Result<(), AdminError>;

    /// All adapter ids, sorted.
    fn adapter_ids(&self) -> Vec<String>;

    // ----- well-known objects ---------------------------------------------

    /// Adds a well-known object record.
    ///
    /// # Errors
    ///
    /// `Deployment` if the identity is already registered.
    fn add_object(&self, info: ObjectInfo) -> Result<(), AdminError>;

    /// Replaces a well-known object record.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the identity is not registered.
    fn update_object(&self, info: ObjectInfo) -> Result<(), AdminError>;

    /// Removes a well-known object record.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the identity is not registered.
    fn remove_object(&self, id: &ObjectId) -> Result<(), AdminError>;

    /// Returns a well-known object record.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the identity is not registered.
    fn object_info(&self, id: &ObjectId) -> Result<ObjectInfo, AdminError>;

    /// All objects of the given most-derived type, sorted by identity.
    fn objects_by_type(&self, type_id: &str) -> Vec<ObjectInfo>;

    /// All objects whose stringified identity matches the `*`-wildcard
    /// expression; an empty expression matches everything. Sorted by
    /// identity.
    fn all_objects(&self, expression: &str) -> Vec<ObjectInfo>;
}

// ---------------------------------------------------------------------------
// LocalRegistry
// ---------------------------------------------------------------------------

/// Handle to the local registry instance the facade runs inside.
pub trait LocalRegistry: Send + Sync {
    /// The local instance's name.
    fn name(&self) -> String;

    /// The local instance's record.
    fn info(&self) -> RegistryInfo;

    /// Initiates shutdown of the local instance.
    fn shutdown(&self);
}

// ---------------------------------------------------------------------------
// DistributionResolver
// ---------------------------------------------------------------------------

/// Computes which nodes a patch operation must reach and the concrete
/// distribution payload each node receives.
pub trait DistributionResolver: Send + Sync {
    /// Nodes requiring a distribution sync for a whole application, with
    /// the application's distribution. An empty node list means there is
    /// nothing to patch.
    fn application_distribution(
        &self,
        descriptor: &ApplicationDescriptor,
    ) -> (DistributionDescriptor, Vec<String>);

    /// Node requiring a distribution sync for one server. At most one
    /// node is returned: the node hosting the server.
    fn server_distribution(
        &self,
        descriptor: &ApplicationDescriptor,
        server_id: &str,
    ) -> (DistributionDescriptor, Vec<String>);

    /// Substitutes node-scoped variables into a distribution, producing
    /// the payload dispatched to that node.
    fn resolve_for_node(
        &self,
        node: &NodeInfo,
        distribution: &DistributionDescriptor,
    ) -> DistributionDescriptor;
}

/// Default resolver driven purely by descriptor contents.
///
/// An application's distribution reaches every node with at least one of
/// the application's servers; a server's distribution reaches the node
/// hosting it. `${node.name}`, `${node.hostname}` and `${node.datadir}`
/// placeholders are substituted per node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorResolver;

impl DescriptorResolver {
    fn substitute(node: &NodeInfo, value: &str) -> String {
        value
            .replace("${node.name}", &node.name)
            .replace("${node.hostname}", &node.hostname)
            .replace("${node.datadir}", &node.data_dir)
    }
}

impl DistributionResolver for DescriptorResolver {
    fn application_distribution(
        &self,
        descriptor: &ApplicationDescriptor,
    ) -> (DistributionDescriptor, Vec<String>) {
        if descriptor.distribution.is_empty() {
            return (DistributionDescriptor::default(), Vec::new());
        }
        let nodes = descriptor
            .nodes
            .iter()
            .filter(|(_, section)| !section.servers.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        (descriptor.distribution.clone(), nodes)
    }

    fn server_distribution(
        &self,
        descriptor: &ApplicationDescriptor,
        server_id: &str,
    ) -> (DistributionDescriptor, Vec<String>) {
        if descriptor.distribution.is_empty() {
            return (DistributionDescriptor::default(), Vec::new());
        }
        for (node_name, section) in &descriptor.nodes {
            if section.servers.iter().any(|server| server.id == server_id) {
                return (descriptor.distribution.clone(), vec![node_name.clone()]);
            }
        }
        (DistributionDescriptor::default(), Vec::new())
    }

    fn resolve_for_node(
        &self,
        node: &NodeInfo,
        distribution: &DistributionDescriptor,
    ) -> DistributionDescriptor {
        DistributionDescriptor {
            source: Self::substitute(node, &distribution.source),
            directories: distribution
                .directories
                .iter()
                .map(|dir| Self::substitute(node, dir))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
