//! In-memory [`Catalog`] implementation backed by [`DashMap`].
//!
//! Provides concurrent access without external locking. Suitable for
//! tests, development, and single-registry embedders; replicated
//! deployments put a real store behind the [`Catalog`] trait instead.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use fleetgrid_core::{
    AdapterInfo, ApplicationDescriptor, ApplicationInfo, ApplicationUpdateInfo, NodeInfo,
    ObjectId, ObjectInfo, RegistryInfo, ServerDescriptor, ServerInfo, ServerInstanceDescriptor,
};

use crate::admin::AdminError;
use crate::transport::{NodeEndpoint, ReplicaEndpoint, ServerEndpoint};

use super::{Catalog, NodeEntry, ReplicaEntry, ResolvedServer};

/// A registered server: its record plus the live endpoint its node agent
/// exposes for it.
struct ServerRecord {
    info: ServerInfo,
    endpoint: Arc<dyn ServerEndpoint>,
}

/// In-memory catalog keyed by record name/id.
///
/// The elected master's name is swapped atomically on election changes;
/// `is_master` is a lock-free read. A freshly constructed catalog elects
/// itself, which is the correct default for single-registry deployments.
pub struct MemoryCatalog {
    instance_name: String,
    elected: ArcSwap<String>,
    applications: DashMap<String, ApplicationInfo>,
    servers: DashMap<String, ServerRecord>,
    nodes: DashMap<String, NodeEntry>,
    replicas: DashMap<String, ReplicaEntry>,
    adapters: DashMap<String, AdapterInfo>,
    /// Keyed by the identity's string form (`category/name`).
    objects: DashMap<String, ObjectInfo>,
}

impl MemoryCatalog {
    /// Creates an empty catalog that considers itself the elected master.
    #[must_use]
    pub fn new(instance_name: impl Into<String>) -> Self {
        let instance_name = instance_name.into();
        Self {
            elected: ArcSwap::from_pointee(instance_name.clone()),
            instance_name,
            applications: DashMap::new(),
            servers: DashMap::new(),
            nodes: DashMap::new(),
            replicas: DashMap::new(),
            adapters: DashMap::new(),
            objects: DashMap::new(),
        }
    }

    /// Records the outcome of a master election.
    pub fn set_elected_master(&self, name: impl Into<String>) {
        self.elected.store(Arc::new(name.into()));
    }

    /// Registers a node agent.
    pub fn add_node(&self, info: NodeInfo, endpoint: Arc<dyn NodeEndpoint>) {
        self.nodes
            .insert(info.name.clone(), NodeEntry { info, endpoint });
    }

    /// Registers a registry replica.
    pub fn add_replica(&self, info: RegistryInfo, endpoint: Arc<dyn ReplicaEndpoint>) {
        self.replicas
            .insert(info.name.clone(), ReplicaEntry { info, endpoint });
    }

    /// Registers a managed server and its control endpoint.
    pub fn add_server(&self, info: ServerInfo, endpoint: Arc<dyn ServerEndpoint>) {
        self.servers
            .insert(info.descriptor.id.clone(), ServerRecord { info, endpoint });
    }

    /// Registers an object adapter.
    pub fn add_adapter(&self, info: AdapterInfo) {
        self.adapters.insert(info.id.clone(), info);
    }

    /// Loads application records from a JSON array snapshot, replacing any
    /// records with the same names. Returns the number of records loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is not a JSON array of application
    /// records.
    pub fn seed_applications_json(&self, json: &str) -> anyhow::Result<usize> {
        let records: Vec<ApplicationInfo> = serde_json::from_str(json)?;
        let count = records.len();
        for info in records {
            self.applications
                .insert(info.descriptor.name.clone(), info);
        }
        Ok(count)
    }
}

/// Replaces `${param}` placeholders with bound parameter values.
fn substitute_params(
    value: &str,
    parameters: &std::collections::BTreeMap<String, String>,
) -> String {
    let mut out = value.to_string();
    for (name, bound) in parameters {
        out = out.replace(&format!("${{{name}}}"), bound);
    }
    out
}

/// Matches `value` against a `*`-wildcard expression. Without a wildcard
/// the match is exact.
fn wildcard_match(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let last_index = parts.len() - 1;
    let mut remainder = value;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == last_index {
            return remainder.ends_with(part);
        }
        match remainder.find(part) {
            Some(found) => {
                if i == 0 && found != 0 {
                    return false;
                }
                remainder = &remainder[found + part.len()..];
            }
            None => return false,
        }
    }
    true
}

impl Catalog for MemoryCatalog {
    fn is_master(&self) -> bool {
        self.elected.load().as_str() == self.instance_name
    }

    fn instance_name(&self) -> String {
        self.instance_name.clone()
    }

    // ----- applications ---------------------------------------------------

    fn add_application(&self, info: ApplicationInfo) -> Result<(), AdminError> {
        let name = info.descriptor.name.clone();
        if self.applications.contains_key(&name) {
            return Err(AdminError::deployment(format!(
                "application `{name}` already exists"
            )));
        }
        self.applications.insert(name, info);
        Ok(())
    }

    fn sync_application(
        &self,
        descriptor: ApplicationDescriptor,
        update_time: i64,
        update_user: &str,
    ) -> Result<(), AdminError> {
        let mut entry = self
            .applications
            .get_mut(&descriptor.name)
            .ok_or_else(|| AdminError::ApplicationNotFound(descriptor.name.clone()))?;
        let info = entry.value_mut();
        info.descriptor = descriptor;
        info.revision += 1;
        info.update_time = update_time;
        info.update_user = update_user.to_string();
        Ok(())
    }

    fn update_application(&self, update: ApplicationUpdateInfo) -> Result<(), AdminError> {
        let name = update.descriptor.name.clone();
        let mut entry = self
            .applications
            .get_mut(&name)
            .ok_or(AdminError::ApplicationNotFound(name))?;
        let info = entry.value_mut();
        let descriptor = &mut info.descriptor;
        if let Some(description) = update.descriptor.description {
            descriptor.description = description;
        }
        for (name, value) in update.descriptor.variables {
            descriptor.variables.insert(name, value);
        }
        for name in &update.descriptor.remove_variables {
            descriptor.variables.remove(name);
        }
        if let Some(distribution) = update.descriptor.distribution {
            descriptor.distribution = distribution;
        }
        for (name, section) in update.descriptor.nodes {
            descriptor.nodes.insert(name, section);
        }
        info.revision = if update.revision == 0 {
            info.revision + 1
        } else {
            update.revision
        };
        info.update_time = update.update_time;
        info.update_user = update.update_user;
        Ok(())
    }

    fn remove_application(&self, name: &str) -> Result<(), AdminError> {
        self.applications
            .remove(name)
            .ok_or_else(|| AdminError::ApplicationNotFound(name.to_string()))?;
        self.servers
            .retain(|_, record| record.info.application != name);
        Ok(())
    }

    fn application_info(&self, name: &str) -> Result<ApplicationInfo, AdminError> {
        self.applications
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdminError::ApplicationNotFound(name.to_string()))
    }

    fn application_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .applications
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    fn instantiate_server(
        &self,
        application: &str,
        node: &str,
        instance: ServerInstanceDescriptor,
    ) -> Result<(), AdminError> {
        if !self.nodes.contains_key(node) {
            return Err(AdminError::NodeNotFound(node.to_string()));
        }
        let mut entry = self
            .applications
            .get_mut(application)
            .ok_or_else(|| AdminError::ApplicationNotFound(application.to_string()))?;
        let info = entry.value_mut();
        let template = info
            .descriptor
            .server_templates
            .get(&instance.template)
            .cloned()
            .ok_or_else(|| {
                AdminError::deployment(format!("unknown server template `{}`", instance.template))
            })?;
        let server = ServerDescriptor {
            id: substitute_params(&template.id, &instance.parameter_values),
            exe: substitute_params(&template.exe, &instance.parameter_values),
            ..template
        };
        let deployed = info
            .descriptor
            .nodes
            .values()
            .flat_map(|section| &section.servers)
            .any(|existing| existing.id == server.id);
        if deployed {
            return Err(AdminError::deployment(format!(
                "server `{}` is already deployed",
                server.id
            )));
        }
        info.descriptor
            .nodes
            .entry(node.to_string())
            .or_default()
            .servers
            .push(server);
        info.revision += 1;
        Ok(())
    }

    // ----- servers --------------------------------------------------------

    fn server_info(&self, id: &str) -> Result<ServerInfo, AdminError> {
        self.servers
            .get(id)
            .map(|record| record.info.clone())
            .ok_or_else(|| AdminError::ServerNotFound(id.to_string()))
    }

    fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.servers.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn resolve_server(&self, id: &str) -> Result<ResolvedServer, AdminError> {
        let record = self
            .servers
            .get(id)
            .ok_or_else(|| AdminError::ServerNotFound(id.to_string()))?;
        Ok(ResolvedServer {
            endpoint: Arc::clone(&record.endpoint),
            node: record.info.node.clone(),
            activation_timeout: Duration::from_secs(record.info.descriptor.activation_timeout_s),
            deactivation_timeout: Duration::from_secs(
                record.info.descriptor.deactivation_timeout_s,
            ),
        })
    }

    // ----- nodes ----------------------------------------------------------

    fn node_entry(&self, name: &str) -> Result<NodeEntry, AdminError> {
        self.nodes
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdminError::NodeNotFound(name.to_string()))
    }

    fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    // ----- registry replicas ----------------------------------------------

    fn replica_entry(&self, name: &str) -> Result<ReplicaEntry, AdminError> {
        self.replicas
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdminError::RegistryNotFound(name.to_string()))
    }

    fn replica_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.replicas.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    // ----- adapters -------------------------------------------------------

    fn adapter_info(&self, id: &str) -> Result<Vec<AdapterInfo>, AdminError> {
        if let Some(adapter) = self.adapters.get(id) {
            return Ok(vec![adapter.value().clone()]);
        }
        let members: Vec<AdapterInfo> = self
            .adapters
            .iter()
            .filter(|entry| entry.value().replica_group_id == id)
            .map(|entry| entry.value().clone())
            .collect();
        if members.is_empty() {
            return Err(AdminError::AdapterNotFound(id.to_string()));
        }
        let mut members = members;
        members.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(members)
    }

    fn remove_adapter(&self, id: &str) -> Result<(), AdminError> {
        if self.adapters.remove(id).is_some() {
            return Ok(());
        }
        let before = self.adapters.len();
        self.adapters
            .retain(|_, adapter| adapter.replica_group_id != id);
        if self.adapters.len() == before {
            return Err(AdminError::AdapterNotFound(id.to_string()));
        }
        Ok(())
    }

    fn adapter_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    // ----- well-known objects ---------------------------------------------

    fn add_object(&self, info: ObjectInfo) -> Result<(), AdminError> {
        let key = info.id.to_string();
        if self.objects.contains_key(&key) {
            return Err(AdminError::deployment(format!(
                "object `{key}` already exists"
            )));
        }
        self.objects.insert(key, info);
        Ok(())
    }

    fn update_object(&self, info: ObjectInfo) -> Result<(), AdminError> {
        let key = info.id.to_string();
        let mut entry = self
            .objects
            .get_mut(&key)
            .ok_or(AdminError::ObjectNotFound(key.clone()))?;
        *entry.value_mut() = info;
        Ok(())
    }

    fn remove_object(&self, id: &ObjectId) -> Result<(), AdminError> {
        self.objects
            .remove(&id.to_string())
            .ok_or_else(|| AdminError::ObjectNotFound(id.to_string()))?;
        Ok(())
    }

    fn object_info(&self, id: &ObjectId) -> Result<ObjectInfo, AdminError> {
        self.objects
            .get(&id.to_string())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdminError::ObjectNotFound(id.to_string()))
    }

    fn objects_by_type(&self, type_id: &str) -> Vec<ObjectInfo> {
        let mut infos: Vec<ObjectInfo> = self
            .objects
            .iter()
            .filter(|entry| entry.value().type_id == type_id)
            .map(|entry| entry.value().clone())
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    fn all_objects(&self, expression: &str) -> Vec<ObjectInfo> {
        let mut infos: Vec<ObjectInfo> = self
            .objects
            .iter()
            .filter(|entry| {
                expression.is_empty() || wildcard_match(expression, entry.key())
            })
            .map(|entry| entry.value().clone())
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
