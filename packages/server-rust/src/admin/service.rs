//! The administrative facade.
//!
//! Every operator-facing operation enters here. Catalog mutations are
//! gated on the local registry being the elected master; server lifecycle
//! calls resolve a fresh `ServerProxy` per call; distributed patches fan
//! out through a `PatchJob` registered in the facade's `CallbackRegistry`.
//! One facade exists per administrative session, and tearing it down
//! abandons whatever patches are still in flight.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;
use uuid::Uuid;

use fleetgrid_core::{
    AdapterInfo, ApplicationDescriptor, ApplicationInfo, ApplicationUpdateDescriptor,
    ApplicationUpdateInfo, DistributionDescriptor, LoadInfo, NodeInfo, ObjectId, ObjectInfo,
    PatchRequest, RegistryInfo, ServerInfo, ServerInstanceDescriptor, ServerState,
};

use crate::catalog::{Catalog, DistributionResolver, LocalRegistry};
use crate::transport::RpcError;

use super::callbacks::CallbackRegistry;
use super::classify;
use super::config::AdminConfig;
use super::error::AdminError;
use super::patch::PatchJob;
use super::proxy::ServerProxy;

/// Milliseconds since the Unix epoch.
#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// The administrative control plane facade.
pub struct AdminService {
    catalog: Arc<dyn Catalog>,
    registry: Arc<dyn LocalRegistry>,
    resolver: Arc<dyn DistributionResolver>,
    callbacks: Arc<CallbackRegistry>,
    config: AdminConfig,
}

impl AdminService {
    /// Creates a facade over the given collaborators.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        registry: Arc<dyn LocalRegistry>,
        resolver: Arc<dyn DistributionResolver>,
        config: AdminConfig,
    ) -> Self {
        Self {
            catalog,
            registry,
            resolver,
            callbacks: Arc::new(CallbackRegistry::new()),
            config,
        }
    }

    /// The facade's callback registry. The transport layer routes incoming
    /// patch reports through this.
    #[must_use]
    pub fn callbacks(&self) -> Arc<CallbackRegistry> {
        Arc::clone(&self.callbacks)
    }

    /// Abandons in-flight patches and unpublishes their callback
    /// endpoints. Called when the owning session ends; also runs on drop.
    pub fn teardown(&self) {
        self.callbacks.teardown_all();
    }

    fn check_is_master(&self) -> Result<(), AdminError> {
        if self.catalog.is_master() {
            Ok(())
        } else {
            Err(AdminError::deployment(
                "this operation is only allowed on the master registry.",
            ))
        }
    }

    fn check_object_mutable(&self, id: &ObjectId, verb: &str) -> Result<(), AdminError> {
        if id.category == self.catalog.instance_name() {
            return Err(AdminError::deployment(format!(
                "{verb} object `{id}` is not allowed"
            )));
        }
        Ok(())
    }

    // ----- applications ---------------------------------------------------

    /// Adds a new application, stamping audit metadata.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master or the name is taken.
    pub fn add_application(&self, descriptor: ApplicationDescriptor) -> Result<(), AdminError> {
        self.check_is_master()?;
        let now = now_ms();
        let info = ApplicationInfo {
            uuid: Uuid::new_v4().to_string(),
            create_time: now,
            create_user: self.config.session_user.clone(),
            update_time: now,
            update_user: self.config.session_user.clone(),
            revision: 1,
            descriptor,
        };
        self.catalog.add_application(info)
    }

    /// Replaces an application's descriptor wholesale.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master; `ApplicationNotFound` otherwise.
    pub fn sync_application(&self, descriptor: ApplicationDescriptor) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.catalog
            .sync_application(descriptor, now_ms(), &self.config.session_user)
    }

    /// Applies a partial application update.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master; `ApplicationNotFound` otherwise.
    pub fn update_application(
        &self,
        descriptor: ApplicationUpdateDescriptor,
    ) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.catalog.update_application(ApplicationUpdateInfo {
            update_time: now_ms(),
            update_user: self.config.session_user.clone(),
            revision: 0,
            descriptor,
        })
    }

    /// Removes an application.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master; `ApplicationNotFound` otherwise.
    pub fn remove_application(&self, name: &str) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.catalog.remove_application(name)
    }

    /// Instantiates a server template onto a node.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master or the template is unknown;
    /// `ApplicationNotFound`/`NodeNotFound` for missing targets.
    pub fn instantiate_server(
        &self,
        application: &str,
        node: &str,
        instance: ServerInstanceDescriptor,
    ) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.catalog.instantiate_server(application, node, instance)
    }

    /// Returns an application record.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` if no such application exists.
    pub fn application_info(&self, name: &str) -> Result<ApplicationInfo, AdminError> {
        self.catalog.application_info(name)
    }

    /// All application names, sorted.
    #[must_use]
    pub fn application_names(&self) -> Vec<String> {
        self.catalog.application_names()
    }

    /// Returns the registry's default application descriptor with sections
    /// that defaults may not carry stripped out.
    ///
    /// # Errors
    ///
    /// `Deployment` if no default deployment is configured.
    pub fn default_application_descriptor(&self) -> Result<ApplicationDescriptor, AdminError> {
        let Some(template) = &self.config.default_descriptor else {
            return Err(AdminError::deployment(
                "no default deployment configured for this registry",
            ));
        };
        let mut descriptor = template.clone();
        descriptor.name = String::new();
        if !descriptor.nodes.is_empty() {
            tracing::warn!("default application descriptor: node sections are not allowed");
            descriptor.nodes.clear();
        }
        if !descriptor.distribution.is_empty() {
            tracing::warn!("default application descriptor: a distribution is not allowed");
            descriptor.distribution = DistributionDescriptor::default();
        }
        if !descriptor.description.is_empty() {
            tracing::warn!("default application descriptor: a description is not allowed");
            descriptor.description.clear();
        }
        if !descriptor.variables.is_empty() {
            tracing::warn!("default application descriptor: variables are not allowed");
            descriptor.variables.clear();
        }
        Ok(descriptor)
    }

    // ----- distributed patch ----------------------------------------------

    /// Patches an application's distribution on every node hosting its
    /// servers. Resolves once all nodes have reported; an empty node set
    /// resolves immediately without publishing a callback endpoint.
    ///
    /// # Errors
    ///
    /// `ApplicationNotFound` before dispatch; `PatchFailed` aggregating
    /// per-node failures after.
    pub async fn patch_application(&self, name: &str, shutdown: bool) -> Result<(), AdminError> {
        let info = self.catalog.application_info(name)?;
        let (distribution, nodes) = self.resolver.application_distribution(&info.descriptor);
        if nodes.is_empty() {
            return Ok(());
        }
        self.run_patch("application", name, name, None, &distribution, &nodes, shutdown)
            .await
    }

    /// Patches one server's distribution on its hosting node.
    ///
    /// # Errors
    ///
    /// `ServerNotFound`/`ApplicationNotFound` before dispatch;
    /// `PatchFailed` after.
    pub async fn patch_server(&self, id: &str, shutdown: bool) -> Result<(), AdminError> {
        let info = self.catalog.server_info(id)?;
        let app = self.catalog.application_info(&info.application)?;
        let (distribution, nodes) = self.resolver.server_distribution(&app.descriptor, id);
        if nodes.is_empty() {
            return Ok(());
        }
        debug_assert_eq!(nodes.len(), 1, "a server patch targets its hosting node");
        self.run_patch(
            "server",
            id,
            &info.application,
            Some(id),
            &distribution,
            &nodes,
            shutdown,
        )
        .await
    }

    /// Fans one patch out to `nodes` and awaits the aggregate outcome.
    ///
    /// A dispatch failure for one node is folded into the job as that
    /// node's failure report; dispatch proceeds to the remaining nodes
    /// regardless.
    #[allow(clippy::too_many_arguments)]
    async fn run_patch(
        &self,
        kind: &'static str,
        name: &str,
        application: &str,
        server: Option<&str>,
        distribution: &DistributionDescriptor,
        nodes: &[String],
        shutdown: bool,
    ) -> Result<(), AdminError> {
        let (job, completion) =
            PatchJob::new(kind, name, nodes.len(), Arc::clone(&self.callbacks));
        self.callbacks.register(Arc::clone(&job));

        for node_name in nodes {
            let dispatched = self
                .dispatch_patch(&job, kind, name, node_name, application, server, distribution, shutdown)
                .await;
            if let Err(err) = dispatched {
                job.report_error(node_name, &err);
            }
        }

        match completion.await {
            Ok(outcome) => outcome,
            // The sender is dropped without a result only if the job was
            // torn down outside finalize/abandon; surface it as aggregate.
            Err(_) => Err(AdminError::PatchFailed {
                reasons: vec!["patch coordinator terminated".to_string()],
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn dispatch_patch(
        &self,
        job: &Arc<PatchJob>,
        kind: &str,
        name: &str,
        node_name: &str,
        application: &str,
        server: Option<&str>,
        distribution: &DistributionDescriptor,
        shutdown: bool,
    ) -> Result<(), AdminError> {
        let entry = self.catalog.node_entry(node_name)?;
        debug!(target: "patch", kind, name, node = node_name, "started patching");
        let payload = self.resolver.resolve_for_node(&entry.info, distribution);
        let request = PatchRequest {
            callback_id: job.id().to_string(),
            application: application.to_string(),
            server: server.map(str::to_string),
            distribution: payload,
            shutdown,
        };
        entry
            .endpoint
            .patch(request)
            .await
            .map_err(|err| classify::classify_node(node_name, err))
    }

    // ----- managed servers ------------------------------------------------

    /// Returns a server record.
    ///
    /// # Errors
    ///
    /// `ServerNotFound` if no such server exists.
    pub fn server_info(&self, id: &str) -> Result<ServerInfo, AdminError> {
        self.catalog.server_info(id)
    }

    /// All server ids, sorted.
    #[must_use]
    pub fn server_ids(&self) -> Vec<String> {
        self.catalog.server_ids()
    }

    /// Returns the server's current lifecycle state.
    ///
    /// # Errors
    ///
    /// Classified per target: `ServerNotFound` or `NodeUnreachable`.
    pub async fn server_state(&self, id: &str) -> Result<ServerState, AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?.state().await
    }

    /// Returns the server's process id.
    ///
    /// # Errors
    ///
    /// Classified per target: `ServerNotFound` or `NodeUnreachable`.
    pub async fn server_pid(&self, id: &str) -> Result<i32, AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?.pid().await
    }

    /// Starts a server under its activation budget.
    ///
    /// # Errors
    ///
    /// Classified per target; an activation timeout surfaces as the node
    /// being unreachable.
    pub async fn start_server(&self, id: &str) -> Result<(), AdminError> {
        let mut proxy = ServerProxy::resolve(self.catalog.as_ref(), id)?;
        proxy.use_activation_timeout();
        proxy.start().await
    }

    /// Stops a server under its deactivation budget. A deactivation
    /// timeout is benign and not surfaced.
    ///
    /// # Errors
    ///
    /// Any non-timeout failure, classified per target.
    pub async fn stop_server(&self, id: &str) -> Result<(), AdminError> {
        let mut proxy = ServerProxy::resolve(self.catalog.as_ref(), id)?;
        proxy.use_deactivation_timeout();
        proxy.stop().await
    }

    /// Delivers a signal to a server process.
    ///
    /// # Errors
    ///
    /// Classified per target.
    pub async fn send_signal(&self, id: &str, signal: &str) -> Result<(), AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?
            .send_signal(signal)
            .await
    }

    /// Writes a message to a server process's stdout (`fd` 1) or stderr
    /// (`fd` 2).
    ///
    /// # Errors
    ///
    /// Classified per target.
    pub async fn write_message(
        &self,
        id: &str,
        message: &str,
        fd: i32,
    ) -> Result<(), AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?
            .write_message(message, fd)
            .await
    }

    /// Enables or disables a server for on-demand activation.
    ///
    /// # Errors
    ///
    /// Classified per target.
    pub async fn enable_server(&self, id: &str, enabled: bool) -> Result<(), AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?
            .set_enabled(enabled)
            .await
    }

    /// Returns whether a server is enabled.
    ///
    /// # Errors
    ///
    /// Classified per target.
    pub async fn is_server_enabled(&self, id: &str) -> Result<bool, AdminError> {
        ServerProxy::resolve(self.catalog.as_ref(), id)?
            .is_enabled()
            .await
    }

    // ----- adapters -------------------------------------------------------

    /// Returns an adapter record, or a replica group's member records.
    ///
    /// # Errors
    ///
    /// `AdapterNotFound` if neither matches.
    pub fn adapter_info(&self, id: &str) -> Result<Vec<AdapterInfo>, AdminError> {
        self.catalog.adapter_info(id)
    }

    /// Removes an adapter, or every member of a replica group.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master; `AdapterNotFound` otherwise.
    pub fn remove_adapter(&self, id: &str) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.catalog.remove_adapter(id)
    }

    /// All adapter ids, sorted.
    #[must_use]
    pub fn adapter_ids(&self) -> Vec<String> {
        self.catalog.adapter_ids()
    }

    // ----- well-known objects ---------------------------------------------

    /// Registers a well-known object.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master, when the identity is reserved, or
    /// when the identity is already registered.
    pub fn add_object(&self, info: ObjectInfo) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.check_object_mutable(&info.id, "adding")?;
        self.catalog.add_object(info)
    }

    /// Replaces a well-known object record.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master or the identity is reserved;
    /// `ObjectNotFound` otherwise.
    pub fn update_object(&self, info: ObjectInfo) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.check_object_mutable(&info.id, "updating")?;
        self.catalog.update_object(info)
    }

    /// Removes a well-known object record.
    ///
    /// # Errors
    ///
    /// `Deployment` when not master or the identity is reserved;
    /// `ObjectNotFound` otherwise.
    pub fn remove_object(&self, id: &ObjectId) -> Result<(), AdminError> {
        self.check_is_master()?;
        self.check_object_mutable(id, "removing")?;
        self.catalog.remove_object(id)
    }

    /// Returns a well-known object record.
    ///
    /// # Errors
    ///
    /// `ObjectNotFound` if the identity is not registered.
    pub fn object_info(&self, id: &ObjectId) -> Result<ObjectInfo, AdminError> {
        self.catalog.object_info(id)
    }

    /// All objects of the given most-derived type, sorted by identity.
    #[must_use]
    pub fn objects_by_type(&self, type_id: &str) -> Vec<ObjectInfo> {
        self.catalog.objects_by_type(type_id)
    }

    /// All objects matching a `*`-wildcard identity expression.
    #[must_use]
    pub fn all_objects(&self, expression: &str) -> Vec<ObjectInfo> {
        self.catalog.all_objects(expression)
    }

    // ----- nodes ----------------------------------------------------------

    /// Returns a node record.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no such node exists.
    pub fn node_info(&self, name: &str) -> Result<NodeInfo, AdminError> {
        Ok(self.catalog.node_entry(name)?.info)
    }

    /// Returns a node's hostname.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no such node exists.
    pub fn node_hostname(&self, name: &str) -> Result<String, AdminError> {
        Ok(self.catalog.node_entry(name)?.info.hostname)
    }

    /// Pings a node agent. `Ok(false)` means the node is known but
    /// currently unreachable.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the node record, or the remote agent object, no
    /// longer exists.
    pub async fn ping_node(&self, name: &str) -> Result<bool, AdminError> {
        let entry = self.catalog.node_entry(name)?;
        match entry.endpoint.ping().await {
            Ok(()) => Ok(true),
            Err(RpcError::ObjectNotFound) => Err(AdminError::NodeNotFound(name.to_string())),
            Err(RpcError::Remote(AdminError::NodeUnreachable { .. })) => Ok(false),
            Err(RpcError::Remote(other)) => Err(other),
            Err(_) => Ok(false),
        }
    }

    /// Returns a node's load averages.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` or `NodeUnreachable`, classified.
    pub async fn node_load(&self, name: &str) -> Result<LoadInfo, AdminError> {
        let entry = self.catalog.node_entry(name)?;
        entry
            .endpoint
            .load()
            .await
            .map_err(|err| classify::classify_node(name, err))
    }

    /// Shuts down a node agent.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` or `NodeUnreachable`, classified.
    pub async fn shutdown_node(&self, name: &str) -> Result<(), AdminError> {
        let entry = self.catalog.node_entry(name)?;
        entry
            .endpoint
            .shutdown()
            .await
            .map_err(|err| classify::classify_node(name, err))
    }

    /// All node names, sorted.
    #[must_use]
    pub fn node_names(&self) -> Vec<String> {
        self.catalog.node_names()
    }

    // ----- registries -----------------------------------------------------

    /// Returns a registry instance's record, local or replica.
    ///
    /// # Errors
    ///
    /// `RegistryNotFound` if no such instance exists.
    pub fn registry_info(&self, name: &str) -> Result<RegistryInfo, AdminError> {
        if name == self.registry.name() {
            return Ok(self.registry.info());
        }
        Ok(self.catalog.replica_entry(name)?.info)
    }

    /// Pings a registry instance. The local instance is trivially
    /// reachable.
    ///
    /// # Errors
    ///
    /// `RegistryNotFound` if the replica record, or its remote object, no
    /// longer exists.
    pub async fn ping_registry(&self, name: &str) -> Result<bool, AdminError> {
        if name == self.registry.name() {
            return Ok(true);
        }
        let entry = self.catalog.replica_entry(name)?;
        match entry.endpoint.ping().await {
            Ok(()) => Ok(true),
            Err(RpcError::ObjectNotFound) => {
                Err(AdminError::RegistryNotFound(name.to_string()))
            }
            Err(RpcError::Remote(other)) => Err(other),
            Err(_) => Ok(false),
        }
    }

    /// Shuts down a registry instance, local or replica.
    ///
    /// # Errors
    ///
    /// `RegistryNotFound` or `RegistryUnreachable`, classified.
    pub async fn shutdown_registry(&self, name: &str) -> Result<(), AdminError> {
        if name == self.registry.name() {
            self.registry.shutdown();
            return Ok(());
        }
        let entry = self.catalog.replica_entry(name)?;
        entry
            .endpoint
            .shutdown()
            .await
            .map_err(|err| classify::classify_replica(name, err))
    }

    /// All registry instance names: the replicas plus the local instance.
    #[must_use]
    pub fn registry_names(&self) -> Vec<String> {
        let mut names = self.catalog.replica_names();
        names.push(self.registry.name());
        names
    }

    /// Shuts down the local registry instance.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}

impl Drop for AdminService {
    fn drop(&mut self) {
        self.callbacks.teardown_all();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
