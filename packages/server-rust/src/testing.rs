//! Shared test doubles: scripted endpoints, a fake local registry, and a
//! wired-up facade harness.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fleetgrid_core::{
    ApplicationDescriptor, ApplicationInfo, DistributionDescriptor, LoadInfo, NodeDescriptor,
    NodeInfo, PatchReport, PatchRequest, RegistryInfo, ServerDescriptor, ServerInfo, ServerState,
};

use crate::admin::{AdminConfig, AdminService, CallbackRegistry};
use crate::catalog::{DescriptorResolver, LocalRegistry, MemoryCatalog};
use crate::transport::{NodeEndpoint, ReplicaEndpoint, RpcError, ServerEndpoint};

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub(crate) fn node_info(name: &str) -> NodeInfo {
    NodeInfo {
        name: name.to_string(),
        os: "Linux".to_string(),
        hostname: format!("{name}.example"),
        release: "6.1.0".to_string(),
        machine: "x86_64".to_string(),
        n_processors: 8,
        data_dir: format!("/var/lib/fleetgrid/{name}"),
    }
}

pub(crate) fn server_descriptor(id: &str) -> ServerDescriptor {
    ServerDescriptor {
        id: id.to_string(),
        exe: "/opt/app/bin/server".to_string(),
        activation_timeout_s: 30,
        deactivation_timeout_s: 60,
    }
}

pub(crate) fn server_info(id: &str, application: &str, node: &str) -> ServerInfo {
    ServerInfo {
        application: application.to_string(),
        node: node.to_string(),
        descriptor: server_descriptor(id),
    }
}

/// An application record whose descriptor deploys one server per listed
/// node and carries a non-empty distribution.
pub(crate) fn application_info(name: &str, nodes: &[&str]) -> ApplicationInfo {
    let mut descriptor = ApplicationDescriptor {
        name: name.to_string(),
        distribution: DistributionDescriptor {
            source: "grid.dist:default -p 12000".to_string(),
            directories: vec!["lib".to_string()],
        },
        ..ApplicationDescriptor::default()
    };
    for node in nodes {
        descriptor.nodes.insert(
            (*node).to_string(),
            NodeDescriptor {
                servers: vec![server_descriptor(&format!("{name}-{node}"))],
                variables: std::collections::BTreeMap::new(),
            },
        );
    }
    ApplicationInfo {
        uuid: format!("uuid-{name}"),
        create_time: 1_700_000_000_000,
        create_user: "seed".to_string(),
        update_time: 1_700_000_000_000,
        update_user: "seed".to_string(),
        revision: 1,
        descriptor,
    }
}

// ---------------------------------------------------------------------------
// FakeServerEndpoint
// ---------------------------------------------------------------------------

/// Scripted server endpoint. Every invocation optionally sleeps (to drive
/// timeout paths) and optionally fails with a scripted `RpcError`.
pub(crate) struct FakeServerEndpoint {
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    state: Mutex<ServerState>,
    pid: Mutex<i32>,
    enabled: Mutex<bool>,
    signals: Mutex<Vec<String>>,
    messages: Mutex<Vec<(String, i32)>>,
    fail: Mutex<Option<RpcError>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeServerEndpoint {
    pub(crate) fn new() -> Self {
        Self {
            start_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            state: Mutex::new(ServerState::Inactive),
            pid: Mutex::new(0),
            enabled: Mutex::new(true),
            signals: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
            delay: Mutex::new(None),
        }
    }

    pub(crate) fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_state(&self, state: ServerState) {
        *self.state.lock() = state;
    }

    pub(crate) fn set_pid(&self, pid: i32) {
        *self.pid.lock() = pid;
    }

    pub(crate) fn fail_with(&self, err: RpcError) {
        *self.fail.lock() = Some(err);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn signals(&self) -> Vec<String> {
        self.signals.lock().clone()
    }

    pub(crate) fn messages(&self) -> Vec<(String, i32)> {
        self.messages.lock().clone()
    }

    async fn run<T>(&self, value: T) -> Result<T, RpcError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail.lock().clone() {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl ServerEndpoint for FakeServerEndpoint {
    async fn start(&self) -> Result<(), RpcError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.run(()).await
    }

    async fn stop(&self) -> Result<(), RpcError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.run(()).await
    }

    async fn send_signal(&self, signal: &str) -> Result<(), RpcError> {
        self.signals.lock().push(signal.to_string());
        self.run(()).await
    }

    async fn write_message(&self, message: &str, fd: i32) -> Result<(), RpcError> {
        self.messages.lock().push((message.to_string(), fd));
        self.run(()).await
    }

    async fn set_enabled(&self, enabled: bool) -> Result<(), RpcError> {
        *self.enabled.lock() = enabled;
        self.run(()).await
    }

    async fn is_enabled(&self) -> Result<bool, RpcError> {
        let enabled = *self.enabled.lock();
        self.run(enabled).await
    }

    async fn state(&self) -> Result<ServerState, RpcError> {
        let state = *self.state.lock();
        self.run(state).await
    }

    async fn pid(&self) -> Result<i32, RpcError> {
        let pid = *self.pid.lock();
        self.run(pid).await
    }
}

// ---------------------------------------------------------------------------
// FakeNodeEndpoint
// ---------------------------------------------------------------------------

/// How a scripted node reacts to a patch dispatch.
#[derive(Clone)]
pub(crate) enum PatchScript {
    /// Accept the dispatch and immediately report success.
    Finish,
    /// Accept the dispatch and immediately report failure with this reason.
    Fail(String),
    /// Refuse the dispatch itself.
    Reject(RpcError),
    /// Accept the dispatch and never report.
    Silent,
}

/// Scripted node agent endpoint that reports patch outcomes back through
/// the facade's callback registry, the way a real node calls back in.
pub(crate) struct FakeNodeEndpoint {
    name: String,
    callbacks: Arc<CallbackRegistry>,
    script: PatchScript,
    patch_calls: AtomicU32,
    requests: Mutex<Vec<PatchRequest>>,
    ping_result: Mutex<Result<(), RpcError>>,
    load_result: Mutex<Result<LoadInfo, RpcError>>,
    shutdown_result: Mutex<Result<(), RpcError>>,
}

impl FakeNodeEndpoint {
    fn with_script(name: &str, callbacks: &Arc<CallbackRegistry>, script: PatchScript) -> Self {
        Self {
            name: name.to_string(),
            callbacks: Arc::clone(callbacks),
            script,
            patch_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            ping_result: Mutex::new(Ok(())),
            load_result: Mutex::new(Ok(LoadInfo::default())),
            shutdown_result: Mutex::new(Ok(())),
        }
    }

    pub(crate) fn finishing(name: &str, callbacks: &Arc<CallbackRegistry>) -> Self {
        Self::with_script(name, callbacks, PatchScript::Finish)
    }

    pub(crate) fn failing(name: &str, callbacks: &Arc<CallbackRegistry>, reason: &str) -> Self {
        Self::with_script(name, callbacks, PatchScript::Fail(reason.to_string()))
    }

    pub(crate) fn rejecting(name: &str, callbacks: &Arc<CallbackRegistry>, err: RpcError) -> Self {
        Self::with_script(name, callbacks, PatchScript::Reject(err))
    }

    pub(crate) fn silent(name: &str, callbacks: &Arc<CallbackRegistry>) -> Self {
        Self::with_script(name, callbacks, PatchScript::Silent)
    }

    pub(crate) fn patch_calls(&self) -> u32 {
        self.patch_calls.load(Ordering::SeqCst)
    }

    /// Requests accepted so far, in dispatch order.
    pub(crate) fn requests(&self) -> Vec<PatchRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn set_ping_result(&self, result: Result<(), RpcError>) {
        *self.ping_result.lock() = result;
    }

    pub(crate) fn set_load_result(&self, result: Result<LoadInfo, RpcError>) {
        *self.load_result.lock() = result;
    }
}

#[async_trait]
impl NodeEndpoint for FakeNodeEndpoint {
    async fn ping(&self) -> Result<(), RpcError> {
        self.ping_result.lock().clone()
    }

    async fn load(&self) -> Result<LoadInfo, RpcError> {
        self.load_result.lock().clone()
    }

    async fn shutdown(&self) -> Result<(), RpcError> {
        self.shutdown_result.lock().clone()
    }

    async fn patch(&self, request: PatchRequest) -> Result<(), RpcError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.clone() {
            PatchScript::Reject(err) => Err(err),
            _ => self.accept(request),
        }
    }
}

impl FakeNodeEndpoint {
    fn accept(&self, request: PatchRequest) -> Result<(), RpcError> {
        let callback_id = request.callback_id.clone();
        self.requests.lock().push(request);
        match self.script.clone() {
            PatchScript::Reject(_) => unreachable!("rejecting scripts never accept"),
            PatchScript::Silent => Ok(()),
            PatchScript::Finish => {
                self.callbacks.dispatch(
                    &callback_id,
                    PatchReport::Finished {
                        node: self.name.clone(),
                    },
                );
                Ok(())
            }
            PatchScript::Fail(reason) => {
                self.callbacks.dispatch(
                    &callback_id,
                    PatchReport::Failed {
                        node: self.name.clone(),
                        reason,
                    },
                );
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FakeReplicaEndpoint
// ---------------------------------------------------------------------------

pub(crate) struct FakeReplicaEndpoint {
    ping_result: Mutex<Result<(), RpcError>>,
    shutdown_result: Mutex<Result<(), RpcError>>,
}

impl FakeReplicaEndpoint {
    pub(crate) fn new() -> Self {
        Self {
            ping_result: Mutex::new(Ok(())),
            shutdown_result: Mutex::new(Ok(())),
        }
    }

    pub(crate) fn set_ping_result(&self, result: Result<(), RpcError>) {
        *self.ping_result.lock() = result;
    }

    pub(crate) fn set_shutdown_result(&self, result: Result<(), RpcError>) {
        *self.shutdown_result.lock() = result;
    }
}

#[async_trait]
impl ReplicaEndpoint for FakeReplicaEndpoint {
    async fn ping(&self) -> Result<(), RpcError> {
        self.ping_result.lock().clone()
    }

    async fn shutdown(&self) -> Result<(), RpcError> {
        self.shutdown_result.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// FakeLocalRegistry
// ---------------------------------------------------------------------------

pub(crate) struct FakeLocalRegistry {
    name: String,
    shutdown_calls: AtomicU32,
}

impl FakeLocalRegistry {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shutdown_calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn shutdown_calls(&self) -> u32 {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

impl LocalRegistry for FakeLocalRegistry {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn info(&self) -> RegistryInfo {
        RegistryInfo {
            name: self.name.clone(),
            hostname: format!("{}.local", self.name),
        }
    }

    fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A facade wired to an in-memory catalog, a fake local registry named
/// `FleetGrid`, and the descriptor-driven resolver.
pub(crate) struct Harness {
    pub(crate) catalog: Arc<MemoryCatalog>,
    pub(crate) registry: Arc<FakeLocalRegistry>,
    pub(crate) service: AdminService,
}

impl Harness {
    pub(crate) fn new(session_user: &str) -> Self {
        Self::with_config(AdminConfig {
            session_user: session_user.to_string(),
            default_descriptor: None,
        })
    }

    pub(crate) fn with_config(config: AdminConfig) -> Self {
        let catalog = Arc::new(MemoryCatalog::new("FleetGrid"));
        let registry = Arc::new(FakeLocalRegistry::new("FleetGrid"));
        let service = AdminService::new(
            catalog.clone(),
            registry.clone(),
            Arc::new(DescriptorResolver),
            config,
        );
        Self {
            catalog,
            registry,
            service,
        }
    }

    fn add_node(&self, endpoint: FakeNodeEndpoint) -> Arc<FakeNodeEndpoint> {
        let info = node_info(&endpoint.name);
        let endpoint = Arc::new(endpoint);
        let shared: Arc<dyn NodeEndpoint> = endpoint.clone();
        self.catalog.add_node(info, shared);
        endpoint
    }

    pub(crate) fn add_finishing_node(&self, name: &str) -> Arc<FakeNodeEndpoint> {
        self.add_node(FakeNodeEndpoint::finishing(name, &self.service.callbacks()))
    }

    pub(crate) fn add_failing_node(&self, name: &str, reason: &str) -> Arc<FakeNodeEndpoint> {
        self.add_node(FakeNodeEndpoint::failing(
            name,
            &self.service.callbacks(),
            reason,
        ))
    }

    pub(crate) fn add_rejecting_node(&self, name: &str, err: RpcError) -> Arc<FakeNodeEndpoint> {
        self.add_node(FakeNodeEndpoint::rejecting(
            name,
            &self.service.callbacks(),
            err,
        ))
    }

    pub(crate) fn add_silent_node(&self, name: &str) -> Arc<FakeNodeEndpoint> {
        self.add_node(FakeNodeEndpoint::silent(name, &self.service.callbacks()))
    }
}
