//! Per-call proxy to a managed server.
//!
//! Resolved fresh for every administrative call: the catalog yields the
//! server's current endpoint, hosting node, and the two timeout profiles
//! its descriptor allows. A profile must be selected before each
//! timeout-sensitive invocation; starting a server uses the activation
//! profile, stopping uses the deactivation profile.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fleetgrid_core::ServerState;

use crate::catalog::Catalog;
use crate::transport::{RpcError, ServerEndpoint};

use super::classify;
use super::error::AdminError;

/// Ephemeral handle to one managed server, valid for one administrative
/// call. Not persisted; recompute by resolving again.
pub struct ServerProxy {
    id: String,
    node: String,
    endpoint: Arc<dyn ServerEndpoint>,
    activation: Duration,
    deactivation: Duration,
    /// Budget applied to the next invocation; none until a profile is
    /// selected.
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for ServerProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerProxy")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("activation", &self.activation)
            .field("deactivation", &self.deactivation)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl ServerProxy {
    /// Resolves the server's current endpoint through the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ServerNotFound` if no server with this id exists.
    pub fn resolve(catalog: &dyn Catalog, id: &str) -> Result<Self, AdminError> {
        let resolved = catalog.resolve_server(id)?;
        Ok(Self {
            id: id.to_string(),
            node: resolved.node,
            endpoint: resolved.endpoint,
            activation: resolved.activation_timeout,
            deactivation: resolved.deactivation_timeout,
            call_timeout: None,
        })
    }

    /// Node the server is deployed on.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Binds the next invocation to the server's activation budget.
    pub fn use_activation_timeout(&mut self) {
        self.call_timeout = Some(self.activation);
    }

    /// Binds the next invocation to the server's deactivation budget.
    pub fn use_deactivation_timeout(&mut self) {
        self.call_timeout = Some(self.deactivation);
    }

    /// Runs one invocation under the currently selected budget, if any.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, RpcError> {
        match self.call_timeout {
            Some(budget) => match tokio::time::timeout(budget, fut).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout(budget)),
            },
            None => fut.await,
        }
    }

    fn classify(&self, err: RpcError) -> AdminError {
        classify::classify_server(&self.id, &self.node, err)
    }

    /// Starts the server process.
    ///
    /// # Errors
    ///
    /// Classified per `classify_server`; an activation timeout surfaces as
    /// the node being unreachable.
    pub async fn start(&self) -> Result<(), AdminError> {
        self.call(self.endpoint.start())
            .await
            .map_err(|err| self.classify(err))
    }

    /// Stops the server process.
    ///
    /// A transport timeout is swallowed: deactivation is allowed to exceed
    /// its budget without being a caller-visible error.
    ///
    /// # Errors
    ///
    /// Any non-timeout failure, classified per `classify_server`.
    pub async fn stop(&self) -> Result<(), AdminError> {
        match self.call(self.endpoint.stop()).await {
            Ok(()) | Err(RpcError::Timeout(_)) => Ok(()),
            Err(err) => Err(self.classify(err)),
        }
    }

    /// Delivers a signal to the server process.
    pub async fn send_signal(&self, signal: &str) -> Result<(), AdminError> {
        self.call(self.endpoint.send_signal(signal))
            .await
            .map_err(|err| self.classify(err))
    }

    /// Writes a message to the server process's stdout or stderr.
    pub async fn write_message(&self, message: &str, fd: i32) -> Result<(), AdminError> {
        self.call(self.endpoint.write_message(message, fd))
            .await
            .map_err(|err| self.classify(err))
    }

    /// Enables or disables the server for on-demand activation.
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), AdminError> {
        self.call(self.endpoint.set_enabled(enabled))
            .await
            .map_err(|err| self.classify(err))
    }

    /// Returns whether the server is enabled.
    pub async fn is_enabled(&self) -> Result<bool, AdminError> {
        self.call(self.endpoint.is_enabled())
            .await
            .map_err(|err| self.classify(err))
    }

    /// Returns the server's current lifecycle state.
    pub async fn state(&self) -> Result<ServerState, AdminError> {
        self.call(self.endpoint.state())
            .await
            .map_err(|err| self.classify(err))
    }

    /// Returns the server process id, or 0 when inactive.
    pub async fn pid(&self) -> Result<i32, AdminError> {
        self.call(self.endpoint.pid())
            .await
            .map_err(|err| self.classify(err))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
