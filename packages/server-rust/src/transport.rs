//! Remote endpoint seams and the transport failure set.
//!
//! The control plane never talks to a wire directly; it invokes these
//! traits, and every invocation returns a typed `RpcError` on failure.
//! Classification into domain errors (`admin::classify`) consumes the
//! closed variant set by matching, so callers never inspect transport
//! internals.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use fleetgrid_core::{LoadInfo, PatchRequest, ServerState};

use crate::admin::AdminError;

// ---------------------------------------------------------------------------
// RpcError
// ---------------------------------------------------------------------------

/// Failure of a single remote invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The remote object no longer exists at the endpoint.
    #[error("remote object no longer exists")]
    ObjectNotFound,

    /// The invocation did not complete within its budget.
    #[error("invocation timed out after {0:?}")]
    Timeout(Duration),

    /// Any other local or transport failure, stringified.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A domain failure raised by the remote peer itself. Classification
    /// propagates these unchanged.
    #[error(transparent)]
    Remote(#[from] AdminError),
}

// ---------------------------------------------------------------------------
// Endpoint traits
// ---------------------------------------------------------------------------

/// Remote control surface of one managed server process.
#[async_trait]
pub trait ServerEndpoint: Send + Sync {
    async fn start(&self) -> Result<(), RpcError>;
    async fn stop(&self) -> Result<(), RpcError>;
    async fn send_signal(&self, signal: &str) -> Result<(), RpcError>;
    async fn write_message(&self, message: &str, fd: i32) -> Result<(), RpcError>;
    async fn set_enabled(&self, enabled: bool) -> Result<(), RpcError>;
    async fn is_enabled(&self) -> Result<bool, RpcError>;
    async fn state(&self) -> Result<ServerState, RpcError>;
    async fn pid(&self) -> Result<i32, RpcError>;
}

/// Remote control surface of a worker node's agent.
#[async_trait]
pub trait NodeEndpoint: Send + Sync {
    async fn ping(&self) -> Result<(), RpcError>;
    async fn load(&self) -> Result<LoadInfo, RpcError>;
    async fn shutdown(&self) -> Result<(), RpcError>;

    /// Triggers an asynchronous distribution sync on the node. The node
    /// later reports the outcome to the callback endpoint named in the
    /// request; a successful return only means the sync was accepted.
    async fn patch(&self, request: PatchRequest) -> Result<(), RpcError>;
}

/// Remote control surface of a registry replica.
#[async_trait]
pub trait ReplicaEndpoint: Send + Sync {
    async fn ping(&self) -> Result<(), RpcError>;
    async fn shutdown(&self) -> Result<(), RpcError>;
}
