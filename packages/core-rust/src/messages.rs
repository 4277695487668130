//! Patch wire payloads.
//!
//! `PatchRequest` is what the control plane hands a node agent to start a
//! distribution sync; `PatchReport` is the callback contract the node later
//! invokes against the control plane's published callback endpoint. Reports
//! are internally tagged on `"type"` like the rest of the cluster protocol.

use serde::{Deserialize, Serialize};

use crate::descriptor::DistributionDescriptor;

/// A distribution operation dispatched to a single node agent.
///
/// The node fetches the distribution and later reports the outcome to the
/// callback endpoint identified by `callback_id` — any number of times,
/// from any thread; the control plane tolerates stale reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRequest {
    /// Identity of the callback endpoint to report completion to.
    pub callback_id: String,
    /// Application being patched.
    pub application: String,
    /// Specific server being patched; `None` patches the whole application.
    pub server: Option<String>,
    /// Variable-resolved distribution for this node.
    pub distribution: DistributionDescriptor,
    /// Whether servers using the distribution are shut down before syncing.
    pub shutdown: bool,
}

/// Completion report for one node's share of a distribution operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchReport {
    /// The node finished syncing its distribution.
    Finished {
        /// Reporting node.
        node: String,
    },
    /// The node could not sync its distribution.
    Failed {
        /// Reporting node.
        node: String,
        /// Human-readable failure description from the node agent.
        reason: String,
    },
}

impl PatchReport {
    /// Returns the reporting node's name.
    #[must_use]
    pub fn node(&self) -> &str {
        match self {
            Self::Finished { node } | Self::Failed { node, .. } => node,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
