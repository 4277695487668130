//! Callback endpoint registry.
//!
//! Maps the callback identity published for each patch job to the live
//! job, so completion reports arriving from remote nodes can be routed
//! to it. The facade registers a job before dispatching and the job
//! unregisters itself at finalize; `teardown_all` is the facade-shutdown
//! drain that abandons whatever is still pending.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use fleetgrid_core::PatchReport;

use super::patch::PatchJob;

/// Thread-safe registry of live callback endpoints.
///
/// Safe under concurrent register/unregister from the dispatch path and
/// from whichever task processes each job's final report.
pub struct CallbackRegistry {
    entries: DashMap<String, Arc<PatchJob>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Publishes a job's callback identity, making it routable.
    pub fn register(&self, job: Arc<PatchJob>) {
        self.entries.insert(job.id().to_string(), job);
    }

    /// Removes a callback identity. Unregistering an absent id is not an
    /// error.
    pub fn unregister(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Returns `true` if the identity is currently registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of currently registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no identities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routes a remote completion report to its job.
    ///
    /// Reports for unknown identities are dropped: the job may already
    /// have finalized, or the report may be a stale duplicate.
    pub fn dispatch(&self, id: &str, report: PatchReport) {
        let Some(job) = self.entries.get(id).map(|entry| Arc::clone(entry.value())) else {
            debug!(
                target: "patch",
                callback_id = id,
                node = report.node(),
                "dropping report for unknown callback endpoint"
            );
            return;
        };
        match report {
            PatchReport::Finished { node } => job.report_success(&node),
            PatchReport::Failed { node, reason } => job.report_failure(&node, &reason),
        }
    }

    /// Drains the registry at facade shutdown, abandoning still-pending
    /// jobs so their callers are never left unresolved. Best-effort
    /// cleanup: never fails.
    pub fn teardown_all(&self) {
        let ids: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, job)) = self.entries.remove(&id) {
                job.abandon();
            }
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
