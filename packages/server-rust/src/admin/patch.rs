//! Patch fan-out/fan-in state machine.
//!
//! A `PatchJob` tracks one distributed patch operation dispatched to a
//! known number of nodes. Per-node completion reports arrive in arbitrary
//! order on arbitrary tasks; the job aggregates them under its own lock
//! and resolves the caller's completion cell exactly once — either when
//! all expected reports are in, or when the owning facade abandons the
//! job at teardown.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::callbacks::CallbackRegistry;
use super::error::AdminError;

/// Completion result delivered to the original caller.
pub type PatchOutcome = Result<(), AdminError>;

/// Mutable state guarded by the job's lock.
struct JobState {
    succeeded: usize,
    failed: usize,
    reasons: Vec<String>,
    /// Write-once result cell. `take()` under the lock makes finalize and
    /// abandon mutually exclusive.
    completion: Option<oneshot::Sender<PatchOutcome>>,
}

/// One in-flight distributed patch operation.
///
/// Reports are counted, not deduplicated by node identity: the contract is
/// at most one report per dispatched node, but a node that reports twice
/// over-counts and can complete the job early.
pub struct PatchJob {
    id: String,
    /// Target species, `"application"` or `"server"`; trace context only.
    kind: &'static str,
    /// Name of the application or server being patched.
    target: String,
    expected: usize,
    callbacks: Arc<CallbackRegistry>,
    state: Mutex<JobState>,
}

impl PatchJob {
    /// Creates a job expecting `expected` per-node reports and returns it
    /// with the receiving half of its completion cell.
    ///
    /// Callers must short-circuit zero-node operations before constructing
    /// a job; a job that expects no reports would never resolve.
    pub fn new(
        kind: &'static str,
        target: impl Into<String>,
        expected: usize,
        callbacks: Arc<CallbackRegistry>,
    ) -> (Arc<Self>, oneshot::Receiver<PatchOutcome>) {
        debug_assert!(expected >= 1, "zero-node patches must not construct a job");
        let (tx, rx) = oneshot::channel();
        let job = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            kind,
            target: target.into(),
            expected,
            callbacks,
            state: Mutex::new(JobState {
                succeeded: 0,
                failed: 0,
                reasons: Vec::new(),
                completion: Some(tx),
            }),
        });
        (job, rx)
    }

    /// The job's callback-endpoint identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of nodes the operation was dispatched to.
    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Records a successful completion report from `node`.
    pub fn report_success(&self, node: &str) {
        let mut state = self.state.lock();
        debug!(
            target: "patch",
            kind = self.kind,
            name = %self.target,
            node,
            "finished patching"
        );
        state.succeeded += 1;
        self.check_if_done(&mut state);
    }

    /// Records a failure report from `node` with the node's own reason text.
    pub fn report_failure(&self, node: &str, reason: &str) {
        let mut state = self.state.lock();
        debug!(
            target: "patch",
            kind = self.kind,
            name = %self.target,
            node,
            reason,
            "patching failed"
        );
        state.failed += 1;
        state
            .reasons
            .push(format!("patch on node `{node}` failed:\n{reason}"));
        self.check_if_done(&mut state);
    }

    /// Records a failure report from `node` given a classified error.
    ///
    /// This is the path for both remote-reported failures and local
    /// dispatch-time failures: a node that could not even be reached to
    /// start the operation is folded into the aggregate exactly as if it
    /// had reported failure remotely.
    pub fn report_error(&self, node: &str, err: &AdminError) {
        let reason = match err {
            AdminError::NodeNotFound(_) => "node doesn't exist".to_string(),
            AdminError::NodeUnreachable { reason, .. } => {
                format!("node is unreachable: {reason}")
            }
            other => format!("node is unreachable:\n{other}"),
        };
        self.report_failure(node, &reason);
    }

    /// Resolves a still-pending job as failed with a single synthetic
    /// reason. Invoked by the owning facade's teardown; the registry drain
    /// happens there, not here. A no-op on an already-resolved job.
    pub fn abandon(&self) {
        let mut state = self.state.lock();
        if let Some(tx) = state.completion.take() {
            debug!(
                target: "patch",
                kind = self.kind,
                name = %self.target,
                "abandoning patch with pending reports"
            );
            let _ = tx.send(Err(AdminError::PatchFailed {
                reasons: vec!["admin session destroyed".to_string()],
            }));
        }
    }

    /// Finalizes the job once all expected reports are accounted for.
    ///
    /// Runs while holding the job lock. Reasons are sorted lexicographically
    /// so the aggregate is deterministic regardless of arrival order. The
    /// send can fail only if the caller dropped the receiving half; the
    /// result is discarded in that case.
    fn check_if_done(&self, state: &mut JobState) {
        if state.succeeded + state.failed < self.expected {
            return;
        }
        let Some(tx) = state.completion.take() else {
            return;
        };
        let outcome = if state.failed == 0 {
            Ok(())
        } else {
            state.reasons.sort();
            Err(AdminError::PatchFailed {
                reasons: state.reasons.clone(),
            })
        };
        let _ = tx.send(outcome);
        self.callbacks.unregister(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
