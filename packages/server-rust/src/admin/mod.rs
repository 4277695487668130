//! Administrative control plane.
//!
//! Provides the operator-facing facade (`AdminService`), the patch
//! fan-out/fan-in machinery (`PatchJob` + `CallbackRegistry`), per-call
//! server proxy resolution (`ServerProxy`), and transport failure
//! classification.

pub mod callbacks;
pub mod classify;
pub mod config;
pub mod error;
pub mod patch;
pub mod proxy;
pub mod service;

// ---------------------------------------------------------------------------
// Re-exports — flat public API
// ---------------------------------------------------------------------------

pub use callbacks::CallbackRegistry;
pub use classify::{classify_node, classify_replica, classify_server};
pub use config::AdminConfig;
pub use error::AdminError;
pub use patch::{PatchJob, PatchOutcome};
pub use proxy::ServerProxy;
pub use service::AdminService;

// ---------------------------------------------------------------------------
// Integration tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;

    use fleetgrid_core::PatchReport;

    use crate::catalog::Catalog;
    use crate::testing::{application_info, Harness};
    use crate::transport::RpcError;

    use super::*;

    /// Mixed outcome across three nodes: one remote failure, one success,
    /// one dispatch-time rejection. The aggregate carries two sorted
    /// reasons and the success is counted without appearing in them.
    #[tokio::test]
    async fn three_node_patch_aggregates_mixed_outcomes() {
        let harness = Harness::new("ops");
        harness
            .catalog
            .add_application(application_info(
                "billing",
                &["node-a", "node-b", "node-c"],
            ))
            .unwrap();
        let node_a = harness.add_failing_node("node-a", "disk full");
        let node_b = harness.add_finishing_node("node-b");
        let node_c = harness.add_rejecting_node(
            "node-c",
            RpcError::Transport("connection refused".to_string()),
        );

        let err = harness
            .service
            .patch_application("billing", false)
            .await
            .unwrap_err();

        let AdminError::PatchFailed { reasons } = err else {
            panic!("expected aggregate failure");
        };
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].starts_with("patch on node `node-a` failed:"));
        assert!(reasons[0].contains("disk full"));
        assert!(reasons[1].starts_with("patch on node `node-c` failed:"));
        assert!(reasons[1].contains("connection refused"));

        // One node's dispatch rejection never aborted the other dispatches.
        assert_eq!(node_a.patch_calls(), 1);
        assert_eq!(node_b.patch_calls(), 1);
        assert_eq!(node_c.patch_calls(), 1);
        assert!(harness.service.callbacks().is_empty());
    }

    /// A node named by the descriptor but absent from the catalog folds in
    /// as "node doesn't exist" while the remaining node is still patched.
    #[tokio::test]
    async fn unregistered_node_folds_into_aggregate() {
        let harness = Harness::new("ops");
        harness
            .catalog
            .add_application(application_info("billing", &["node-a", "node-b"]))
            .unwrap();
        // Only node-b exists.
        let node_b = harness.add_finishing_node("node-b");

        let err = harness
            .service
            .patch_application("billing", false)
            .await
            .unwrap_err();

        let AdminError::PatchFailed { reasons } = err else {
            panic!("expected aggregate failure");
        };
        assert_eq!(
            reasons,
            vec!["patch on node `node-a` failed:\nnode doesn't exist".to_string()]
        );
        assert_eq!(node_b.patch_calls(), 1);
    }

    /// The payload handed to each node is variable-resolved for that node
    /// and names the job's callback endpoint.
    #[tokio::test]
    async fn dispatched_request_is_resolved_per_node() {
        let harness = Harness::new("ops");
        let mut info = application_info("billing", &["node-a"]);
        info.descriptor.distribution.directories = vec!["${node.datadir}/lib".to_string()];
        harness.catalog.add_application(info).unwrap();
        let node_a = harness.add_finishing_node("node-a");

        harness
            .service
            .patch_application("billing", true)
            .await
            .unwrap();

        let requests = node_a.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].application, "billing");
        assert_eq!(requests[0].server, None);
        assert!(requests[0].shutdown);
        assert!(!requests[0].callback_id.is_empty());
        assert_eq!(
            requests[0].distribution.directories,
            vec!["/var/lib/fleetgrid/node-a/lib".to_string()]
        );
    }

    /// Reports arriving later, from outside the dispatch call stack,
    /// resolve the parked caller exactly as synchronous ones do.
    #[tokio::test]
    async fn late_remote_report_resolves_parked_caller() {
        let harness = Harness::new("ops");
        harness
            .catalog
            .add_application(application_info("billing", &["node-a"]))
            .unwrap();
        let node_a = harness.add_silent_node("node-a");
        let callbacks = harness.service.callbacks();

        let service = Arc::new(harness.service);
        let patching = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.patch_application("billing", false).await })
        };
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let requests = node_a.requests();
        assert_eq!(requests.len(), 1, "dispatch must have reached the node");
        callbacks.dispatch(
            &requests[0].callback_id,
            PatchReport::Finished {
                node: "node-a".to_string(),
            },
        );

        patching.await.unwrap().unwrap();
        assert!(callbacks.is_empty());
    }

    /// Process-control calls route through the per-call proxy to the
    /// server's endpoint.
    #[tokio::test]
    async fn server_process_controls_reach_the_endpoint() {
        let harness = Harness::new("ops");
        let endpoint = Arc::new(crate::testing::FakeServerEndpoint::new());
        let shared: Arc<dyn crate::transport::ServerEndpoint> = endpoint.clone();
        harness.catalog.add_server(
            crate::testing::server_info("billing-1", "billing", "node-1"),
            shared,
        );

        harness
            .service
            .send_signal("billing-1", "SIGHUP")
            .await
            .unwrap();
        assert_eq!(endpoint.signals(), vec!["SIGHUP".to_string()]);

        harness
            .service
            .write_message("billing-1", "rotating logs", 1)
            .await
            .unwrap();
        assert_eq!(
            endpoint.messages(),
            vec![("rotating logs".to_string(), 1)]
        );

        harness
            .service
            .enable_server("billing-1", false)
            .await
            .unwrap();
        assert!(!harness.service.is_server_enabled("billing-1").await.unwrap());
    }
}
