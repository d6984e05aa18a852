//! Unit tests for the Workspace reconciler

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    use cluster_client::{ClusterClientTrait, MockClusterClient};
    use crds::Protocol;

    use crate::error::ControllerError;
    use crate::ports::{PortMap, NODE_PORT_MAX, NODE_PORT_MIN};
    use crate::reconciler::workspace::{generate_tunnel, generate_unit};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_reconcile_creates_unit_and_tunnel() {
        let client = MockClusterClient::new();
        let ports = Arc::new(PortMap::new());
        let reconciler = create_test_reconciler(&client, ports.clone());

        client.add_workspace(create_test_workspace("bench1", "default", true, 7));

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        let unit = client.get_unit("default", "bench1").await.unwrap();
        assert!(unit.spec.gpu_policy.gpu);
        assert_eq!(unit.spec.gpu_policy.number, 1);
        assert_eq!(unit.spec.framework.name, "tensorflow");
        assert_eq!(unit.spec.framework.version, "2.4");
        assert_eq!(unit.spec.resources.cpu, "1");
        assert_eq!(unit.spec.resources.memory, "2Gi");
        assert_eq!(unit.spec.lifecycle.days, 7);
        assert!(unit.spec.execution.ssh);

        let tunnel = client.get_tunnel("default", "bench1").await.unwrap();
        assert_eq!(tunnel.spec.unit_id, "default.bench1");
        assert_eq!(tunnel.spec.ports.len(), 1);
        assert_eq!(tunnel.spec.ports[0].container_port, 22);
        assert_eq!(tunnel.spec.ports[0].node_port, NODE_PORT_MIN);
        assert!(ports.is_used(NODE_PORT_MIN));

        let workspace = client.get_workspace("default", "bench1").await.unwrap();
        assert_eq!(workspace.status.unwrap().node_port, Some(NODE_PORT_MIN));
    }

    #[tokio::test]
    async fn test_reconcile_absent_workspace_removes_children() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        client.add_unit(create_test_unit("bench1", "default", 7, false));
        client.add_tunnel(create_test_tunnel("bench1", "default", 30000));

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        assert!(client.get_unit("default", "bench1").await.unwrap_err().is_not_found());
        assert!(client.get_tunnel("default", "bench1").await.unwrap_err().is_not_found());
        assert_eq!(client.write_counts().deletes, 2);
    }

    #[tokio::test]
    async fn test_reconcile_terminating_workspace_removes_children() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut workspace = create_test_workspace("bench1", "default", false, 7);
        workspace.metadata.deletion_timestamp = Some(Time(Utc::now()));
        client.add_workspace(workspace);
        client.add_unit(create_test_unit("bench1", "default", 7, false));
        client.add_tunnel(create_test_tunnel("bench1", "default", 30000));

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        assert!(client.get_unit("default", "bench1").await.unwrap_err().is_not_found());
        assert!(client.get_tunnel("default", "bench1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_second_reconcile_performs_no_writes() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        client.add_workspace(create_test_workspace("bench1", "default", false, 7));
        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        client.reset_write_counts();
        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        assert_eq!(client.write_counts().total(), 0);
    }

    #[tokio::test]
    async fn test_allocation_skips_taken_ports() {
        let client = MockClusterClient::new();
        let ports = Arc::new(PortMap::new());
        let reconciler = create_test_reconciler(&client, ports.clone());

        ports.mark_used(30000);
        client.add_workspace(create_test_workspace("bench1", "default", false, 7));

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        let tunnel = client.get_tunnel("default", "bench1").await.unwrap();
        assert_eq!(tunnel.spec.ports[0].node_port, 30001);
    }

    #[tokio::test]
    async fn test_two_workspaces_get_distinct_ports() {
        let client = MockClusterClient::new();
        let ports = Arc::new(PortMap::new());
        let reconciler = create_test_reconciler(&client, ports.clone());

        client.add_workspace(create_test_workspace("bench1", "default", false, 7));
        client.add_workspace(create_test_workspace("bench2", "default", false, 7));

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();
        reconciler.reconcile_workspace("default", "bench2").await.unwrap();

        let first = client.get_tunnel("default", "bench1").await.unwrap();
        let second = client.get_tunnel("default", "bench2").await.unwrap();
        assert_eq!(first.spec.ports[0].node_port, 30000);
        assert_eq!(second.spec.ports[0].node_port, 30001);
    }

    #[tokio::test]
    async fn test_exhausted_pool_aborts_tunnel_branch() {
        let client = MockClusterClient::new();
        let ports = Arc::new(PortMap::new());
        let reconciler = create_test_reconciler(&client, ports.clone());

        for port in NODE_PORT_MIN..NODE_PORT_MAX {
            ports.mark_used(port);
        }
        client.add_workspace(create_test_workspace("bench1", "default", false, 7));

        let err = reconciler
            .reconcile_workspace("default", "bench1")
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::PortPoolExhausted(_)));

        // The unit branch ran before the failure; no tunnel was created and
        // the workspace status stays untouched
        assert!(client.get_unit("default", "bench1").await.is_ok());
        assert!(client.get_tunnel("default", "bench1").await.unwrap_err().is_not_found());
        let workspace = client.get_workspace("default", "bench1").await.unwrap();
        assert!(workspace.status.is_none());
    }

    #[tokio::test]
    async fn test_status_update_preserves_phase() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut workspace = create_test_workspace("bench1", "default", false, 7);
        workspace.status = Some(crds::WorkspaceStatus {
            phase: Some("Pending".to_string()),
            node_port: None,
        });
        client.add_workspace(workspace);

        reconciler.reconcile_workspace("default", "bench1").await.unwrap();

        let status = client
            .get_workspace("default", "bench1")
            .await
            .unwrap()
            .status
            .unwrap();
        assert_eq!(status.phase.as_deref(), Some("Pending"));
        assert_eq!(status.node_port, Some(30000));
    }

    #[test]
    fn test_generate_unit_carries_workspace_spec() {
        let workspace = create_test_workspace("bench1", "default", true, 30);
        let unit = generate_unit(&workspace);

        assert_eq!(unit.metadata.name.as_deref(), Some("bench1"));
        assert_eq!(unit.metadata.namespace.as_deref(), Some("default"));
        assert!(unit.spec.gpu_policy.gpu);
        assert_eq!(unit.spec.lifecycle.days, 30);
        assert!(!unit.spec.lifecycle.forever);
        assert!(unit.spec.ports.is_empty());
        assert!(unit.spec.execution.ssh);
    }

    #[test]
    fn test_generate_tunnel_exposes_ssh() {
        let workspace = create_test_workspace("bench1", "team-a", false, 7);
        let tunnel = generate_tunnel(&workspace, 30042);

        assert_eq!(tunnel.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(tunnel.spec.unit_id, "team-a.bench1");
        assert_eq!(tunnel.spec.ports.len(), 1);
        assert_eq!(tunnel.spec.ports[0].name.as_deref(), Some("ssh"));
        assert_eq!(tunnel.spec.ports[0].protocol, Protocol::Tcp);
        assert_eq!(tunnel.spec.ports[0].container_port, 22);
        assert_eq!(tunnel.spec.ports[0].node_port, 30042);
    }
}
