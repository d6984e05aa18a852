//! Unit tests for the Unit reconciler and Pod derivation

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    use cluster_client::{ClusterClientTrait, MockClusterClient};
    use crds::{GpuPolicy, PortSpec, Protocol, GPU_MODEL_LABEL, MANAGED_LABEL, UNIT_ID_LABEL};

    use crate::ports::PortMap;
    use crate::reconciler::unit::DEFAULT_GPU_MODEL;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_reconcile_creates_pod() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        client.add_unit(create_test_unit("u1", "default", 7, false));

        reconciler.reconcile_unit("default", "u1").await.unwrap();

        let pod = client.get_pod("default", "u1").await.unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("u1"));

        // A second pass finds the pod and does nothing
        client.reset_write_counts();
        reconciler.reconcile_unit("default", "u1").await.unwrap();
        assert_eq!(client.write_counts().total(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_absent_unit_removes_pod() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        client.add_pod(create_test_pod("u1", "default", "Running"));

        reconciler.reconcile_unit("default", "u1").await.unwrap();

        assert!(client.get_pod("default", "u1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reconcile_terminating_unit_removes_pod() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.metadata.deletion_timestamp = Some(Time(Utc::now()));
        client.add_unit(unit);
        client.add_pod(create_test_pod("u1", "default", "Running"));

        reconciler.reconcile_unit("default", "u1").await.unwrap();

        assert!(client.get_pod("default", "u1").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_generate_pod_cpu_unit() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let unit = create_test_unit("u1", "default", 7, false);
        let pod = reconciler.generate_pod(&unit);

        let labels = pod.metadata.labels.unwrap();
        assert_eq!(labels[MANAGED_LABEL], "true");
        assert_eq!(labels[UNIT_ID_LABEL], "default.u1");

        let spec = pod.spec.unwrap();
        assert!(spec.affinity.is_none());
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes[0].name, "u1-vol");
        assert_eq!(
            volumes[0].host_path.as_ref().unwrap().path,
            format!("{}/default", TEST_DATA_ROOT)
        );

        let container = &spec.containers[0];
        assert_eq!(container.name, "u1");
        assert_eq!(
            container.image.as_deref(),
            Some("registry.test/tensorflow-cpu:2.4")
        );

        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits["cpu"].0, "1");
        assert_eq!(limits["memory"].0, "2Gi");
        // GPU limit is forced to zero on a CPU unit, whatever the count says
        assert_eq!(limits["nvidia.com/gpu"].0, "0");

        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].mount_path, "/data");
    }

    #[test]
    fn test_generate_pod_gpu_unit_gets_affinity() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.spec.gpu_policy = GpuPolicy {
            gpu: true,
            model: None,
            number: 2,
        };
        let pod = reconciler.generate_pod(&unit);

        let spec = pod.spec.unwrap();
        let container = &spec.containers[0];
        assert_eq!(
            container.image.as_deref(),
            Some("registry.test/tensorflow-gpu:2.4")
        );

        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits["nvidia.com/gpu"].0, "2");

        let terms = spec
            .affinity
            .unwrap()
            .node_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap()
            .node_selector_terms;
        let requirement = &terms[0].match_expressions.as_ref().unwrap()[0];
        assert_eq!(requirement.key, GPU_MODEL_LABEL);
        assert_eq!(requirement.operator, "In");
        assert_eq!(
            requirement.values.as_ref().unwrap(),
            &vec![DEFAULT_GPU_MODEL.to_string()]
        );
    }

    #[test]
    fn test_generate_pod_honors_requested_gpu_model() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.spec.gpu_policy = GpuPolicy {
            gpu: true,
            model: Some("A100".to_string()),
            number: 1,
        };
        let pod = reconciler.generate_pod(&unit);

        let terms = pod
            .spec
            .unwrap()
            .affinity
            .unwrap()
            .node_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap()
            .node_selector_terms;
        let requirement = &terms[0].match_expressions.as_ref().unwrap()[0];
        assert_eq!(
            requirement.values.as_ref().unwrap(),
            &vec!["A100".to_string()]
        );
    }

    #[test]
    fn test_generate_pod_ssh_owns_entrypoint() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.spec.execution.ssh = true;
        unit.spec.execution.command = vec!["python".to_string()];
        unit.spec.execution.args = vec!["train.py".to_string()];
        let pod = reconciler.generate_pod(&unit);

        let container = &pod.spec.unwrap().containers[0];
        assert!(container.command.is_none());
        assert!(container.args.is_none());

        // No declared ports, so the default SSH port is exposed
        let ports = container.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 22);
        assert_eq!(ports[0].name.as_deref(), Some("ssh"));
    }

    #[test]
    fn test_generate_pod_batch_unit_keeps_command() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.spec.execution.ssh = false;
        unit.spec.execution.command = vec!["python".to_string()];
        unit.spec.execution.args = vec!["train.py".to_string()];
        unit.spec.ports = vec![PortSpec {
            name: Some("jupyter".to_string()),
            container_port: 8888,
            protocol: Protocol::Tcp,
        }];
        let pod = reconciler.generate_pod(&unit);

        let container = &pod.spec.unwrap().containers[0];
        assert_eq!(container.command.as_ref().unwrap(), &vec!["python".to_string()]);
        assert_eq!(container.args.as_ref().unwrap(), &vec!["train.py".to_string()]);

        let ports = container.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 8888);
        assert_eq!(ports[0].name.as_deref(), Some("jupyter"));
    }

    #[test]
    fn test_generate_pod_appends_unbuffered_env() {
        let client = MockClusterClient::new();
        let reconciler = create_test_reconciler(&client, Arc::new(PortMap::new()));

        let mut unit = create_test_unit("u1", "default", 7, false);
        unit.spec.execution.env = vec![crds::EnvVar {
            name: "MODE".to_string(),
            value: "train".to_string(),
        }];
        let pod = reconciler.generate_pod(&unit);

        let env = pod.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env[0].name, "MODE");
        assert_eq!(env[0].value.as_deref(), Some("train"));
        assert_eq!(env[1].name, "PYTHONUNBUFFERED");
        assert_eq!(env[1].value.as_deref(), Some("0"));
    }
}
