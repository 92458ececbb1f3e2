//! Cluster identity persistence through the real state file and config store.

#![allow(clippy::expect_used)]

use ec2_k3s::application::ports::{ClusterStateStore, ConfigStore};
use ec2_k3s::application::services::lifecycle::{claim_cluster, current_cluster};
use ec2_k3s::domain::StateError;
use ec2_k3s::infra::config::YamlConfigStore;
use ec2_k3s::infra::state::StateManager;
use tempfile::TempDir;

fn store(dir: &TempDir) -> StateManager {
    StateManager::with_path(dir.path().join("state.json"))
}

#[tokio::test]
async fn test_claim_cluster_persists_owner_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let first = claim_cluster(&store(&dir), "us-east-1", "alice")
        .await
        .expect("claim");
    // A second process sees the same identity.
    let second = claim_cluster(&store(&dir), "us-east-1", "bob")
        .await
        .expect("claim");
    assert_eq!(first.owner, second.owner);
    assert_eq!(second.owner.user(), "alice");
}

#[tokio::test]
async fn test_claim_cluster_in_other_region_is_refused() {
    let dir = TempDir::new().expect("tempdir");
    claim_cluster(&store(&dir), "us-east-1", "alice")
        .await
        .expect("claim");
    let err = claim_cluster(&store(&dir), "eu-west-1", "alice")
        .await
        .expect_err("expected mismatch");
    assert!(matches!(
        err.downcast_ref::<StateError>(),
        Some(StateError::RegionMismatch { existing }) if existing == "us-east-1"
    ));
}

#[tokio::test]
async fn test_current_cluster_after_clear_is_no_cluster() {
    let dir = TempDir::new().expect("tempdir");
    let state = store(&dir);
    claim_cluster(&state, "us-east-1", "alice").await.expect("claim");
    assert!(current_cluster(&state).await.is_ok());

    state.clear_async().await.expect("clear");
    let err = current_cluster(&state).await.expect_err("expected no cluster");
    assert!(matches!(err.downcast_ref::<StateError>(), Some(StateError::NoCluster)));
}

#[tokio::test]
async fn test_tampered_owner_tag_is_rejected_on_load() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("state.json"),
        r#"{"owner":"alice; rm -rf /","region":"us-east-1","created_at":"2026-01-01T00:00:00Z"}"#,
    )
    .expect("write state");
    assert!(store(&dir).load_async().await.is_err());
}

#[test]
fn test_config_store_reads_camel_case_yaml() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "region: eu-central-1\ninstanceType: t3.small\nsshUser: admin\nnodeReady:\n  intervalSecs: 2\n  timeoutSecs: 60\n",
    )
    .expect("write config");

    let config = YamlConfigStore::new(Some(path)).load().expect("load");
    assert_eq!(config.region.as_deref(), Some("eu-central-1"));
    assert_eq!(config.instance_type, "t3.small");
    assert_eq!(config.ssh_user, "admin");
    assert_eq!(config.node_ready.interval_secs, 2);
    assert_eq!(config.node_ready.timeout_secs, 60);
    // Untouched fields keep their defaults.
    assert_eq!(config.ssh_port, 22);
    assert_eq!(config.reachability.timeout_secs, 180);
}
