//! Cluster lifecycle: bring the single-node k3s cluster up, tear it down.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::fmt;
use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{
    CloudInventory, ClusterStateStore, InfraEngine, InfraSpec, LocalFs, ProgressReporter,
    RemoteShell, ShellConnector,
};
use crate::application::services::bootstrap::{fetch_kubeconfig, install_k3s, probe_node_ready};
use crate::application::services::locator::{locate_instance, resolve_address};
use crate::application::services::readiness::{PollConfig, poll_until_cancelled};
use crate::domain::instance::REACHABILITY_PASSED;
use crate::domain::{ClusterState, InstanceAddress, OwnerTag, PollError, StateError};

/// Where `up` is in its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    WaitingReachable,
    InstalledRuntime,
    ConfigFetched,
    Done,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "creating infrastructure",
            Self::WaitingReachable => "waiting for the instance to become reachable",
            Self::InstalledRuntime => "installing k3s",
            Self::ConfigFetched => "fetching kubeconfig",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Inputs for [`up`].
pub struct UpRequest<'a> {
    pub region: &'a str,
    pub instance_type: &'a str,
    pub owner: &'a OwnerTag,
    pub ssh_public_key_path: &'a Path,
    pub kubeconfig_path: &'a Path,
    pub reachability: PollConfig,
    pub node_ready: PollConfig,
}

/// What a successful [`up`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpOutcome {
    pub instance_id: String,
    pub public_ip: String,
}

fn transition(state: &mut LifecycleState, next: LifecycleState) {
    tracing::debug!(from = ?*state, to = ?next, "lifecycle transition");
    *state = next;
}

/// Bring the cluster up: create the instance, wait until it is reachable,
/// install k3s, and write its kubeconfig locally.
///
/// Each poll gets a fresh future from `cancel`; when it completes the wait
/// is abandoned. Nothing is rolled back on failure.
///
/// # Errors
///
/// Returns the first failure, with context naming the step that failed.
pub async fn up<Cn>(
    infra: &impl InfraEngine,
    inventory: &impl CloudInventory,
    connector: &impl ShellConnector,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    req: &UpRequest<'_>,
    cancel: impl Fn() -> Cn,
) -> Result<UpOutcome>
where
    Cn: Future<Output = ()>,
{
    let mut state = LifecycleState::Created;
    match run_up(&mut state, infra, inventory, connector, fs, reporter, req, &cancel).await {
        Ok(outcome) => {
            transition(&mut state, LifecycleState::Done);
            Ok(outcome)
        }
        Err(e) => {
            let failed_in = state;
            transition(&mut state, LifecycleState::Failed);
            tracing::warn!(step = %failed_in, error = %format!("{e:#}"), "up failed");
            Err(e.context(format!("failed while {failed_in}")))
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_up<Cn>(
    state: &mut LifecycleState,
    infra: &impl InfraEngine,
    inventory: &impl CloudInventory,
    connector: &impl ShellConnector,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    req: &UpRequest<'_>,
    cancel: &impl Fn() -> Cn,
) -> Result<UpOutcome>
where
    Cn: Future<Output = ()>,
{
    reporter.step("creating instance...");
    let created = infra
        .create(&InfraSpec {
            region: req.region,
            instance_type: req.instance_type,
            owner: req.owner,
            ssh_public_key_path: req.ssh_public_key_path,
        })
        .await?;
    tracing::debug!(
        instance_id = %created.instance_id,
        public_ip = ?created.public_ip,
        public_dns = ?created.public_dns,
        reused = created.reused,
        "infrastructure ready"
    );
    let at = created
        .public_ip
        .as_deref()
        .map_or_else(String::new, |ip| format!(" at {ip}"));
    if created.reused {
        reporter.warn(&format!(
            "reusing instance {}{at} left by an earlier run",
            created.instance_id
        ));
    } else {
        reporter.success(&format!("instance {} created{at}", created.instance_id));
    }

    transition(state, LifecycleState::WaitingReachable);
    reporter.begin_wait("waiting for instance reachability checks...");
    poll_until_cancelled(
        req.reachability,
        move || probe_reachable(inventory, req.region, req.owner),
        cancel(),
    )
    .await
    .map_err(PollError::into_anyhow)?;
    reporter.success("instance reachable");

    let address = resolve_address(inventory, req.region, req.owner).await?;
    let mut shell = connector.connect(&address).await?;
    let result = bootstrap(state, &shell, &address, fs, reporter, req, cancel).await;
    shell.close().await;
    result?;

    Ok(UpOutcome {
        instance_id: address.instance_id,
        public_ip: address.public_ip,
    })
}

async fn bootstrap<Cn>(
    state: &mut LifecycleState,
    shell: &impl RemoteShell,
    address: &InstanceAddress,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    req: &UpRequest<'_>,
    cancel: &impl Fn() -> Cn,
) -> Result<()>
where
    Cn: Future<Output = ()>,
{
    transition(state, LifecycleState::InstalledRuntime);
    reporter.step("installing k3s...");
    install_k3s(shell, &address.public_ip).await?;

    reporter.begin_wait("waiting for the node to become Ready...");
    poll_until_cancelled(req.node_ready, move || probe_node_ready(shell), cancel())
        .await
        .map_err(PollError::into_anyhow)?;
    reporter.success("k3s is running");

    transition(state, LifecycleState::ConfigFetched);
    let kubeconfig = fetch_kubeconfig(shell, &address.public_ip).await?;
    fs.write_owner_only(req.kubeconfig_path, &kubeconfig)
        .with_context(|| format!("writing {}", req.kubeconfig_path.display()))?;
    reporter.success(&format!("kubeconfig written to {}", req.kubeconfig_path.display()));
    Ok(())
}

/// One reachability probe: locate the owner's instance and ask whether its
/// reachability check has passed. Anything else, including no report yet,
/// means "not yet".
async fn probe_reachable(
    inventory: &impl CloudInventory,
    region: &str,
    owner: &OwnerTag,
) -> Result<bool> {
    let instance = locate_instance(inventory, region, owner).await?;
    let status = inventory
        .reachability(region, &instance.instance_id)
        .await
        .context("querying instance status")?;
    tracing::debug!(instance_id = %instance.instance_id, status = ?status, "reachability");
    Ok(status.as_deref() == Some(REACHABILITY_PASSED))
}

/// Tear down everything tagged with `owner` and forget the cluster.
///
/// # Errors
///
/// Returns an error if destroying the infrastructure or clearing the state
/// fails. The state is kept when destroy fails so that `down` can be retried.
pub async fn down(
    infra: &impl InfraEngine,
    store: &impl ClusterStateStore,
    reporter: &impl ProgressReporter,
    region: &str,
    owner: &OwnerTag,
) -> Result<()> {
    reporter.step("destroying instance...");
    infra
        .destroy(region, owner)
        .await
        .context("destroying infrastructure")?;
    store.clear_async().await.context("clearing cluster state")?;
    reporter.success("cluster destroyed");
    Ok(())
}

/// Return the cluster identity to use for `up` in `region`, creating and
/// saving a fresh one if none exists.
///
/// # Errors
///
/// Returns [`StateError::RegionMismatch`] if a cluster already exists in a
/// different region, or an error if the state cannot be read or written.
pub async fn claim_cluster(
    store: &impl ClusterStateStore,
    region: &str,
    user: &str,
) -> Result<ClusterState> {
    if let Some(existing) = store.load_async().await? {
        if existing.region != region {
            return Err(StateError::RegionMismatch {
                existing: existing.region,
            }
            .into());
        }
        return Ok(existing);
    }
    let state = ClusterState::new(OwnerTag::generate(user), region);
    store.save_async(&state).await.context("saving cluster state")?;
    Ok(state)
}

/// Load the cluster identity, failing if there is none.
///
/// # Errors
///
/// Returns [`StateError::NoCluster`] if no state exists.
pub async fn current_cluster(store: &impl ClusterStateStore) -> Result<ClusterState> {
    store
        .load_async()
        .await?
        .ok_or_else(|| StateError::NoCluster.into())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
