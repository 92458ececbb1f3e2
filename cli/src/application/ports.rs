//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;

use anyhow::Result;

use crate::domain::{
    ClusterState, CommandResult, Ec2K3sConfig, InstanceAddress, InstanceRecord, OwnerTag,
    ShellError,
};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Parameters for creating (or reusing) the cluster instance.
pub struct InfraSpec<'a> {
    /// AWS region, e.g. `"us-east-1"`.
    pub region: &'a str,
    /// EC2 instance type, e.g. `"t2.micro"`.
    pub instance_type: &'a str,
    /// Owner tag applied to every created resource.
    pub owner: &'a OwnerTag,
    /// Path to the OpenSSH public key to import.
    pub ssh_public_key_path: &'a Path,
}

/// What the infrastructure engine reports after `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraOutputs {
    pub instance_id: String,
    pub public_ip: Option<String>,
    pub public_dns: Option<String>,
    /// A live instance from an earlier run was picked up instead of launching.
    pub reused: bool,
}

// ── Cloud Ports ───────────────────────────────────────────────────────────────

/// Declarative infrastructure: create-or-reuse and tear down.
#[allow(async_fn_in_trait)]
pub trait InfraEngine {
    /// Create the instance and its supporting resources, reusing a live
    /// instance that already carries the owner tag.
    async fn create(&self, spec: &InfraSpec<'_>) -> Result<InfraOutputs>;
    /// Remove every resource tagged with `owner` in `region`.
    async fn destroy(&self, region: &str, owner: &OwnerTag) -> Result<()>;
}

/// Read-only view of the cloud account.
#[allow(async_fn_in_trait)]
pub trait CloudInventory {
    /// All instances tagged with `owner` in `region`, in any state.
    async fn describe_instances(&self, region: &str, owner: &OwnerTag)
    -> Result<Vec<InstanceRecord>>;
    /// Reachability check status for one instance, or `None` if the provider
    /// has not reported one yet.
    async fn reachability(&self, region: &str, instance_id: &str) -> Result<Option<String>>;
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// One authenticated connection to a remote host.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run `command` in a fresh session and return its captured output.
    ///
    /// When `stream` is true the output is also mirrored to the local
    /// terminal as it arrives. A non-zero remote exit is returned as
    /// [`ShellError::ExitStatus`].
    async fn execute(&self, command: &str, stream: bool) -> Result<CommandResult, ShellError>;
    /// Release the transport. Idempotent.
    async fn close(&mut self);
}

/// Opens [`RemoteShell`] connections.
#[allow(async_fn_in_trait)]
pub trait ShellConnector {
    type Shell: RemoteShell;

    /// Connect and authenticate to the instance at `address`.
    async fn connect(&self, address: &InstanceAddress) -> Result<Self::Shell, ShellError>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Start a long wait. Ended by the next `success`/`warn`, or by dropping
    /// the reporter.
    fn begin_wait(&self, message: &str) {
        self.step(message);
    }
}

// ── State, Config and Filesystem Ports ────────────────────────────────────────

/// Abstracts cluster state persistence.
#[allow(async_fn_in_trait)]
pub trait ClusterStateStore {
    /// Load the current cluster state, returning `None` if no state exists.
    async fn load_async(&self) -> Result<Option<ClusterState>>;
    /// Persist the given cluster state.
    async fn save_async(&self, state: &ClusterState) -> Result<()>;
    /// Remove the state file. Succeeds if it does not exist.
    async fn clear_async(&self) -> Result<()>;
}

/// Abstracts configuration loading.
pub trait ConfigStore {
    /// Load the configuration, returning defaults if no file exists.
    fn load(&self) -> Result<Ec2K3sConfig>;
    /// Path of the config file, whether or not it exists.
    fn path(&self) -> Result<std::path::PathBuf>;
}

/// Local file writes the orchestrator needs.
pub trait LocalFs {
    /// Write `contents` to `path` so that only the current user can read it.
    fn write_owner_only(&self, path: &Path, contents: &str) -> Result<()>;
}
