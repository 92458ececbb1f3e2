//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags; commands pull their
//! adapters from here instead of constructing them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::{ClusterState, Ec2K3sConfig, resolve_region};
use crate::infra::aws::AwsCli;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::fs::expand_home;
use crate::infra::ssh::{SshConnector, load_private_key, passphrase_from_env_or_prompt};
use crate::infra::state::StateManager;
use crate::output::OutputContext;

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Explicit config file (`--config`).
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Loaded and validated configuration.
    pub config: Ec2K3sConfig,
    /// Where the configuration came from, for error messages.
    pub config_path: PathBuf,
    /// Cluster state manager.
    pub state_mgr: StateManager,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is invalid or the home directory
    /// cannot be determined.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let store = YamlConfigStore::new(flags.config.clone());
        let config = store.load()?;
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            config,
            config_path: store.path()?,
            state_mgr: StateManager::new()?,
        })
    }

    /// Region for a new cluster: the flag, then the config file, then a
    /// previously recorded cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if no source provides a valid region.
    pub fn region(&self, flag: Option<&str>, state: Option<&ClusterState>) -> Result<String> {
        Ok(resolve_region(
            flag,
            self.config.region.as_deref(),
            state.map(|s| s.region.as_str()),
            &self.config_path.display().to_string(),
        )?)
    }

    /// Region for an existing cluster: the flag, then where it was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag is not a valid region.
    pub fn cluster_region(&self, flag: Option<&str>, cluster: &ClusterState) -> Result<String> {
        Ok(resolve_region(
            flag,
            Some(cluster.region.as_str()),
            None,
            &self.config_path.display().to_string(),
        )?)
    }

    /// Cloud adapter backed by the `aws` CLI.
    #[must_use]
    pub fn aws(&self) -> AwsCli<TokioCommandRunner> {
        AwsCli::new(TokioCommandRunner::default())
    }

    /// Expanded path of the configured private key.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn private_key_path(&self) -> Result<PathBuf> {
        expand_home(&self.config.ssh_key_path)
    }

    /// Expanded path of the public half of the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn public_key_path(&self) -> Result<PathBuf> {
        expand_home(&self.config.ssh_public_key_path())
    }

    /// SSH connector using the configured key, user, and port.
    ///
    /// Loads the key now so that a bad key fails before any cloud call.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key cannot be loaded.
    pub async fn ssh_connector(&self) -> Result<SshConnector> {
        let path = self.private_key_path()?;
        let key = load_private_key(&path, || passphrase_from_env_or_prompt(&path))
            .await
            .context("loading SSH key")?;
        Ok(SshConnector::new(
            self.config.ssh_user.clone(),
            self.config.ssh_port,
            key,
            Duration::from_secs(self.config.connect_timeout_secs),
        ))
    }
}
