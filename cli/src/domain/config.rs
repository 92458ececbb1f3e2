//! Domain types and validators for ec2-k3s configuration.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const DEFAULT_SSH_KEY_PATH: &str = "~/.ssh/id_rsa";
pub const DEFAULT_SSH_USER: &str = "ubuntu";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Longest accepted poll interval, in seconds.
pub const MAX_POLL_INTERVAL_SECS: u64 = 3_600;
/// Longest accepted wait or handshake timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

static REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-[0-9]$").expect("valid regex")
});

static INSTANCE_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9]+$").expect("valid regex")
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.ec2-k3s/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ec2K3sConfig {
    /// AWS region; `None` means "must come from the flag or environment".
    pub region: Option<String>,
    /// EC2 instance type.
    pub instance_type: String,
    /// Private key path; the public key is `<path>.pub`.
    pub ssh_key_path: String,
    /// Login user on the instance image.
    pub ssh_user: String,
    /// SSH port.
    pub ssh_port: u16,
    /// Seconds to wait for the SSH handshake.
    pub connect_timeout_secs: u64,
    /// Instance reachability wait.
    pub reachability: PollSettings,
    /// Cluster node readiness wait.
    pub node_ready: PollSettings,
}

impl Default for Ec2K3sConfig {
    fn default() -> Self {
        Self {
            region: None,
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            ssh_key_path: DEFAULT_SSH_KEY_PATH.to_string(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_port: DEFAULT_SSH_PORT,
            connect_timeout_secs: 30,
            reachability: PollSettings {
                interval_secs: 1,
                timeout_secs: 180,
            },
            node_ready: PollSettings {
                interval_secs: 5,
                timeout_secs: 300,
            },
        }
    }
}

/// Interval and deadline for one readiness wait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl PollSettings {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Ec2K3sConfig {
    /// Public key path next to the configured private key.
    #[must_use]
    pub fn ssh_public_key_path(&self) -> String {
        format!("{}.pub", self.ssh_key_path)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates an AWS region name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRegion`] if the name is not region-shaped.
pub fn validate_region(region: &str) -> Result<(), ConfigError> {
    if REGION_RE.is_match(region) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRegion(region.to_string()))
    }
}

/// Validates an EC2 instance type name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInstanceType`] if the name is malformed.
pub fn validate_instance_type(instance_type: &str) -> Result<(), ConfigError> {
    if INSTANCE_TYPE_RE.is_match(instance_type) {
        Ok(())
    } else {
        Err(ConfigError::InvalidInstanceType(instance_type.to_string()))
    }
}

/// Validates the timing fields of a loaded config.
///
/// # Errors
///
/// Returns [`ConfigError::OutOfRange`] naming the first field that is zero or
/// above its limit.
pub fn validate_timings(config: &Ec2K3sConfig) -> Result<(), ConfigError> {
    let checks = [
        ("reachability.intervalSecs", config.reachability.interval_secs, MAX_POLL_INTERVAL_SECS),
        ("reachability.timeoutSecs", config.reachability.timeout_secs, MAX_TIMEOUT_SECS),
        ("nodeReady.intervalSecs", config.node_ready.interval_secs, MAX_POLL_INTERVAL_SECS),
        ("nodeReady.timeoutSecs", config.node_ready.timeout_secs, MAX_TIMEOUT_SECS),
        ("connectTimeoutSecs", config.connect_timeout_secs, MAX_TIMEOUT_SECS),
    ];
    for (setting, value, max) in checks {
        if value == 0 || value > max {
            return Err(ConfigError::OutOfRange { setting, value, max });
        }
    }
    Ok(())
}

/// Pick the region by precedence: explicit (flag or `AWS_REGION`), then the
/// config file, then the persisted cluster.
///
/// # Errors
///
/// Returns [`ConfigError::MissingRegion`] when no source has one, naming
/// `config_path`, and [`ConfigError::InvalidRegion`] for a malformed name.
pub fn resolve_region(
    explicit: Option<&str>,
    configured: Option<&str>,
    persisted: Option<&str>,
    config_path: &str,
) -> Result<String, ConfigError> {
    let region = explicit
        .or(configured)
        .or(persisted)
        .ok_or_else(|| ConfigError::MissingRegion(config_path.to_string()))?;
    validate_region(region)?;
    Ok(region.to_string())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
