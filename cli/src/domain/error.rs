//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Remote shell errors ───────────────────────────────────────────────────────

/// Errors raised while connecting to or running commands on the remote host.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot reach {addr}: {reason}")]
    Network { addr: String, reason: String },

    #[error("authentication failed for {user}@{addr}: {reason}")]
    Auth {
        user: String,
        addr: String,
        reason: String,
    },

    #[error("cannot use private key {path}: {reason}")]
    Key { path: String, reason: String },

    #[error("remote command failed: {reason}")]
    Execution { reason: String },

    #[error("remote command exited with status {status}{}", stderr_suffix(.stderr))]
    ExitStatus {
        status: u32,
        stdout: Vec<u8>,
        stderr: String,
    },
}

impl ShellError {
    /// Remote exit status, when the failure is a non-zero exit.
    #[must_use]
    pub fn exit_status(&self) -> Option<u32> {
        match self {
            Self::ExitStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened after the command reached the remote host.
    #[must_use]
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::ExitStatus { .. })
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

// ── Polling errors ────────────────────────────────────────────────────────────

/// Outcome of a readiness poll that did not reach the target state.
///
/// `E` is the probe's own error type; it is returned untouched in `Probe`.
#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("poll interval must be greater than zero")]
    InvalidInterval,

    #[error("timed out after {}s (limit {}s)", .elapsed.as_secs(), .timeout.as_secs())]
    Timeout { elapsed: Duration, timeout: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("{0:#}")]
    Probe(E),
}

impl PollError<anyhow::Error> {
    /// Convert to `anyhow::Error`, keeping the probe's own context chain intact.
    /// A cancelled wait becomes [`Interrupted`].
    #[must_use]
    pub fn into_anyhow(self) -> anyhow::Error {
        match self {
            Self::Probe(err) => err,
            Self::Cancelled => Interrupted.into(),
            other => anyhow::Error::msg(other.to_string()),
        }
    }
}

/// The user interrupted the run.
#[derive(Debug, Error)]
#[error("interrupted")]
pub struct Interrupted;

// ── Instance lookup errors ────────────────────────────────────────────────────

/// Errors from resolving the owner-tagged instance.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no instance tagged Owner={owner} in {region}. Run 'ec2-k3s up' to create one.")]
    NotFound { region: String, owner: String },

    #[error("{count} instances tagged Owner={owner} in {region}; refusing to pick one")]
    Ambiguous {
        region: String,
        owner: String,
        count: usize,
    },

    #[error("instance {instance_id} has no public IP address yet")]
    NoPublicAddress { instance_id: String },

    #[error("cloud API request failed: {0:#}")]
    CloudApi(anyhow::Error),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid region: {0}\n\nExpected an AWS region such as us-east-1")]
    InvalidRegion(String),

    #[error("Invalid instance type: {0}\n\nExpected an EC2 instance type such as t2.micro")]
    InvalidInstanceType(String),

    #[error("No region configured. Pass --region, set AWS_REGION, or add 'region' to {0}")]
    MissingRegion(String),

    #[error("Invalid {setting}: {value}s\n\nExpected between 1 and {max}s")]
    OutOfRange {
        setting: &'static str,
        value: u64,
        max: u64,
    },
}

// ── Cluster state errors ──────────────────────────────────────────────────────

/// Errors related to the persisted cluster identity.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("No cluster found. Run 'ec2-k3s up' to create one.")]
    NoCluster,

    #[error("A cluster already exists in {existing}. Run 'ec2-k3s down' first.")]
    RegionMismatch { existing: String },

    #[error("Invalid owner tag: {0}")]
    InvalidOwner(String),
}
