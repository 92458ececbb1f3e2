//! Persisted cluster identity.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::instance::OwnerTag;

/// Cluster state persisted to `~/.ec2-k3s/state.json`.
///
/// Written by `up` before any cloud call so that `down` can always find what
/// a partially failed `up` left behind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterState {
    /// Owner tag on every resource of this cluster.
    pub owner: OwnerTag,
    /// Region the cluster lives in.
    pub region: String,
    /// Instance id once provisioning reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// When the cluster identity was first created.
    pub created_at: DateTime<Utc>,
}

impl ClusterState {
    #[must_use]
    pub fn new(owner: OwnerTag, region: &str) -> Self {
        Self {
            owner,
            region: region.to_string(),
            instance_id: None,
            created_at: Utc::now(),
        }
    }
}
