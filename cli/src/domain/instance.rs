//! Instance identity: owner tags, instance records and address selection.
//!
//! This module is intentionally free of I/O, async, and external layer imports.
//! All functions take data in and return data out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{LocateError, StateError};

/// Tag key carrying the owner identifier on every created instance.
pub const OWNER_TAG_KEY: &str = "Owner";

/// Tag value marking resources created by this tool.
pub const PROJECT_TAG: &str = "ec2-k3s";

/// Reachability status that gates bootstrap.
pub const REACHABILITY_PASSED: &str = "passed";

const SUFFIX_LEN: usize = 16;
const MAX_USER_LEN: usize = 32;

// ── Owner tag ─────────────────────────────────────────────────────────────────

/// Unique owner identifier: `<user>-<16 hex chars>`.
///
/// Generated once per cluster and threaded explicitly through every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerTag(String);

impl OwnerTag {
    /// Generate a fresh owner tag for `user`.
    #[must_use]
    pub fn generate(user: &str) -> Self {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u128(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
        );
        hasher.write_u32(std::process::id());
        hasher.write_u64(RandomState::new().build_hasher().finish());
        Self(format!("{}-{:016x}", sanitize_user(user), hasher.finish()))
    }

    /// Parse and validate an existing owner tag.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidOwner`] if the value is not
    /// `<user>-<16 lowercase hex chars>`.
    pub fn parse(value: &str) -> Result<Self, StateError> {
        let invalid = || StateError::InvalidOwner(value.to_string());
        let (user, suffix) = value.rsplit_once('-').ok_or_else(invalid)?;
        let user_ok = !user.is_empty()
            && user.len() <= MAX_USER_LEN
            && !user.starts_with('-')
            && user
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if user_ok && suffix_ok {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The user part of the tag, e.g. `alice` for `alice-0123456789abcdef`.
    #[must_use]
    pub fn user(&self) -> &str {
        self.0
            .rsplit_once('-')
            .map_or(self.0.as_str(), |(user, _)| user)
    }

    /// Value for the instance `Name` tag.
    #[must_use]
    pub fn name_tag(&self) -> String {
        format!("{}-dev", self.user())
    }
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerTag {
    type Error = StateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerTag> for String {
    fn from(tag: OwnerTag) -> Self {
        tag.0
    }
}

/// Reduce a local account name to tag-safe characters.
///
/// Lowercases, maps anything outside `[a-z0-9-]` to `-`, trims leading and
/// trailing dashes and caps the length. Falls back to `user` when nothing is
/// left.
#[must_use]
pub fn sanitize_user(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches('-');
    let capped: String = trimmed.chars().take(MAX_USER_LEN).collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        "user".to_string()
    } else {
        capped.to_string()
    }
}

// ── Instance records ──────────────────────────────────────────────────────────

/// One instance as reported by the cloud inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_id: String,
    /// Provider lifecycle state, e.g. `pending`, `running`, `terminated`.
    pub state: String,
    pub public_ip: Option<String>,
    pub public_dns: Option<String>,
}

impl InstanceRecord {
    /// Whether the instance still counts as "the" instance for its owner.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !matches!(self.state.as_str(), "terminated" | "shutting-down")
    }
}

/// A resolved instance address. Never cached across lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceAddress {
    pub instance_id: String,
    pub public_ip: String,
}

impl InstanceAddress {
    /// `host:port` target for the remote shell.
    #[must_use]
    pub fn socket_target(&self, port: u16) -> String {
        format!("{}:{port}", self.public_ip)
    }
}

/// Pick the single live instance out of an owner-filtered listing.
///
/// # Errors
///
/// Returns [`LocateError::NotFound`] when no live instance matches and
/// [`LocateError::Ambiguous`] when more than one does.
pub fn select_single(
    records: Vec<InstanceRecord>,
    region: &str,
    owner: &OwnerTag,
) -> Result<InstanceRecord, LocateError> {
    let mut live: Vec<InstanceRecord> = records.into_iter().filter(InstanceRecord::is_live).collect();
    match live.len() {
        0 => Err(LocateError::NotFound {
            region: region.to_string(),
            owner: owner.to_string(),
        }),
        1 => Ok(live.remove(0)),
        count => Err(LocateError::Ambiguous {
            region: region.to_string(),
            owner: owner.to_string(),
            count,
        }),
    }
}

/// Extract the public address of a located instance.
///
/// # Errors
///
/// Returns [`LocateError::NoPublicAddress`] if the instance has no public IP.
pub fn address_of(record: InstanceRecord) -> Result<InstanceAddress, LocateError> {
    match record.public_ip.filter(|ip| !ip.is_empty()) {
        Some(public_ip) => Ok(InstanceAddress {
            instance_id: record.instance_id,
            public_ip,
        }),
        None => Err(LocateError::NoPublicAddress {
            instance_id: record.instance_id,
        }),
    }
}
