//! Resolve the owner-tagged instance to a public address.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::CloudInventory;
use crate::domain::instance::{address_of, select_single};
use crate::domain::{InstanceAddress, InstanceRecord, LocateError, OwnerTag};

/// Find the single live instance tagged with `owner`.
///
/// Queries the inventory on every call; nothing is cached.
///
/// # Errors
///
/// Returns [`LocateError::CloudApi`] if the inventory query fails, and
/// [`LocateError::NotFound`] / [`LocateError::Ambiguous`] unless exactly one
/// live instance matches.
pub async fn locate_instance(
    inventory: &impl CloudInventory,
    region: &str,
    owner: &OwnerTag,
) -> Result<InstanceRecord, LocateError> {
    let records = inventory
        .describe_instances(region, owner)
        .await
        .map_err(LocateError::CloudApi)?;
    tracing::debug!(region, owner = %owner, matches = records.len(), "described instances");
    select_single(records, region, owner)
}

/// Resolve the public address of the instance tagged with `owner`.
///
/// # Errors
///
/// Everything [`locate_instance`] returns, plus
/// [`LocateError::NoPublicAddress`] while the instance has no public IP.
pub async fn resolve_address(
    inventory: &impl CloudInventory,
    region: &str,
    owner: &OwnerTag,
) -> Result<InstanceAddress, LocateError> {
    let address = address_of(locate_instance(inventory, region, owner).await?)?;
    tracing::debug!(
        instance_id = %address.instance_id,
        public_ip = %address.public_ip,
        "resolved instance address"
    );
    Ok(address)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
