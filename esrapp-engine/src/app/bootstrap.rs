//! Startup reconciliation.
//!
//! A previous run may have died with steering policies still asserted. The
//! controller owns every policy identifier at or above its reserved base,
//! so before the loop starts it sweeps the external store and deletes any
//! identifier in that range, leaving a clean slate.

use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{PolicyClient, PolicyError};
use crate::registry::TopologyError;

/// Errors that abort startup before the control loop runs.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Topology resolution failed.
    #[error("topology resolution failed: {0}")]
    Topology(#[from] TopologyError),

    /// The policy store was unreachable during reconciliation.
    #[error("policy reconciliation failed: {0}")]
    Reconciliation(#[from] PolicyError),
}

/// Deletes every policy in the controller's reserved identifier range.
///
/// Returns the number of orphaned policies swept. Individual deletions are
/// best-effort (failures are logged and skipped), but an unreachable store
/// is fatal: the caller must not enter the loop with unknown orphan state.
pub async fn reconcile_policies(
    policies: &dyn PolicyClient,
    policy_id_base: u64,
) -> Result<usize, PolicyError> {
    let existing = policies.list_policies().await?;

    let mut removed = 0;
    for id in existing {
        if id < policy_id_base {
            continue;
        }
        info!("Deleting orphaned policy {id} from a previous run");
        match policies.delete_policy(id).await {
            Ok(status) if status < 300 || status == 404 => removed += 1,
            Ok(status) => warn!("Orphaned policy {id} delete returned status {status}"),
            Err(e) => warn!("Orphaned policy {id} delete failed: {e}"),
        }
    }

    if removed > 0 {
        info!("Reconciliation removed {removed} orphaned policies");
    }
    Ok(removed)
}
