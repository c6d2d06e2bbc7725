//! Policy plane boundary (traffic-steering policies).

use std::collections::BTreeSet;

use thiserror::Error;

use crate::policy::TspPolicy;

/// Errors returned by the policy plane.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy store could not be reached.
    #[error("policy store unreachable: {reason}")]
    Unreachable {
        /// Description of the connection failure
        reason: String,
    },
}

/// Operations consumed on the policy plane.
///
/// `put_policy` and `delete_policy` return the store's status code rather
/// than failing: the caller logs non-2xx outcomes and moves on, so a
/// rejected command never aborts a decision tick.
#[async_trait::async_trait]
pub trait PolicyClient: Send + Sync {
    /// Lists the identifiers of all policies currently in the store,
    /// whoever created them.
    async fn list_policies(&self) -> Result<BTreeSet<u64>, PolicyError>;

    /// Creates or replaces a steering policy under the given identifier.
    async fn put_policy(&self, id: u64, policy: &TspPolicy) -> Result<u16, PolicyError>;

    /// Deletes a policy (best-effort; 404 counts as gone).
    async fn delete_policy(&self, id: u64) -> Result<u16, PolicyError>;
}
