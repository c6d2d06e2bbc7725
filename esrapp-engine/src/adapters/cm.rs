//! Configuration-management plane boundary.

use std::collections::BTreeMap;

use esrapp_common::{AdminRef, CellId};
use thiserror::Error;

/// Errors returned by the configuration-management plane.
#[derive(Debug, Error)]
pub enum CmError {
    /// The endpoint could not be reached.
    #[error("configuration-management endpoint unreachable: {reason}")]
    Unreachable {
        /// Description of the connection failure
        reason: String,
    },

    /// The plane answered but rejected the command.
    #[error("configuration-management command rejected with status {status}")]
    Rejected {
        /// Status code returned by the plane
        status: u16,
    },
}

/// One cell as described by the topology source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEntry {
    /// Locator for the cell's managed object
    pub admin_ref: AdminRef,
    /// Cell-local identifier used to derive the NCI
    pub cell_local_id: u32,
}

/// The resolved topology: gNB identity plus the managed cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// gNB identifier
    pub gnb_id: u64,
    /// gNB identifier length in bits (22-32)
    pub gnb_id_length: u8,
    /// Managed cells keyed by identifier
    pub cells: BTreeMap<CellId, TopologyEntry>,
}

/// Operations consumed on the configuration-management plane.
#[async_trait::async_trait]
pub trait ConfigManagementClient: Send + Sync {
    /// Fetches the managed topology.
    async fn get_topology(&self) -> Result<Topology, CmError>;

    /// Sets a cell's administrative state (true = LOCKED).
    async fn set_administrative_state(
        &self,
        admin_ref: &AdminRef,
        locked: bool,
    ) -> Result<(), CmError>;

    /// Sets a cell's transmit-power level (variant-specific; deployments
    /// without power control reject the call).
    async fn set_transmit_power(&self, cell: &CellId, level: i32) -> Result<(), CmError>;
}
