//! Cell registry: the fixed topology under management.
//!
//! Resolved once at startup from the configuration-management plane and
//! read-only afterwards, except for each cell's operational state, which is
//! owned by the decision engine.

use std::collections::BTreeMap;

use esrapp_common::{AdminRef, CellId, CellState};
use thiserror::Error;
use tracing::info;

use crate::adapters::{CmError, ConfigManagementClient};
use crate::policy::compute_nci;

/// Errors raised while resolving the topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The topology source could not be reached.
    #[error("topology source unreachable")]
    Unavailable(#[from] CmError),

    /// The source answered with zero cells.
    #[error("topology source returned no cells")]
    Empty,
}

/// One radio cell under management.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Cell identifier
    pub id: CellId,
    /// Locator for the cell's managed object
    pub admin_ref: AdminRef,
    /// Cell-local identifier used to derive the NCI
    pub cell_local_id: u32,
    /// Operational state, owned by the decision engine
    pub state: CellState,
}

/// The managed topology, keyed by cell identifier.
///
/// A `BTreeMap` keeps iteration order stable, which makes tie-breaking in
/// candidate selection deterministic.
#[derive(Debug)]
pub struct CellRegistry {
    gnb_id: u64,
    gnb_id_length: u8,
    cells: BTreeMap<CellId, Cell>,
}

impl CellRegistry {
    /// Resolves the topology from the configuration-management plane.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::Unavailable` if the source cannot be reached
    /// and `TopologyError::Empty` if it yields no cells. Both are fatal at
    /// startup.
    pub async fn resolve(cm: &dyn ConfigManagementClient) -> Result<Self, TopologyError> {
        let topology = cm.get_topology().await?;
        if topology.cells.is_empty() {
            return Err(TopologyError::Empty);
        }

        let cells = topology
            .cells
            .into_iter()
            .map(|(id, entry)| {
                let cell = Cell {
                    id: id.clone(),
                    admin_ref: entry.admin_ref,
                    cell_local_id: entry.cell_local_id,
                    state: CellState::Enabled,
                };
                (id, cell)
            })
            .collect::<BTreeMap<_, _>>();

        info!(
            "Resolved topology: gnbId={} ({} bits), {} cell(s)",
            topology.gnb_id,
            topology.gnb_id_length,
            cells.len()
        );

        Ok(Self {
            gnb_id: topology.gnb_id,
            gnb_id_length: topology.gnb_id_length,
            cells,
        })
    }

    /// Builds a registry directly from resolved parts (tests, tools).
    pub fn from_parts(gnb_id: u64, gnb_id_length: u8, cells: BTreeMap<CellId, Cell>) -> Self {
        Self {
            gnb_id,
            gnb_id_length,
            cells,
        }
    }

    /// Returns the cell with the given identifier.
    pub fn get(&self, id: &CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Returns a mutable reference to the cell with the given identifier.
    pub fn get_mut(&mut self, id: &CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    /// Iterates cells in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Returns the number of managed cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if no cells are managed.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Counts cells currently in the given state.
    pub fn count_in(&self, state: CellState) -> usize {
        self.cells.values().filter(|c| c.state == state).count()
    }

    /// Returns the identifiers of cells currently in the given state, in
    /// registry iteration order.
    pub fn ids_in(&self, state: CellState) -> Vec<CellId> {
        self.cells
            .values()
            .filter(|c| c.state == state)
            .map(|c| c.id.clone())
            .collect()
    }

    /// Computes the NR Cell Identity for a managed cell.
    pub fn nci(&self, id: &CellId) -> Option<u64> {
        self.cells
            .get(id)
            .map(|cell| compute_nci(self.gnb_id, self.gnb_id_length, cell.cell_local_id))
    }
}
