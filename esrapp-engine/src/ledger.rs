//! Policy ledger: outstanding steering-policy identifiers per cell.
//!
//! Every policy this controller issues is recorded against the cell it
//! drains, so re-enabling the cell withdraws exactly the policies that were
//! asserted for it. Identifier allocation scans the controller's reserved
//! range for the first value not already taken in the external store, which
//! keeps the controller clear of policies created by other actors.

use std::collections::{BTreeMap, BTreeSet};

use esrapp_common::CellId;

/// Outstanding policy identifiers keyed by target cell.
#[derive(Debug, Default)]
pub struct PolicyLedger {
    outstanding: BTreeMap<CellId, BTreeSet<u64>>,
}

impl PolicyLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a policy identifier as outstanding against a cell.
    pub fn record(&mut self, cell_id: &CellId, policy_id: u64) {
        self.outstanding
            .entry(cell_id.clone())
            .or_default()
            .insert(policy_id);
    }

    /// Returns the identifiers currently outstanding against a cell.
    pub fn outstanding(&self, cell_id: &CellId) -> BTreeSet<u64> {
        self.outstanding.get(cell_id).cloned().unwrap_or_default()
    }

    /// Removes and returns every identifier outstanding against a cell.
    /// The cell's set is empty afterwards.
    pub fn take(&mut self, cell_id: &CellId) -> BTreeSet<u64> {
        self.outstanding.remove(cell_id).unwrap_or_default()
    }

    /// Returns true if no policy is outstanding against the cell.
    pub fn is_clear(&self, cell_id: &CellId) -> bool {
        self.outstanding
            .get(cell_id)
            .map_or(true, BTreeSet::is_empty)
    }

    /// Returns the total number of outstanding identifiers.
    pub fn total_outstanding(&self) -> usize {
        self.outstanding.values().map(BTreeSet::len).sum()
    }
}

/// Returns the first identifier at or above `base` that is not in `taken`.
pub fn first_free_id(taken: &BTreeSet<u64>, base: u64) -> u64 {
    let mut candidate = base;
    while taken.contains(&candidate) {
        candidate += 1;
    }
    candidate
}
