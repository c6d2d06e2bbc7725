//! Core domain types shared across the esrapp crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Measurement type name carrying downlink PRB utilization in PM reports.
pub const PRB_TOT_DL: &str = "RRU.PrbTotDl";

/// Bit length of an NR Cell Identity.
pub const NCI_LENGTH: u8 = 36;

/// Identifier of a radio cell, unique within the managed topology.
///
/// Cell identifiers are operator-assigned names (e.g. `"S1/B2/C1"`) taken
/// verbatim from the topology source, stable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Creates a new cell identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CellId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque locator used by the configuration-management plane to address a
/// cell's managed object (obtained once at topology resolution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminRef(String);

impl AdminRef {
    /// Creates a new administrative reference.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdminRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational state of a managed cell.
///
/// All cells start ENABLED. A disable decision moves a cell to DISABLING
/// (steering policies issued, traffic draining); once drained the cell is
/// administratively locked and becomes DISABLED. Re-enabling unlocks the
/// cell and returns it to ENABLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CellState {
    /// Cell is unlocked and serving traffic.
    Enabled,
    /// Steering policies issued, waiting for traffic to drain.
    Disabling,
    /// Cell is administratively locked.
    Disabled,
}

impl CellState {
    /// Returns true if the cell counts toward the fleet-load denominator.
    pub fn carries_load(self) -> bool {
        self != CellState::Disabled
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellState::Enabled => write!(f, "ENABLED"),
            CellState::Disabling => write!(f, "DISABLING"),
            CellState::Disabled => write!(f, "DISABLED"),
        }
    }
}

/// Public Land Mobile Network identifier as carried in policy documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plmn {
    /// Mobile Country Code (3 digits)
    pub mcc: String,
    /// Mobile Network Code (2-3 digits)
    pub mnc: String,
}

impl Plmn {
    /// Creates a new PLMN identifier.
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }
}

/// Per-cell rows of measurement values from one PM report.
///
/// `values` holds one row per reporting slot; columns are aligned with the
/// report's `meas_types` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellMeasurement {
    /// Cell the rows belong to
    pub cell_id: CellId,
    /// Measurement rows, one per slot
    pub values: Vec<Vec<f64>>,
}

/// One already-parsed performance-measurement report.
///
/// This is the boundary type produced by a measurement source: the raw wire
/// format has been decoded by the collaborator, but the report has not yet
/// been validated against the metrics this controller consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    /// Distinguished name of the measured entity (cell reports name a Cell)
    pub measured_entity: String,
    /// Measurement type names carried by this report, in column order
    pub meas_types: Vec<String>,
    /// Per-cell measurement rows
    pub cells: Vec<CellMeasurement>,
    /// Collection timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl MeasurementReport {
    /// Returns true if this report describes cell-level measurements.
    pub fn is_cell_report(&self) -> bool {
        self.measured_entity.contains("Cell")
    }

    /// Returns the column index of the downlink PRB utilization metric.
    pub fn utilization_index(&self) -> Option<usize> {
        self.meas_types.iter().position(|t| t == PRB_TOT_DL)
    }
}
