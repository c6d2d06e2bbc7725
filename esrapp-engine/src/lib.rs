//! esrapp-engine - Closed-loop RAN energy-saving controller
//!
//! This crate implements the decision engine of the esrapp controller: it
//! ingests per-cell PRB-utilization measurements, tracks bounded sample
//! windows, and drives cells between ENABLED, DISABLING, and DISABLED by
//! commanding two external control planes (administrative lock via the
//! configuration-management plane, traffic steering via the policy plane).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Control Loop                            │
//! │                                                               │
//! │  MeasurementSource ──▶ UtilizationTracker                     │
//! │                              │                                │
//! │                              ▼        ┌──────────────┐        │
//! │  LoadPredictor ◀──────  DecisionEngine ──▶ CellRegistry       │
//! │                              │        └──────────────┘        │
//! │                              ▼                                │
//! │                        PolicyLedger                           │
//! └──────────────┬───────────────────────────────┬───────────────┘
//!                ▼                               ▼
//!     ConfigManagementClient               PolicyClient
//!       (administrative lock)          (steering policies)
//! ```
//!
//! All mutable state is owned by the single control-loop task; collaborator
//! calls are awaited inline under a bounded timeout, and no steady-state
//! failure of an external call terminates the loop.

pub mod adapters;
pub mod app;
pub mod engine;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod tasks;
pub mod tracker;

pub use app::{
    load_and_validate_config, load_config, load_config_from_str, reconcile_policies,
    validate_config, BootstrapError, ConfigError, ConfigValidationError, ControlLoop,
};
pub use engine::{
    selection_from_config, CellStatus, DecisionEngine, EnableSelection, FixedSelection,
    RandomSelection, TickOutcome,
};
pub use ledger::{first_free_id, PolicyLedger};
pub use policy::{compute_nci, Preference, TspPolicy, POLICY_TYPE_ID};
pub use registry::{Cell, CellRegistry, TopologyError};
pub use tasks::{EngineMessage, Task, TaskHandle, TaskMessage, DEFAULT_CHANNEL_CAPACITY};
pub use tracker::{Sample, UtilizationTracker};
