//! Decision engine: the per-tick state machine driving cell transitions.
//!
//! Each decision tick runs in two phases. Drain completion always comes
//! first: any DISABLING cell observed at zero utilization is locked and
//! becomes DISABLED, and a tick that completed a drain performs no further
//! evaluation, so a freshly locked cell is never reconsidered in the same
//! tick. Capacity evaluation then decides at most one structural change:
//! enabling one DISABLED cell or disabling one ENABLED cell, depending on
//! the configured decision mode.
//!
//! All state lives inside the engine and is mutated only from the single
//! control-loop task; collaborator calls are awaited inline under a bounded
//! timeout, and no failure of an external call is ever fatal here.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use esrapp_common::{
    CellId, CellState, ControllerConfig, DecisionMode, MeasurementReport, SelectionConfig,
};
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};

use crate::adapters::{ConfigManagementClient, LoadPredictor, PolicyClient};
use crate::ledger::{first_free_id, PolicyLedger};
use crate::policy::TspPolicy;
use crate::registry::CellRegistry;
use crate::tracker::UtilizationTracker;

/// Site overhead power draw in watts, for the savings estimate log line.
const SITE_BASE_POWER_W: f64 = 300.0;
/// Per-active-cell power draw in watts.
const CELL_POWER_W: f64 = 150.0;

/// How the enable-one-cell algorithm picks among DISABLED candidates.
pub trait EnableSelection: Send + Sync {
    /// Picks one candidate, or `None` when the slice is empty.
    fn select(&mut self, candidates: &[CellId]) -> Option<CellId>;
}

/// Uniform random selection.
pub struct RandomSelection;

impl EnableSelection for RandomSelection {
    fn select(&mut self, candidates: &[CellId]) -> Option<CellId> {
        candidates.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Fixed designated cell, falling back to the first candidate when the
/// designated cell is not currently disabled.
pub struct FixedSelection {
    preferred: CellId,
}

impl FixedSelection {
    /// Creates a selection strategy preferring the given cell.
    pub fn new(preferred: CellId) -> Self {
        Self { preferred }
    }
}

impl EnableSelection for FixedSelection {
    fn select(&mut self, candidates: &[CellId]) -> Option<CellId> {
        if candidates.contains(&self.preferred) {
            Some(self.preferred.clone())
        } else {
            candidates.first().cloned()
        }
    }
}

/// Builds the selection strategy named by the configuration.
pub fn selection_from_config(config: &SelectionConfig) -> Box<dyn EnableSelection> {
    match config {
        SelectionConfig::Random => Box::new(RandomSelection),
        SelectionConfig::Fixed { cell } => Box::new(FixedSelection::new(cell.clone())),
    }
}

/// What one decision tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Too few samples accumulated; no evaluation performed.
    InsufficientData,
    /// One or more DISABLING cells were locked; capacity evaluation skipped.
    DrainCompleted {
        /// Cells locked this tick
        cells: Vec<CellId>,
    },
    /// The policy called for enabling a cell (`None` when no candidate).
    EnableAttempted {
        /// The cell enabled, if any
        cell: Option<CellId>,
    },
    /// The policy called for disabling a cell (`None` when no candidate or
    /// the attempt was aborted).
    DisableAttempted {
        /// The cell now draining, if any
        cell: Option<CellId>,
    },
    /// The load predictor failed or timed out; treated as missing input.
    PredictionUnavailable,
    /// Utilization is within bounds; nothing to do.
    Balanced,
}

/// Point-in-time view of one managed cell, for status reporting.
#[derive(Debug, Clone)]
pub struct CellStatus {
    /// Cell identifier
    pub id: CellId,
    /// Operational state
    pub state: CellState,
    /// Current window aggregate, if any samples have arrived
    pub aggregate: Option<f64>,
    /// Timestamp of the most recent sample, if any
    pub last_sample_ms: Option<u64>,
    /// Steering policies currently outstanding against the cell
    pub outstanding_policies: usize,
}

/// The closed-loop energy-saving decision engine.
pub struct DecisionEngine {
    registry: CellRegistry,
    tracker: UtilizationTracker,
    ledger: PolicyLedger,
    cm: Arc<dyn ConfigManagementClient>,
    policies: Arc<dyn PolicyClient>,
    predictor: Arc<dyn LoadPredictor>,
    selector: Box<dyn EnableSelection>,
    config: ControllerConfig,
    call_timeout: Duration,
}

impl DecisionEngine {
    /// Creates an engine over a resolved registry and its collaborators.
    pub fn new(
        registry: CellRegistry,
        cm: Arc<dyn ConfigManagementClient>,
        policies: Arc<dyn PolicyClient>,
        predictor: Arc<dyn LoadPredictor>,
        config: ControllerConfig,
    ) -> Self {
        let selector = selection_from_config(&config.selection);
        let tracker = UtilizationTracker::new(config.window_len);
        let call_timeout = Duration::from_millis(config.adapter_timeout_ms);
        Self {
            registry,
            tracker,
            ledger: PolicyLedger::new(),
            cm,
            policies,
            predictor,
            selector,
            config,
            call_timeout,
        }
    }

    /// Replaces the enable-selection strategy (tests inject a deterministic
    /// one here).
    pub fn with_selector(mut self, selector: Box<dyn EnableSelection>) -> Self {
        self.selector = selector;
        self
    }

    /// Records one measurement report and logs the fleet status line.
    pub fn ingest(&mut self, report: &MeasurementReport) {
        if self.tracker.record_report(report) {
            self.log_fleet_status();
        }
    }

    /// Returns the current state of a managed cell.
    pub fn state_of(&self, id: &CellId) -> Option<CellState> {
        self.registry.get(id).map(|c| c.state)
    }

    /// Returns the policies outstanding against a cell.
    pub fn outstanding_policies(&self, id: &CellId) -> BTreeSet<u64> {
        self.ledger.outstanding(id)
    }

    /// Returns a status snapshot for every managed cell.
    pub fn status(&self) -> Vec<CellStatus> {
        self.registry
            .iter()
            .map(|cell| CellStatus {
                id: cell.id.clone(),
                state: cell.state,
                aggregate: self.tracker.aggregate(&cell.id),
                last_sample_ms: self.tracker.latest(&cell.id).map(|s| s.timestamp_ms),
                outstanding_policies: self.ledger.outstanding(&cell.id).len(),
            })
            .collect()
    }

    /// Runs one decision tick.
    pub async fn decision_tick(&mut self) -> TickOutcome {
        if (self.tracker.accumulated() as usize) < self.config.min_history_depth {
            info!(
                "Insufficient data to make a decision ({} of {} samples accumulated)",
                self.tracker.accumulated(),
                self.config.min_history_depth
            );
            return TickOutcome::InsufficientData;
        }

        let drained = self.complete_drains().await;
        if !drained.is_empty() {
            // Reports arrive once per collection period; stop here so the
            // freshly locked cell is not flipped back on within the same
            // time frame.
            return TickOutcome::DrainCompleted { cells: drained };
        }

        match self.config.mode {
            DecisionMode::Threshold => self.threshold_tick().await,
            DecisionMode::Prediction => self.prediction_tick().await,
        }
    }

    /// Locks every DISABLING cell whose aggregate reads exactly zero.
    async fn complete_drains(&mut self) -> Vec<CellId> {
        let candidates: Vec<CellId> = self
            .registry
            .iter()
            .filter(|c| c.state == CellState::Disabling)
            .filter(|c| self.tracker.aggregate(&c.id) == Some(0.0))
            .map(|c| c.id.clone())
            .collect();

        let mut drained = Vec::new();
        for id in candidates {
            if self.lock_cell(&id).await {
                drained.push(id);
            }
        }
        drained
    }

    /// Issues the administrative lock for a cell and records DISABLED on
    /// success. On failure the cell stays DISABLING, so the next tick's
    /// drain check re-attempts the equivalent transition.
    async fn lock_cell(&mut self, id: &CellId) -> bool {
        let Some(cell) = self.registry.get(id) else {
            return false;
        };
        let admin_ref = cell.admin_ref.clone();

        info!("Switching off cell {id}");
        match self.call(self.cm.set_administrative_state(&admin_ref, true)).await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                error!("Cell-off command failed for {id}: {e}; retrying next evaluation");
                return false;
            }
            None => {
                error!("Cell-off command timed out for {id}; retrying next evaluation");
                return false;
            }
        }

        if let Some(level) = self.config.power_down_level {
            match self.call(self.cm.set_transmit_power(id, level)).await {
                Some(Ok(())) => debug!("Transmit power for {id} set to {level}"),
                Some(Err(e)) => warn!("Transmit-power command failed for {id}: {e}"),
                None => warn!("Transmit-power command timed out for {id}"),
            }
        }

        if let Some(cell) = self.registry.get_mut(id) {
            cell.state = CellState::Disabled;
        }
        info!("Cell {id} is now DISABLED");
        true
    }

    /// Threshold-mode capacity evaluation.
    async fn threshold_tick(&mut self) -> TickOutcome {
        let Some(loads) = self.cell_loads() else {
            info!("Utilization history incomplete; skipping evaluation");
            return TickOutcome::InsufficientData;
        };

        let carrying: Vec<&(CellId, f64, CellState)> =
            loads.iter().filter(|(_, _, s)| s.carries_load()).collect();
        if carrying.is_empty() {
            info!("No active cells carrying load - trying to enable one cell.");
            let cell = self.enable_one_cell().await;
            return TickOutcome::EnableAttempted { cell };
        }

        let total: f64 = carrying.iter().map(|(_, v, _)| v).sum();
        let avg = total / carrying.len() as f64;
        let max = carrying.iter().map(|(_, v, _)| *v).fold(f64::MIN, f64::max);
        let disabling = self.registry.count_in(CellState::Disabling);

        info!("Current average PRB usage: {avg:.3} (max {max:.3})");
        if max > self.config.thresholds.enable_max && avg > self.config.thresholds.enable_avg {
            info!("Max and average PRB usage above thresholds - trying to enable one cell.");
            let cell = self.enable_one_cell().await;
            TickOutcome::EnableAttempted { cell }
        } else if avg < self.config.thresholds.disable_avg && disabling == 0 {
            info!("Average PRB usage below threshold - trying to disable one cell.");
            if carrying.len() > 1 {
                let future_avg = total / (carrying.len() as f64 - 1.0);
                info!("Expected PRB usage after disabling: {future_avg:.3}");
            }
            let cell = self.disable_one_cell().await;
            TickOutcome::DisableAttempted { cell }
        } else {
            info!("Cell on/off decision: no action, balance achieved.");
            TickOutcome::Balanced
        }
    }

    /// Prediction-mode capacity evaluation.
    async fn prediction_tick(&mut self) -> TickOutcome {
        let history = self.tracker.fleet_history();
        let predicted = match self.call(self.predictor.predict(&history)).await {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                warn!("Load prediction failed: {e}");
                return TickOutcome::PredictionUnavailable;
            }
            None => {
                warn!("Load prediction timed out");
                return TickOutcome::PredictionUnavailable;
            }
        };

        let bound = self.config.prediction.load_bound;
        info!("Predicted load: {predicted:.3} (bound {bound})");

        if predicted > bound {
            // Finish any in-flight drain immediately: the capacity is
            // needed now, and an enable must not race a half-off cell.
            for id in self.registry.ids_in(CellState::Disabling) {
                self.lock_cell(&id).await;
            }
            info!("Predicted load above bound - trying to enable one cell.");
            let cell = self.enable_one_cell().await;
            TickOutcome::EnableAttempted { cell }
        } else if self.registry.count_in(CellState::Disabled) == 0
            && self.registry.count_in(CellState::Disabling) == 0
        {
            info!("Predicted load below bound - trying to disable one cell.");
            let cell = self.disable_one_cell().await;
            TickOutcome::DisableAttempted { cell }
        } else {
            info!("Cell on/off decision: no action, balance achieved.");
            TickOutcome::Balanced
        }
    }

    /// Enables one DISABLED cell: state first, then the unlock command,
    /// then withdrawal of every steering policy recorded for the cell.
    async fn enable_one_cell(&mut self) -> Option<CellId> {
        let candidates = self.registry.ids_in(CellState::Disabled);
        let Some(id) = self.selector.select(&candidates) else {
            info!("There are no cells that could be enabled");
            return None;
        };

        info!("Enabling cell {id}");
        let admin_ref = self.registry.get(&id)?.admin_ref.clone();
        if let Some(cell) = self.registry.get_mut(&id) {
            cell.state = CellState::Enabled;
        }

        match self.call(self.cm.set_administrative_state(&admin_ref, false)).await {
            Some(Ok(())) => info!("Cell-on command acknowledged for {id}"),
            Some(Err(e)) => error!("Cell-on command failed for {id}: {e}"),
            None => error!("Cell-on command timed out for {id}"),
        }

        for policy_id in self.ledger.take(&id) {
            self.delete_policy(policy_id).await;
        }
        Some(id)
    }

    /// Disables the ENABLED cell with the lowest aggregate utilization:
    /// steering policies are issued and the cell drains as DISABLING; the
    /// administrative lock is deferred until a zero reading arrives.
    async fn disable_one_cell(&mut self) -> Option<CellId> {
        let mut best: Option<(CellId, f64)> = None;
        for cell in self.registry.iter().filter(|c| c.state == CellState::Enabled) {
            let Some(agg) = self.tracker.aggregate(&cell.id) else {
                continue;
            };
            match &best {
                Some((_, lowest)) if agg >= *lowest => {}
                _ => best = Some((cell.id.clone(), agg)),
            }
        }
        let Some((id, agg)) = best else {
            info!("There are no cells that could be disabled");
            return None;
        };

        // The occupied identifier set is fetched before committing the
        // transition: a store outage aborts the attempt rather than leaving
        // a draining cell with no steering policy behind it.
        let mut taken = match self.call(self.policies.list_policies()).await {
            Some(Ok(set)) => set,
            Some(Err(e)) => {
                error!("Unable to list policies: {e}; disable attempt aborted");
                return None;
            }
            None => {
                error!("Policy listing timed out; disable attempt aborted");
                return None;
            }
        };

        let nci = self.registry.nci(&id)?;
        info!("Disabling cell {id} [nci={nci}, avg={agg:.3}]");
        if let Some(cell) = self.registry.get_mut(&id) {
            cell.state = CellState::Disabling;
        }

        for qos in self.config.qos_classes.clone() {
            let policy_id = first_free_id(&taken, self.config.policy_id_base);
            taken.insert(policy_id);
            let policy = TspPolicy::forbid(
                nci,
                &self.config.plmn,
                self.config.slice.sst,
                &self.config.slice.sd,
                qos,
            );
            match self.call(self.policies.put_policy(policy_id, &policy)).await {
                Some(Ok(status)) => info!(
                    "Sent policy {policy_id} (5QI {qos}, FORBID) for cell {id}: status {status}"
                ),
                Some(Err(e)) => error!("Policy {policy_id} put failed for cell {id}: {e}"),
                None => error!("Policy {policy_id} put timed out for cell {id}"),
            }
            // Recorded even when the put failed, so re-enabling withdraws
            // whatever the store may have accepted.
            self.ledger.record(&id, policy_id);
        }
        Some(id)
    }

    /// Withdraws one policy, best-effort.
    async fn delete_policy(&self, policy_id: u64) {
        info!("Deleting policy {policy_id}");
        match self.call(self.policies.delete_policy(policy_id)).await {
            Some(Ok(status)) if status < 300 || status == 404 => {
                debug!("Policy {policy_id} deleted (status {status})");
            }
            Some(Ok(status)) => warn!("Policy {policy_id} delete returned status {status}"),
            Some(Err(e)) => error!("Policy {policy_id} delete failed: {e}"),
            None => error!("Policy {policy_id} delete timed out"),
        }
    }

    /// Returns (cell, aggregate, state) for every cell, or `None` while any
    /// cell still has an empty window.
    fn cell_loads(&self) -> Option<Vec<(CellId, f64, CellState)>> {
        let mut loads = Vec::with_capacity(self.registry.len());
        for cell in self.registry.iter() {
            let agg = self.tracker.aggregate(&cell.id)?;
            loads.push((cell.id.clone(), agg, cell.state));
        }
        Some(loads)
    }

    fn log_fleet_status(&self) {
        let mut parts = Vec::with_capacity(self.registry.len());
        let mut total = 0.0;
        let mut carrying = 0usize;
        for cell in self.registry.iter() {
            match self.tracker.aggregate(&cell.id) {
                Some(value) => {
                    parts.push(format!("{}: {:.3}", cell.id, value));
                    if cell.state.carries_load() {
                        total += value;
                        carrying += 1;
                    }
                }
                None => parts.push(format!("{}: -", cell.id)),
            }
        }
        let avg = if carrying > 0 {
            total / carrying as f64
        } else {
            0.0
        };

        let all_kw =
            (SITE_BASE_POWER_W + (self.registry.len() as f64 - 1.0) * CELL_POWER_W) / 1e3;
        let now_kw =
            (SITE_BASE_POWER_W + (carrying as f64 - 1.0).max(0.0) * CELL_POWER_W) / 1e3;
        info!(
            "PRB usage: [{}] avg: {:.3} (power draw {:.2}/{:.2} kW; daily savings {:.2} kWh)",
            parts.join(", "),
            avg,
            now_kw,
            all_kw,
            (all_kw - now_kw) * 24.0
        );
    }

    /// Awaits a collaborator call under the bounded timeout; `None` means
    /// the call expired.
    async fn call<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::time::timeout(self.call_timeout, fut).await.ok()
    }
}
