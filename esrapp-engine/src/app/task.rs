//! The control-loop task.
//!
//! One cooperative loop owns all mutable controller state. Each iteration
//! polls the measurement source for at most one pending report; when
//! nothing is pending the iteration has no side effects. A decision tick
//! runs once the decision interval has elapsed, always after that
//! iteration's ingestion, so evaluation observes the freshest aggregates.

use std::time::{Duration, Instant};

use esrapp_common::{ControllerConfig, DecisionCadence};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::adapters::MeasurementSource;
use crate::engine::{DecisionEngine, TickOutcome};
use crate::tasks::{EngineMessage, Task, TaskMessage};

/// The controller's single control-loop task.
pub struct ControlLoop {
    engine: DecisionEngine,
    source: Box<dyn MeasurementSource>,
    ingest_interval: Duration,
    cadence: DecisionCadence,
}

impl ControlLoop {
    /// Creates the loop over an engine and a measurement source. The first
    /// decision is deferred by one full decision interval.
    pub fn new(
        engine: DecisionEngine,
        source: Box<dyn MeasurementSource>,
        config: &ControllerConfig,
    ) -> Self {
        let ingest_interval = Duration::from_millis(config.ingest_interval_ms);
        let decision_interval = Duration::from_millis(config.decision_interval_ms);
        Self {
            engine,
            source,
            ingest_interval,
            cadence: DecisionCadence::new(decision_interval, Instant::now()),
        }
    }

    /// Returns the engine for inspection.
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Runs one loop iteration at the given instant.
    ///
    /// Returns the decision outcome when a tick ran, `None` otherwise.
    /// Iterations without a pending report have no side effects at all; the
    /// decision cadence is only consulted on iterations that ingested.
    pub async fn step(&mut self, now: Instant) -> Option<TickOutcome> {
        match self.source.next_batch().await {
            Ok(Some(report)) => self.engine.ingest(&report),
            Ok(None) => return None,
            Err(e) => {
                debug!("Measurement source unavailable: {e}");
                return None;
            }
        }

        if !self.cadence.due(now) {
            return None;
        }
        self.cadence.rearm(now);

        let outcome = self.engine.decision_tick().await;
        debug!("Decision tick outcome: {outcome:?}");
        Some(outcome)
    }
}

#[async_trait::async_trait]
impl Task for ControlLoop {
    type Message = EngineMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!(
            "Control loop started (ingest every {:?}, decisions every {:?})",
            self.ingest_interval,
            self.cadence.interval()
        );

        let mut ticker = tokio::time::interval(self.ingest_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.step(Instant::now()).await;
                }
                msg = rx.recv() => match msg {
                    Some(TaskMessage::Message(EngineMessage::GetStatus { response_tx })) => {
                        let _ = response_tx.send(self.engine.status());
                    }
                    Some(TaskMessage::Shutdown) | None => break,
                },
            }
        }

        info!("Control loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::{
        cell_report, MeanPredictor, ScriptedMeasurements, SimControlPlane, SimPolicyStore,
    };
    use crate::adapters::{Topology, TopologyEntry};
    use crate::registry::CellRegistry;
    use esrapp_common::{AdminRef, CellId, CellState, MeasurementReport};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn topology() -> Topology {
        let mut cells = BTreeMap::new();
        for (name, local) in [("C1", 1u32), ("C2", 2u32)] {
            cells.insert(
                CellId::from(name),
                TopologyEntry {
                    admin_ref: AdminRef::new(format!("NrCellDu={local}")),
                    cell_local_id: local,
                },
            );
        }
        Topology {
            gnb_id: 1,
            gnb_id_length: 32,
            cells,
        }
    }

    fn config() -> ControllerConfig {
        let yaml = "plmn:\n  mcc: \"310\"\n  mnc: \"410\"\n";
        let mut config: ControllerConfig = serde_yaml::from_str(yaml).expect("config");
        // Small windows so a drained cell reads zero within a short script.
        config.window_len = 4;
        config
    }

    async fn control_loop(reports: Vec<MeasurementReport>) -> (ControlLoop, Arc<SimControlPlane>) {
        let cm = Arc::new(SimControlPlane::new(topology()));
        let store = Arc::new(SimPolicyStore::new());
        let registry = CellRegistry::resolve(cm.as_ref()).await.expect("resolve");
        let config = config();
        let engine = DecisionEngine::new(
            registry,
            cm.clone(),
            store,
            Arc::new(MeanPredictor),
            config.clone(),
        );
        let source = Box::new(ScriptedMeasurements::new(reports));
        (ControlLoop::new(engine, source, &config), cm)
    }

    fn low_reports(n: usize) -> Vec<MeasurementReport> {
        (0..n)
            .map(|i| {
                cell_report(
                    &[
                        (CellId::from("C1"), vec![15.0]),
                        (CellId::from("C2"), vec![5.0]),
                    ],
                    (i as u64 + 1) * 60_000,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_step_without_pending_batch_has_no_side_effects() {
        let (mut control_loop, _cm) = control_loop(Vec::new()).await;
        let start = Instant::now();

        // Far past the decision deadline, but nothing was ingested.
        let outcome = control_loop.step(start + Duration::from_secs(3_600)).await;
        assert_eq!(outcome, None);
        assert_eq!(
            control_loop.engine().state_of(&CellId::from("C1")),
            Some(CellState::Enabled)
        );
    }

    #[tokio::test]
    async fn test_decision_waits_for_interval() {
        let (mut control_loop, _cm) = control_loop(low_reports(12)).await;
        let start = Instant::now();

        // Ingestion happens every step, but no decision runs before the
        // decision interval (10s default) has elapsed.
        for i in 0..5 {
            let outcome = control_loop
                .step(start + Duration::from_secs(i))
                .await;
            assert_eq!(outcome, None);
        }

        let outcome = control_loop.step(start + Duration::from_secs(11)).await;
        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn test_loop_disables_then_drains() {
        let mut reports = low_reports(12);
        // After the disable decision, C2 drains to zero.
        for i in 12..24 {
            reports.push(cell_report(
                &[
                    (CellId::from("C1"), vec![15.0]),
                    (CellId::from("C2"), vec![0.0]),
                ],
                (i as u64 + 1) * 60_000,
            ));
        }
        let (mut control_loop, cm) = control_loop(reports).await;
        let start = Instant::now();

        let mut outcomes = Vec::new();
        for i in 0..24u64 {
            if let Some(outcome) = control_loop
                .step(start + Duration::from_secs(i * 11))
                .await
            {
                outcomes.push(outcome);
            }
        }

        assert!(outcomes.contains(&TickOutcome::DisableAttempted {
            cell: Some(CellId::from("C2"))
        }));
        assert!(outcomes.contains(&TickOutcome::DrainCompleted {
            cells: vec![CellId::from("C2")]
        }));
        assert_eq!(
            control_loop.engine().state_of(&CellId::from("C2")),
            Some(CellState::Disabled)
        );
        assert!(cm.is_locked(&AdminRef::new("NrCellDu=2")));
    }

    #[tokio::test]
    async fn test_malformed_report_is_skipped_by_the_loop() {
        let mut reports = low_reports(2);
        let mut bad = cell_report(&[(CellId::from("C1"), vec![99.0])], 180_000);
        bad.measured_entity = "ManagedElement=1,GnbCuUpFunction=1".to_string();
        reports.push(bad);
        let (mut control_loop, _cm) = control_loop(reports).await;
        let start = Instant::now();

        for i in 0..3u64 {
            control_loop.step(start + Duration::from_secs(i)).await;
        }

        // Two good reports recorded; the malformed one left history alone.
        let status = control_loop.engine().status();
        let c1 = status.iter().find(|s| s.id == CellId::from("C1")).unwrap();
        assert_eq!(c1.aggregate, Some(15.0));
    }
}
