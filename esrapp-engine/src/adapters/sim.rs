//! In-memory collaborator implementations.
//!
//! These back the `--scenario` demo mode of the binary and the crate's
//! tests: an in-memory configuration-management plane and policy store, a
//! mean-of-history predictor stub, and a scripted measurement source that
//! replays a fixed sequence of reports.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use esrapp_common::{AdminRef, CellId, CellMeasurement, MeasurementReport, PRB_TOT_DL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::{
    CmError, ConfigManagementClient, LoadPredictor, MeasurementError, MeasurementSource,
    PolicyClient, PolicyError, PredictError, Topology, TopologyEntry,
};
use crate::policy::TspPolicy;

/// In-memory configuration-management plane.
///
/// Holds a fixed topology and tracks administrative locks and transmit-power
/// levels per cell. Can be flipped unreachable to exercise failure paths.
pub struct SimControlPlane {
    topology: Topology,
    locks: Mutex<BTreeMap<String, bool>>,
    power: Mutex<BTreeMap<CellId, i32>>,
    reachable: AtomicBool,
}

impl SimControlPlane {
    /// Creates a control plane serving the given topology, all cells
    /// unlocked.
    pub fn new(topology: Topology) -> Self {
        let locks = topology
            .cells
            .values()
            .map(|entry| (entry.admin_ref.as_str().to_string(), false))
            .collect();
        Self {
            topology,
            locks: Mutex::new(locks),
            power: Mutex::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Makes subsequent calls fail as unreachable (or reachable again).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Returns whether the given cell is currently locked.
    pub fn is_locked(&self, admin_ref: &AdminRef) -> bool {
        self.locks
            .lock()
            .expect("lock state poisoned")
            .get(admin_ref.as_str())
            .copied()
            .unwrap_or(false)
    }

    /// Returns the last transmit-power level applied to a cell.
    pub fn power_level(&self, cell: &CellId) -> Option<i32> {
        self.power
            .lock()
            .expect("power state poisoned")
            .get(cell)
            .copied()
    }

    fn check_reachable(&self) -> Result<(), CmError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CmError::Unreachable {
                reason: "simulated outage".to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl ConfigManagementClient for SimControlPlane {
    async fn get_topology(&self) -> Result<Topology, CmError> {
        self.check_reachable()?;
        Ok(self.topology.clone())
    }

    async fn set_administrative_state(
        &self,
        admin_ref: &AdminRef,
        locked: bool,
    ) -> Result<(), CmError> {
        self.check_reachable()?;
        self.locks
            .lock()
            .expect("lock state poisoned")
            .insert(admin_ref.as_str().to_string(), locked);
        info!(
            "cm: {} administrativeState={}",
            admin_ref,
            if locked { "LOCKED" } else { "UNLOCKED" }
        );
        Ok(())
    }

    async fn set_transmit_power(&self, cell: &CellId, level: i32) -> Result<(), CmError> {
        self.check_reachable()?;
        self.power
            .lock()
            .expect("power state poisoned")
            .insert(cell.clone(), level);
        Ok(())
    }
}

/// In-memory policy store.
pub struct SimPolicyStore {
    policies: Mutex<BTreeMap<u64, TspPolicy>>,
    reachable: AtomicBool,
}

impl SimPolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            policies: Mutex::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Pre-populates a policy, as another actor would have.
    pub fn seed(&self, id: u64, policy: TspPolicy) {
        self.policies
            .lock()
            .expect("policy state poisoned")
            .insert(id, policy);
    }

    /// Makes subsequent calls fail as unreachable (or reachable again).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Returns the identifiers currently stored.
    pub fn ids(&self) -> BTreeSet<u64> {
        self.policies
            .lock()
            .expect("policy state poisoned")
            .keys()
            .copied()
            .collect()
    }

    fn check_reachable(&self) -> Result<(), PolicyError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PolicyError::Unreachable {
                reason: "simulated outage".to_string(),
            })
        }
    }
}

impl Default for SimPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PolicyClient for SimPolicyStore {
    async fn list_policies(&self) -> Result<BTreeSet<u64>, PolicyError> {
        self.check_reachable()?;
        Ok(self.ids())
    }

    async fn put_policy(&self, id: u64, policy: &TspPolicy) -> Result<u16, PolicyError> {
        self.check_reachable()?;
        if let Ok(document) = serde_json::to_string(policy) {
            debug!("a1: PUT policy {id}: {document}");
        }
        self.policies
            .lock()
            .expect("policy state poisoned")
            .insert(id, policy.clone());
        Ok(201)
    }

    async fn delete_policy(&self, id: u64) -> Result<u16, PolicyError> {
        self.check_reachable()?;
        let removed = self
            .policies
            .lock()
            .expect("policy state poisoned")
            .remove(&id)
            .is_some();
        Ok(if removed { 204 } else { 404 })
    }
}

/// Predictor stub returning the mean of the submitted history, matching the
/// reference prediction service's behavior.
pub struct MeanPredictor;

#[async_trait::async_trait]
impl LoadPredictor for MeanPredictor {
    async fn predict(&self, history: &[f64]) -> Result<f64, PredictError> {
        if history.is_empty() {
            return Err(PredictError::MalformedResponse {
                reason: "empty history".to_string(),
            });
        }
        Ok(history.iter().sum::<f64>() / history.len() as f64)
    }
}

/// Measurement source replaying a fixed sequence of reports, one per poll.
pub struct ScriptedMeasurements {
    reports: VecDeque<MeasurementReport>,
}

impl ScriptedMeasurements {
    /// Creates a source that will deliver the given reports in order, then
    /// report nothing pending.
    pub fn new(reports: Vec<MeasurementReport>) -> Self {
        Self {
            reports: reports.into(),
        }
    }

    /// Returns how many reports are still queued.
    pub fn remaining(&self) -> usize {
        self.reports.len()
    }
}

#[async_trait::async_trait]
impl MeasurementSource for ScriptedMeasurements {
    async fn next_batch(&mut self) -> Result<Option<MeasurementReport>, MeasurementError> {
        Ok(self.reports.pop_front())
    }
}

/// Builds a single-metric cell report from per-cell sample rows.
pub fn cell_report(entries: &[(CellId, Vec<f64>)], timestamp_ms: u64) -> MeasurementReport {
    MeasurementReport {
        measured_entity: "ManagedElement=1,GnbDuFunction=1,NrCellDu".to_string(),
        meas_types: vec![PRB_TOT_DL.to_string()],
        cells: entries
            .iter()
            .map(|(cell_id, values)| CellMeasurement {
                cell_id: cell_id.clone(),
                values: values.iter().map(|v| vec![*v]).collect(),
            })
            .collect(),
        timestamp_ms,
    }
}

/// One cell of a simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCell {
    /// Cell identifier
    pub id: CellId,
    /// Cell-local identifier
    pub cell_local_id: u32,
}

/// A replayable simulation scenario for the demo binary: a topology plus a
/// sequence of per-cell sample rows, one report per ingestion poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimScenario {
    /// gNB identifier
    pub gnb_id: u64,
    /// gNB identifier length in bits
    pub gnb_id_length: u8,
    /// Managed cells
    pub cells: Vec<ScenarioCell>,
    /// Per-report sample values keyed by cell
    pub reports: Vec<BTreeMap<CellId, Vec<f64>>>,
}

impl SimScenario {
    /// Loads a scenario from a YAML file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, esrapp_common::Error> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let scenario = serde_yaml::from_str(&contents)?;
        Ok(scenario)
    }

    /// Builds the in-memory topology this scenario describes.
    pub fn topology(&self) -> Topology {
        let cells = self
            .cells
            .iter()
            .map(|cell| {
                (
                    cell.id.clone(),
                    TopologyEntry {
                        admin_ref: AdminRef::new(format!(
                            "ManagedElement=1,GnbDuFunction=1,NrCellDu={}",
                            cell.cell_local_id
                        )),
                        cell_local_id: cell.cell_local_id,
                    },
                )
            })
            .collect();
        Topology {
            gnb_id: self.gnb_id,
            gnb_id_length: self.gnb_id_length,
            cells,
        }
    }

    /// Builds the scripted measurement source for this scenario. Reports are
    /// stamped one reporting period (60s) apart.
    pub fn measurements(&self) -> ScriptedMeasurements {
        let reports = self
            .reports
            .iter()
            .enumerate()
            .map(|(i, values)| {
                let entries: Vec<(CellId, Vec<f64>)> = values
                    .iter()
                    .map(|(id, rows)| (id.clone(), rows.clone()))
                    .collect();
                cell_report(&entries, (i as u64 + 1) * 60_000)
            })
            .collect();
        ScriptedMeasurements::new(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esrapp_common::Plmn;

    fn two_cell_topology() -> Topology {
        let mut cells = BTreeMap::new();
        cells.insert(
            CellId::from("C1"),
            TopologyEntry {
                admin_ref: AdminRef::new("ManagedElement=1,NrCellDu=1"),
                cell_local_id: 1,
            },
        );
        cells.insert(
            CellId::from("C2"),
            TopologyEntry {
                admin_ref: AdminRef::new("ManagedElement=1,NrCellDu=2"),
                cell_local_id: 2,
            },
        );
        Topology {
            gnb_id: 1,
            gnb_id_length: 32,
            cells,
        }
    }

    #[tokio::test]
    async fn test_control_plane_lock_cycle() {
        let cm = SimControlPlane::new(two_cell_topology());
        let admin_ref = AdminRef::new("ManagedElement=1,NrCellDu=1");

        assert!(!cm.is_locked(&admin_ref));
        cm.set_administrative_state(&admin_ref, true)
            .await
            .expect("should lock");
        assert!(cm.is_locked(&admin_ref));
        cm.set_administrative_state(&admin_ref, false)
            .await
            .expect("should unlock");
        assert!(!cm.is_locked(&admin_ref));
    }

    #[tokio::test]
    async fn test_control_plane_outage() {
        let cm = SimControlPlane::new(two_cell_topology());
        cm.set_reachable(false);
        assert!(matches!(
            cm.get_topology().await,
            Err(CmError::Unreachable { .. })
        ));
        cm.set_reachable(true);
        assert!(cm.get_topology().await.is_ok());
    }

    #[tokio::test]
    async fn test_policy_store_crud() {
        let store = SimPolicyStore::new();
        let policy = TspPolicy::forbid(18, &Plmn::new("310", "410"), 1, "456DEF", 1);

        assert_eq!(store.put_policy(1000, &policy).await.unwrap(), 201);
        assert!(store.list_policies().await.unwrap().contains(&1000));
        assert_eq!(store.delete_policy(1000).await.unwrap(), 204);
        assert_eq!(store.delete_policy(1000).await.unwrap(), 404);
    }

    #[tokio::test]
    async fn test_mean_predictor() {
        let predictor = MeanPredictor;
        let value = predictor.predict(&[10.0, 20.0, 30.0]).await.unwrap();
        assert!((value - 20.0).abs() < f64::EPSILON);

        assert!(matches!(
            predictor.predict(&[]).await,
            Err(PredictError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_scripted_measurements_drain() {
        let report = cell_report(&[(CellId::from("C1"), vec![10.0, 12.0])], 60_000);
        let mut source = ScriptedMeasurements::new(vec![report.clone()]);

        let first = source.next_batch().await.unwrap();
        assert_eq!(first, Some(report));
        assert_eq!(source.next_batch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scenario_topology() {
        let scenario = SimScenario {
            gnb_id: 1,
            gnb_id_length: 32,
            cells: vec![
                ScenarioCell {
                    id: CellId::from("C1"),
                    cell_local_id: 1,
                },
                ScenarioCell {
                    id: CellId::from("C2"),
                    cell_local_id: 2,
                },
            ],
            reports: vec![BTreeMap::from([
                (CellId::from("C1"), vec![45.0]),
                (CellId::from("C2"), vec![10.0]),
            ])],
        };

        let topology = scenario.topology();
        assert_eq!(topology.cells.len(), 2);
        let mut source = scenario.measurements();
        assert_eq!(source.remaining(), 1);
        let report = source.next_batch().await.unwrap().unwrap();
        assert_eq!(report.cells.len(), 2);
        assert_eq!(report.timestamp_ms, 60_000);
    }
}
