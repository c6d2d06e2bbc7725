//! End-to-end test of the spawned control loop: scripted measurements in,
//! administrative-lock and policy commands out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use esrapp_common::{AdminRef, CellId, CellState, ControllerConfig};
use esrapp_engine::adapters::sim::{
    cell_report, MeanPredictor, ScriptedMeasurements, SimControlPlane, SimPolicyStore,
};
use esrapp_engine::adapters::{Topology, TopologyEntry};
use esrapp_engine::{
    reconcile_policies, CellRegistry, ControlLoop, DecisionEngine, EngineMessage, Task,
    TaskHandle, TspPolicy, DEFAULT_CHANNEL_CAPACITY,
};

fn two_cell_topology() -> Topology {
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

fn fast_config() -> ControllerConfig {
    let yaml = r#"
plmn:
  mcc: "310"
  mnc: "410"
window_len: 4
ingest_interval_ms: 5
decision_interval_ms: 20
"#;
    serde_yaml::from_str(yaml).expect("config")
}

#[tokio::test]
async fn control_loop_disables_and_drains_a_quiet_cell() {
    let config = fast_config();
    let cm = Arc::new(SimControlPlane::new(two_cell_topology()));
    let store = Arc::new(SimPolicyStore::new());

    // Orphan from a "previous run" plus a foreign policy; only the orphan
    // may be swept.
    let plmn = esrapp_common::Plmn::new("310", "410");
    store.seed(1_000, TspPolicy::forbid(17, &plmn, 1, "456DEF", 1));
    store.seed(5, TspPolicy::forbid(18, &plmn, 1, "456DEF", 1));
    let removed = reconcile_policies(store.as_ref(), config.policy_id_base)
        .await
        .expect("reconciliation");
    assert_eq!(removed, 1);
    assert!(store.ids().contains(&5));
    assert!(!store.ids().contains(&1_000));

    // Twelve low-load reports, then C2 drains to zero.
    let mut reports = Vec::new();
    for i in 0..12u64 {
        reports.push(cell_report(
            &[
                (CellId::from("C1"), vec![15.0]),
                (CellId::from("C2"), vec![5.0]),
            ],
            (i + 1) * 60_000,
        ));
    }
    for i in 12..48u64 {
        reports.push(cell_report(
            &[
                (CellId::from("C1"), vec![15.0]),
                (CellId::from("C2"), vec![0.0]),
            ],
            (i + 1) * 60_000,
        ));
    }

    let registry = CellRegistry::resolve(cm.as_ref()).await.expect("resolve");
    let engine = DecisionEngine::new(
        registry,
        cm.clone(),
        store.clone(),
        Arc::new(MeanPredictor),
        config.clone(),
    );
    let mut control_loop = ControlLoop::new(
        engine,
        Box::new(ScriptedMeasurements::new(reports)),
        &config,
    );

    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let handle: TaskHandle<EngineMessage> = TaskHandle::new(tx);
    let join = tokio::spawn(async move {
        control_loop.run(rx).await;
    });

    // Let the script play out: 48 reports at 5ms per ingestion.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let (status_tx, status_rx) = oneshot::channel();
    handle
        .send(EngineMessage::GetStatus {
            response_tx: status_tx,
        })
        .await
        .expect("loop alive");
    let status = status_rx.await.expect("status");

    let c2 = status
        .iter()
        .find(|s| s.id == CellId::from("C2"))
        .expect("C2 tracked");
    assert_eq!(c2.state, CellState::Disabled);
    assert!(c2.last_sample_ms.is_some());
    assert!(cm.is_locked(&AdminRef::new("NrCellDu=2")));

    // The drained cell's steering policies are still asserted (withdrawn
    // only on re-enable), alongside the untouched foreign policy.
    assert!(c2.outstanding_policies >= 1);
    assert!(store.ids().contains(&5));

    handle.shutdown().await.expect("shutdown");
    join.await.expect("join");
    assert!(handle.is_closed());
}
