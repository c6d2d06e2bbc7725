//! esrapp - RAN energy-saving controller
//!
//! Binary entry point: loads the controller configuration and a replayable
//! scenario, reconciles orphaned policies, resolves the topology, and runs
//! the control loop until interrupted.
//!
//! # Usage
//!
//! ```bash
//! es-rapp -c config/controller.yaml -s config/scenario.yaml
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use esrapp_common::{init_logging, LogLevel};
use esrapp_engine::adapters::sim::{MeanPredictor, SimControlPlane, SimPolicyStore, SimScenario};
use esrapp_engine::{
    load_and_validate_config, reconcile_policies, CellRegistry, ControlLoop, DecisionEngine,
    EngineMessage, Task, TaskHandle, DEFAULT_CHANNEL_CAPACITY,
};

/// esrapp - RAN energy-saving controller
#[derive(Parser, Debug)]
#[command(name = "es-rapp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the controller configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: String,

    /// Path to the replay scenario file (YAML)
    #[arg(short = 's', long = "scenario", value_name = "FILE")]
    scenario_file: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(LogLevel::Info);

    let args = Args::parse();

    println!("esrapp - RAN Energy-Saving Controller");
    println!("=====================================");

    match run_controller(args).await {
        Ok(()) => {
            info!("Controller exited successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Controller failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_controller(args: Args) -> Result<()> {
    info!("Loading configuration from: {}", args.config_file);
    let config = load_and_validate_config(&args.config_file)
        .with_context(|| format!("Failed to load configuration from {}", args.config_file))?;

    info!(
        "Configuration loaded: mode={:?}, window={}, decisions every {}ms",
        config.mode, config.window_len, config.decision_interval_ms
    );

    let scenario = SimScenario::load(&args.scenario_file)
        .with_context(|| format!("Failed to load scenario from {}", args.scenario_file))?;
    info!(
        "Scenario loaded: {} cell(s), {} report(s)",
        scenario.cells.len(),
        scenario.reports.len()
    );

    let cm = Arc::new(SimControlPlane::new(scenario.topology()));
    let store = Arc::new(SimPolicyStore::new());
    let predictor = Arc::new(MeanPredictor);

    // Startup is fatal on an unreachable store or an empty topology; the
    // loop never starts with unknown orphan state.
    let removed = reconcile_policies(store.as_ref(), config.policy_id_base)
        .await
        .context("Policy reconciliation failed")?;
    info!("Policy reconciliation complete ({removed} orphaned policies removed)");

    let registry = CellRegistry::resolve(cm.as_ref())
        .await
        .context("Topology resolution failed")?;

    let engine = DecisionEngine::new(registry, cm, store, predictor, config.clone());
    let mut control_loop = ControlLoop::new(engine, Box::new(scenario.measurements()), &config);

    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let handle: TaskHandle<EngineMessage> = TaskHandle::new(tx);
    let join = tokio::spawn(async move {
        control_loop.run(rx).await;
    });
    info!("Control loop task spawned");

    signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, initiating shutdown...");

    // Final status snapshot before stopping the loop.
    let (status_tx, status_rx) = oneshot::channel();
    if handle
        .send(EngineMessage::GetStatus {
            response_tx: status_tx,
        })
        .await
        .is_ok()
    {
        if let Ok(status) = status_rx.await {
            for cell in status {
                info!(
                    "cell {}: {} (aggregate: {}, outstanding policies: {})",
                    cell.id,
                    cell.state,
                    cell.aggregate
                        .map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
                    cell.outstanding_policies
                );
            }
        }
    }

    let _ = handle.shutdown().await;
    join.await.context("Control loop task panicked")?;

    info!("Shutdown complete");
    Ok(())
}
