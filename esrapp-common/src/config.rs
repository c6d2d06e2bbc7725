//! Configuration structures for the energy-saving controller.
//!
//! The controller is configured from a single YAML document. Thresholds and
//! cadences carry defaults matching the reference deployment, so a minimal
//! configuration only needs the PLMN and slice scope used in policy
//! documents.

use serde::{Deserialize, Serialize};

use crate::types::{CellId, Plmn};

/// How the capacity policy decides on enable/disable transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    /// Compare per-cell and fleet-average utilization against fixed bounds.
    #[default]
    Threshold,
    /// Submit the fleet utilization history to the load predictor and
    /// compare the returned scalar against a single bound.
    Prediction,
}

/// Bounds for the threshold decision mode (PRB utilization percentages).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Enable a cell when the maximum per-cell aggregate exceeds this
    #[serde(default = "default_enable_max")]
    pub enable_max: f64,
    /// ...and the fleet average exceeds this
    #[serde(default = "default_enable_avg")]
    pub enable_avg: f64,
    /// Disable a cell when the fleet average falls below this
    #[serde(default = "default_disable_avg")]
    pub disable_avg: f64,
}

fn default_enable_max() -> f64 {
    40.0
}

fn default_enable_avg() -> f64 {
    30.0
}

fn default_disable_avg() -> f64 {
    20.0
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            enable_max: default_enable_max(),
            enable_avg: default_enable_avg(),
            disable_avg: default_disable_avg(),
        }
    }
}

/// Bound for the prediction decision mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Enable a cell when predicted load exceeds this; disable one below it
    #[serde(default = "default_load_bound")]
    pub load_bound: f64,
}

fn default_load_bound() -> f64 {
    80.0
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            load_bound: default_load_bound(),
        }
    }
}

/// Network-slice scope stamped into every steering policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Slice/Service Type
    #[serde(default = "default_sst")]
    pub sst: u8,
    /// Slice Differentiator (hex string)
    #[serde(default = "default_sd")]
    pub sd: String,
}

fn default_sst() -> u8 {
    1
}

fn default_sd() -> String {
    "456DEF".to_string()
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            sst: default_sst(),
            sd: default_sd(),
        }
    }
}

/// How the enable-one-cell algorithm picks among DISABLED candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionConfig {
    /// Uniformly at random among candidates.
    #[default]
    Random,
    /// A fixed designated cell (falls back to the first candidate when the
    /// designated cell is not currently disabled).
    Fixed {
        /// The designated cell
        cell: CellId,
    },
}

/// Top-level controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// PLMN stamped into policy documents
    pub plmn: Plmn,
    /// Slice scope stamped into policy documents
    #[serde(default)]
    pub slice: SliceConfig,
    /// Capacity decision mode
    #[serde(default)]
    pub mode: DecisionMode,
    /// Threshold-mode bounds
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Prediction-mode bound
    #[serde(default)]
    pub prediction: PredictionConfig,
    /// Enable-candidate selection strategy
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Milliseconds between measurement-ingestion polls
    #[serde(default = "default_ingest_interval_ms")]
    pub ingest_interval_ms: u64,
    /// Milliseconds between decision evaluations
    #[serde(default = "default_decision_interval_ms")]
    pub decision_interval_ms: u64,
    /// Capacity of each per-cell utilization window
    #[serde(default = "default_window_len")]
    pub window_len: usize,
    /// Minimum accumulated samples before any decision is taken
    #[serde(default = "default_min_history_depth")]
    pub min_history_depth: usize,
    /// First policy identifier in this controller's reserved range
    #[serde(default = "default_policy_id_base")]
    pub policy_id_base: u64,
    /// 5QI classes to issue one steering policy each per disable event
    #[serde(default = "default_qos_classes")]
    pub qos_classes: Vec<u8>,
    /// Bounded timeout applied to every control-plane/predictor call
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    /// Transmit-power level applied when a cell is locked (omit to skip)
    #[serde(default)]
    pub power_down_level: Option<i32>,
}

fn default_ingest_interval_ms() -> u64 {
    1_000
}

fn default_decision_interval_ms() -> u64 {
    10_000
}

fn default_window_len() -> usize {
    20
}

fn default_min_history_depth() -> usize {
    10
}

fn default_policy_id_base() -> u64 {
    1_000
}

fn default_qos_classes() -> Vec<u8> {
    vec![1]
}

fn default_adapter_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let yaml = "plmn:\n  mcc: \"310\"\n  mnc: \"410\"\n";
        let config: ControllerConfig = serde_yaml::from_str(yaml).expect("should parse");

        assert_eq!(config.mode, DecisionMode::Threshold);
        assert_eq!(config.thresholds.enable_max, 40.0);
        assert_eq!(config.thresholds.enable_avg, 30.0);
        assert_eq!(config.thresholds.disable_avg, 20.0);
        assert_eq!(config.prediction.load_bound, 80.0);
        assert_eq!(config.selection, SelectionConfig::Random);
        assert_eq!(config.ingest_interval_ms, 1_000);
        assert_eq!(config.decision_interval_ms, 10_000);
        assert_eq!(config.window_len, 20);
        assert_eq!(config.min_history_depth, 10);
        assert_eq!(config.policy_id_base, 1_000);
        assert_eq!(config.qos_classes, vec![1]);
        assert_eq!(config.adapter_timeout_ms, 10_000);
        assert_eq!(config.power_down_level, None);
        assert_eq!(config.slice.sst, 1);
        assert_eq!(config.slice.sd, "456DEF");
    }

    #[test]
    fn test_full_config_round_trip() {
        let config = ControllerConfig {
            plmn: Plmn::new("001", "01"),
            slice: SliceConfig {
                sst: 2,
                sd: "ABC123".to_string(),
            },
            mode: DecisionMode::Prediction,
            thresholds: ThresholdConfig::default(),
            prediction: PredictionConfig { load_bound: 95.0 },
            selection: SelectionConfig::Fixed {
                cell: CellId::from("S1/B1/C1"),
            },
            ingest_interval_ms: 500,
            decision_interval_ms: 5_000,
            window_len: 30,
            min_history_depth: 15,
            policy_id_base: 2_000,
            qos_classes: vec![1, 2],
            adapter_timeout_ms: 3_000,
            power_down_level: Some(0),
        };

        let yaml = serde_yaml::to_string(&config).expect("should serialize");
        let parsed: ControllerConfig = serde_yaml::from_str(&yaml).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_mode_parsing() {
        let yaml = "plmn:\n  mcc: \"310\"\n  mnc: \"410\"\nmode: prediction\n";
        let config: ControllerConfig = serde_yaml::from_str(yaml).expect("should parse");
        assert_eq!(config.mode, DecisionMode::Prediction);
    }
}
