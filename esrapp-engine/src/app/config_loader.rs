//! Configuration loading and validation for the controller.
//!
//! Wraps the `ControllerConfig` from `esrapp-common` with file loading and
//! the cross-field checks a deployable configuration must pass.

use std::path::Path;

use esrapp_common::ControllerConfig;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Invalid ingestion/decision cadence
    #[error("Invalid cadence: {0}")]
    InvalidCadence(String),

    /// Invalid utilization-window sizing
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Invalid decision thresholds
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    /// No QoS classes configured for policy issuance
    #[error("No QoS classes configured: at least one 5QI must be specified")]
    NoQosClasses,

    /// Invalid reserved policy-identifier range
    #[error("Invalid policy-identifier base: {0}")]
    InvalidPolicyBase(String),
}

/// Loads a controller configuration from a YAML file.
///
/// Parsing only; call `validate_config` for the cross-field checks, or use
/// `load_and_validate_config` for both.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ControllerConfig, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: ControllerConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    Ok(config)
}

/// Loads a controller configuration from a YAML string.
pub fn load_config_from_str(yaml: &str) -> Result<ControllerConfig, ConfigError> {
    let config: ControllerConfig =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    Ok(config)
}

/// Validates a controller configuration.
pub fn validate_config(config: &ControllerConfig) -> Result<(), ConfigValidationError> {
    if config.ingest_interval_ms == 0 {
        return Err(ConfigValidationError::InvalidCadence(
            "ingest_interval_ms must be greater than zero".to_string(),
        ));
    }
    if config.decision_interval_ms < config.ingest_interval_ms {
        return Err(ConfigValidationError::InvalidCadence(format!(
            "decision_interval_ms ({}) must not be shorter than ingest_interval_ms ({})",
            config.decision_interval_ms, config.ingest_interval_ms
        )));
    }
    if config.window_len == 0 {
        return Err(ConfigValidationError::InvalidWindow(
            "window_len must be greater than zero".to_string(),
        ));
    }
    if config.min_history_depth == 0 {
        return Err(ConfigValidationError::InvalidWindow(
            "min_history_depth must be greater than zero".to_string(),
        ));
    }
    if config.thresholds.disable_avg >= config.thresholds.enable_avg {
        return Err(ConfigValidationError::InvalidThresholds(format!(
            "disable_avg ({}) must be below enable_avg ({})",
            config.thresholds.disable_avg, config.thresholds.enable_avg
        )));
    }
    if config.prediction.load_bound <= 0.0 {
        return Err(ConfigValidationError::InvalidThresholds(format!(
            "prediction load_bound ({}) must be positive",
            config.prediction.load_bound
        )));
    }
    if config.qos_classes.is_empty() {
        return Err(ConfigValidationError::NoQosClasses);
    }
    if config.policy_id_base == 0 {
        return Err(ConfigValidationError::InvalidPolicyBase(
            "policy_id_base must be greater than zero to stay clear of foreign policies"
                .to_string(),
        ));
    }
    Ok(())
}

/// Loads and validates a controller configuration in one step.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ControllerConfig, ConfigError> {
    let config = load_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = "plmn:\n  mcc: \"310\"\n  mnc: \"410\"\n";

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(MINIMAL).expect("should parse");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(MINIMAL.as_bytes()).expect("write");

        let config = load_and_validate_config(file.path()).expect("should load");
        assert_eq!(config.plmn.mcc, "310");
    }

    #[test]
    fn test_missing_file_fails() {
        let result = load_config("/nonexistent/controller.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_malformed_yaml_fails() {
        let result = load_config_from_str("plmn: [not a plmn");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_zero_ingest_interval_rejected() {
        let mut config = load_config_from_str(MINIMAL).expect("should parse");
        config.ingest_interval_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidCadence(_))
        ));
    }

    #[test]
    fn test_decision_faster_than_ingest_rejected() {
        let mut config = load_config_from_str(MINIMAL).expect("should parse");
        config.ingest_interval_ms = 1_000;
        config.decision_interval_ms = 500;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidCadence(_))
        ));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = load_config_from_str(MINIMAL).expect("should parse");
        config.thresholds.disable_avg = 35.0;
        config.thresholds.enable_avg = 30.0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_empty_qos_classes_rejected() {
        let mut config = load_config_from_str(MINIMAL).expect("should parse");
        config.qos_classes.clear();
        assert_eq!(
            validate_config(&config),
            Err(ConfigValidationError::NoQosClasses)
        );
    }

    #[test]
    fn test_zero_policy_base_rejected() {
        let mut config = load_config_from_str(MINIMAL).expect("should parse");
        config.policy_id_base = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigValidationError::InvalidPolicyBase(_))
        ));
    }
}
