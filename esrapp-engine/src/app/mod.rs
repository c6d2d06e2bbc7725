//! Controller application module.
//!
//! Startup (configuration loading, policy reconciliation) and the control
//! loop that ties measurement ingestion to decision evaluation.

mod bootstrap;
mod config_loader;
mod task;

pub use bootstrap::{reconcile_policies, BootstrapError};
pub use config_loader::{
    load_and_validate_config, load_config, load_config_from_str, validate_config, ConfigError,
    ConfigValidationError,
};
pub use task::ControlLoop;
