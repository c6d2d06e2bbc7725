//! Common types and utilities for esrapp
//!
//! This crate provides shared types, configuration structures, and utilities
//! used across the esrapp energy-saving controller crates.

pub mod cadence;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use cadence::DecisionCadence;
pub use config::{
    ControllerConfig, DecisionMode, PredictionConfig, SelectionConfig, SliceConfig,
    ThresholdConfig,
};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, LogLevel};
pub use types::*;
