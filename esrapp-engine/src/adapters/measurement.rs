//! Measurement-source boundary.

use esrapp_common::MeasurementReport;
use thiserror::Error;

/// Errors returned by the measurement source.
#[derive(Debug, Error)]
pub enum MeasurementError {
    /// The source is temporarily unable to deliver reports.
    #[error("measurement source unavailable: {reason}")]
    Unavailable {
        /// Description of the failure
        reason: String,
    },
}

/// Non-blocking poll for the next pending measurement batch.
///
/// How reports arrive (filesystem drop directory, message queue, push
/// endpoint) and how the wire format is decoded are the collaborator's
/// concern; the loop only ever pulls at most one already-parsed report per
/// iteration.
#[async_trait::async_trait]
pub trait MeasurementSource: Send {
    /// Returns the next pending report, or `None` when nothing is waiting.
    async fn next_batch(&mut self) -> Result<Option<MeasurementReport>, MeasurementError>;
}
