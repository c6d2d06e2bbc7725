//! Load-predictor boundary.

use thiserror::Error;

/// Errors returned by the load predictor.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The prediction service could not be reached.
    #[error("load predictor unreachable: {reason}")]
    Unreachable {
        /// Description of the connection failure
        reason: String,
    },

    /// The service answered with something that does not parse as a load
    /// scalar.
    #[error("malformed prediction response: {reason}")]
    MalformedResponse {
        /// Description of the parse failure
        reason: String,
    },
}

/// Request/response contract with the external load predictor.
///
/// The prediction algorithm itself lives on the other side of this boundary;
/// the engine only submits an ordered utilization history and consumes the
/// returned scalar.
#[async_trait::async_trait]
pub trait LoadPredictor: Send + Sync {
    /// Predicts near-term load from an ordered utilization history.
    async fn predict(&self, history: &[f64]) -> Result<f64, PredictError>;
}
