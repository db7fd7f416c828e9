//! Error taxonomy for the forecasting core.
//!
//! Every failure the core can surface has a named variant. None of them are
//! retried: the computations are deterministic, so the caller has to supply
//! new input before a retry could change the outcome.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Malformed or empty data handed to a core component.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough trailing periods to seed the feature window.
    #[error(
        "Insufficient history for merchant {merchant_id}: {available} periods available, {required} required"
    )]
    InsufficientHistory {
        merchant_id: String,
        available: usize,
        required: usize,
    },

    /// The predictor failed or returned a non-finite value.
    #[error("Predictor error: {0}")]
    PredictorError(String),

    /// No history rows exist for the requested merchant.
    #[error("Merchant ID not found: {0}")]
    MerchantNotFound(String),
}

impl ForecastError {
    /// Stable machine-readable name, used in wire replies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InvalidInput(_) => "invalid_input",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::PredictorError(_) => "predictor_error",
            ForecastError::MerchantNotFound(_) => "merchant_not_found",
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            ForecastError::InvalidInput("empty".to_string()),
            ForecastError::InsufficientHistory {
                merchant_id: "m1".to_string(),
                available: 2,
                required: 4,
            },
            ForecastError::PredictorError("nan".to_string()),
            ForecastError::MerchantNotFound("m2".to_string()),
        ];

        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
    }

    #[test]
    fn test_insufficient_history_message() {
        let err = ForecastError::InsufficientHistory {
            merchant_id: "m1".to_string(),
            available: 2,
            required: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history for merchant m1: 2 periods available, 4 required"
        );
    }
}
