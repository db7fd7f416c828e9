//! Per-merchant forecast and eligibility pipeline

use crate::dataset::Dataset;
use crate::eligibility::{EligibilityDecision, EligibilityPolicy};
use crate::error::{ForecastError, Result};
use crate::feature_deriver::MIN_HISTORY;
use crate::forecast::ForecastEngine;
use crate::models::predictor::SalesPredictor;
use crate::types::forecast::ForecastPoint;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

/// Default number of months forecast per request.
pub const DEFAULT_HORIZON: usize = 6;

/// Forecast and decision for one merchant, computed together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub forecast: Vec<ForecastPoint>,
    pub decision: EligibilityDecision,
}

/// Runs history selection, forecasting and eligibility for one merchant.
#[derive(Debug, Clone, Copy)]
pub struct MerchantPipeline {
    policy: EligibilityPolicy,
    horizon: usize,
}

impl MerchantPipeline {
    pub fn new(policy: EligibilityPolicy, horizon: usize) -> Self {
        Self { policy, horizon }
    }

    /// Forecast and evaluate one merchant. Errors propagate unchanged.
    pub fn run<P: SalesPredictor + ?Sized>(
        &self,
        merchant_id: &str,
        dataset: &Dataset,
        predictor: &P,
    ) -> Result<PipelineOutput> {
        let history = dataset.merchant_history(merchant_id);
        if history.is_empty() {
            return Err(ForecastError::MerchantNotFound(merchant_id.to_string()));
        }

        // Only merchants with a full feature window receive a model code
        let merchant_index =
            dataset
                .merchant_index(merchant_id)
                .ok_or_else(|| ForecastError::InsufficientHistory {
                    merchant_id: merchant_id.to_string(),
                    available: history.len(),
                    required: MIN_HISTORY,
                })?;

        let engine = ForecastEngine::new(dataset.deriver());
        let forecast = engine.forecast(merchant_index, history, predictor, self.horizon)?;
        let decision = self.policy.evaluate(&forecast)?;

        info!(
            merchant_id = %merchant_id,
            eligible = decision.eligible,
            average_forecast = decision.average_forecast,
            cash_advance_offer = ?decision.cash_advance_offer,
            "Forecast and eligibility computed"
        );

        Ok(PipelineOutput { forecast, decision })
    }

    /// Run several merchants in parallel; results keep the input order.
    pub fn run_many<P: SalesPredictor + ?Sized>(
        &self,
        merchant_ids: &[&str],
        dataset: &Dataset,
        predictor: &P,
    ) -> Vec<Result<PipelineOutput>> {
        merchant_ids
            .par_iter()
            .map(|id| self.run(id, dataset, predictor))
            .collect()
    }
}

impl Default for MerchantPipeline {
    fn default() -> Self {
        Self::new(EligibilityPolicy::default(), DEFAULT_HORIZON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predictor::{ConstantPredictor, NaiveLagPredictor};
    use crate::types::period::Period;
    use crate::types::transaction::TransactionRecord;

    fn dataset() -> Dataset {
        let start = Period::new(2023, 1).unwrap();
        let mut records = Vec::new();
        for (merchant, sales, months) in [("big", 40_000.0, 6), ("small", 10_000.0, 8), ("new", 50_000.0, 2)] {
            for i in 0..months {
                records.push(TransactionRecord::new(merchant, start.plus_months(i), sales));
            }
        }
        Dataset::from_records(records).unwrap()
    }

    #[test]
    fn test_run_returns_forecast_and_decision() {
        let output = MerchantPipeline::default()
            .run("big", &dataset(), &NaiveLagPredictor)
            .unwrap();

        assert_eq!(output.forecast.len(), DEFAULT_HORIZON);
        assert_eq!(output.forecast[0].forecast_period.to_string(), "2023-07");
        assert!(output.decision.eligible);
        assert_eq!(output.decision.cash_advance_offer, Some(20869.57));
        assert_eq!(
            output.decision.forecast_values,
            output.forecast.iter().map(|p| p.predicted_sales).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unknown_merchant() {
        let err = MerchantPipeline::default()
            .run("ghost", &dataset(), &NaiveLagPredictor)
            .unwrap_err();
        assert_eq!(err, ForecastError::MerchantNotFound("ghost".to_string()));
    }

    #[test]
    fn test_short_history_is_insufficient() {
        let err = MerchantPipeline::default()
            .run("new", &dataset(), &NaiveLagPredictor)
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_history");
    }

    #[test]
    fn test_custom_horizon_and_policy() {
        let policy = EligibilityPolicy {
            threshold: 5_000.0,
            ..EligibilityPolicy::default()
        };
        let output = MerchantPipeline::new(policy, 3)
            .run("small", &dataset(), &ConstantPredictor(6_000.0))
            .unwrap();

        assert_eq!(output.forecast.len(), 3);
        assert!(output.decision.eligible);
    }

    #[test]
    fn test_run_many_preserves_order() {
        let results = MerchantPipeline::default().run_many(
            &["small", "ghost", "big", "new"],
            &dataset(),
            &NaiveLagPredictor,
        );

        assert_eq!(results.len(), 4);
        assert!(!results[0].as_ref().unwrap().decision.eligible);
        assert_eq!(results[1].as_ref().unwrap_err().kind(), "merchant_not_found");
        assert!(results[2].as_ref().unwrap().decision.eligible);
        assert_eq!(results[3].as_ref().unwrap_err().kind(), "insufficient_history");
    }
}
