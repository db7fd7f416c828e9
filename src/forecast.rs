//! Autoregressive multi-month forecasting.
//!
//! The model only predicts one month ahead. To project several months, each
//! prediction is appended to a working history as if it had been observed,
//! and the next month's lag and rolling features are computed from that
//! augmented tail. Errors compound across the horizon; consumers replay this
//! loop to validate forecasts, so the feature update must stay exactly as
//! written here.

use crate::error::{ForecastError, Result};
use crate::feature_deriver::{FeatureDeriver, FeatureVector, MIN_HISTORY};
use crate::models::predictor::SalesPredictor;
use crate::types::forecast::ForecastPoint;
use crate::types::period::Period;
use crate::types::transaction::TransactionRecord;
use tracing::debug;

/// Append-only history the forecast loop extends one month at a time.
#[derive(Debug, Clone)]
pub struct WorkingHistory {
    records: Vec<TransactionRecord>,
    latest_features: FeatureVector,
}

impl WorkingHistory {
    /// Seed from observed history, deriving the feature row of its most
    /// recent month.
    pub fn seed(
        deriver: &FeatureDeriver,
        merchant_index: i64,
        history: &[TransactionRecord],
    ) -> Result<Self> {
        let merchant_id = history
            .first()
            .map(|r| r.merchant_id.clone())
            .unwrap_or_default();

        let latest_features = deriver
            .derive(merchant_index, history)?
            .pop()
            .map(|row| row.features)
            .ok_or(ForecastError::InsufficientHistory {
                merchant_id,
                available: history.len(),
                required: MIN_HISTORY,
            })?;

        Ok(Self {
            records: history.to_vec(),
            latest_features,
        })
    }

    /// Most recent record, observed or synthetic.
    pub fn latest(&self) -> &TransactionRecord {
        // seed() guarantees at least MIN_HISTORY records
        &self.records[self.records.len() - 1]
    }

    /// Features for the month after the current tail.
    pub fn next_features(
        &self,
        deriver: &FeatureDeriver,
        period: Period,
    ) -> Result<FeatureVector> {
        deriver.extend(
            self.latest_features.merchant_index,
            period,
            &self.records,
            &self.latest_features,
        )
    }

    /// Record a predicted month as if it had been observed.
    pub fn push(&mut self, record: TransactionRecord, features: FeatureVector) {
        self.records.push(record);
        self.latest_features = features;
    }
}

/// Projects future monthly sales for one merchant.
#[derive(Debug, Clone, Copy)]
pub struct ForecastEngine {
    deriver: FeatureDeriver,
}

impl ForecastEngine {
    pub fn new(deriver: FeatureDeriver) -> Self {
        Self { deriver }
    }

    /// Forecast `horizon` months following the last month of `history`.
    ///
    /// `history` is one merchant's observed months in ascending order. The
    /// latest month needs three trailing months for a seed feature row.
    pub fn forecast<P: SalesPredictor + ?Sized>(
        &self,
        merchant_index: i64,
        history: &[TransactionRecord],
        predictor: &P,
        horizon: usize,
    ) -> Result<Vec<ForecastPoint>> {
        if horizon == 0 {
            return Err(ForecastError::InvalidInput(
                "forecast horizon must be positive".to_string(),
            ));
        }

        let mut working = WorkingHistory::seed(&self.deriver, merchant_index, history)?;
        let merchant_id = working.latest().merchant_id.clone();
        let anchor = working.latest().period;
        let mut points = Vec::with_capacity(horizon);

        for step in 1..=horizon {
            let period = anchor.plus_months(step as u32);
            let features = working.next_features(&self.deriver, period)?;

            let predicted_sales = predictor
                .predict(&features)
                .map_err(|e| ForecastError::PredictorError(format!("{:#}", e)))?;
            if !predicted_sales.is_finite() {
                return Err(ForecastError::PredictorError(format!(
                    "non-finite prediction {} for merchant {} at {}",
                    predicted_sales, merchant_id, period
                )));
            }

            debug!(
                merchant_id = %merchant_id,
                step = step,
                period = %period,
                sales_lag_1 = features.sales_lag_1,
                rolling_mean_3 = features.rolling_mean_3,
                predicted_sales = predicted_sales,
                "Forecast step"
            );

            working.push(
                TransactionRecord::new(merchant_id.clone(), period, predicted_sales),
                features,
            );
            points.push(ForecastPoint {
                merchant_id: merchant_id.clone(),
                forecast_period: period,
                predicted_sales,
            });
        }

        Ok(points)
    }
}
