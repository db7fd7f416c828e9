//! Feature derivation for sales forecasting model inference.
//!
//! Computes the lag, rolling-window and calendar features the forecasting
//! model is trained on. Rows are dropped exactly where the training
//! preprocessing drops them (any period without three full trailing
//! periods), so inference never sees a feature row that training would not.
//!
//! Every feature for period *t* is computed from sales strictly before *t*.

use crate::error::{ForecastError, Result};
use crate::types::period::Period;
use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Number of trailing periods in the rolling window.
pub const ROLLING_WINDOW: usize = 3;

/// Periods a merchant needs before its latest month has a feature row.
pub const MIN_HISTORY: usize = ROLLING_WINDOW + 1;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 8;

/// Feature names in the order the model consumes them.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "merchant_index",
    "month",
    "year",
    "month_index",
    "sales_lag_1",
    "sales_lag_2",
    "rolling_mean_3",
    "rolling_std_3",
];

/// Model input for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub merchant_index: i64,
    pub month: u32,
    pub year: i32,
    /// Months since January of the dataset's earliest year, 1-based
    pub month_index: i64,
    pub sales_lag_1: f64,
    pub sales_lag_2: f64,
    pub rolling_mean_3: f64,
    /// Sample (n-1) standard deviation
    pub rolling_std_3: f64,
}

impl FeatureVector {
    /// Flatten into the model's input layout (see [`FEATURE_NAMES`]).
    pub fn to_input(&self) -> [f32; FEATURE_COUNT] {
        [
            self.merchant_index as f32,
            self.month as f32,
            self.year as f32,
            self.month_index as f32,
            self.sales_lag_1 as f32,
            self.sales_lag_2 as f32,
            self.rolling_mean_3 as f32,
            self.rolling_std_3 as f32,
        ]
    }
}

/// A history row together with the features derived for its period.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedRecord {
    pub record: TransactionRecord,
    pub features: FeatureVector,
}

/// Derives model features from a single merchant's monthly history.
///
/// `earliest_year` is fixed across the whole dataset so that `month_index`
/// stays comparable between merchants sharing one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDeriver {
    earliest_year: i32,
}

impl FeatureDeriver {
    pub fn new(earliest_year: i32) -> Self {
        Self { earliest_year }
    }

    pub fn month_index(&self, period: Period) -> i64 {
        i64::from(period.year() - self.earliest_year) * 12 + i64::from(period.month())
    }

    /// Derive one feature row per period that has three trailing periods.
    ///
    /// `history` must be sorted ascending by period and belong to a single
    /// merchant. The first [`ROLLING_WINDOW`] periods produce no row.
    pub fn derive(
        &self,
        merchant_index: i64,
        history: &[TransactionRecord],
    ) -> Result<Vec<FeaturedRecord>> {
        validate_history(history)?;

        history
            .windows(MIN_HISTORY)
            .map(|window| -> Result<FeaturedRecord> {
                let (trailing, current) = window.split_at(ROLLING_WINDOW);
                let current = &current[0];
                let (rolling_mean_3, rolling_std_3) = rolling_stats(trailing)?;

                Ok(FeaturedRecord {
                    record: current.clone(),
                    features: FeatureVector {
                        merchant_index,
                        month: current.period.month(),
                        year: current.period.year(),
                        month_index: self.month_index(current.period),
                        sales_lag_1: trailing[ROLLING_WINDOW - 1].sales_amount,
                        sales_lag_2: trailing[ROLLING_WINDOW - 2].sales_amount,
                        rolling_mean_3,
                        rolling_std_3,
                    },
                })
            })
            .collect()
    }

    /// Features for the period following the tail of a working history.
    ///
    /// `previous` is the feature row stored for the most recent entry of
    /// `tail`; its `sales_lag_1` becomes the new `sales_lag_2` as is, rather
    /// than being re-read from the tail. The rolling statistics cover the
    /// last [`ROLLING_WINDOW`] entries of `tail`.
    pub fn extend(
        &self,
        merchant_index: i64,
        period: Period,
        tail: &[TransactionRecord],
        previous: &FeatureVector,
    ) -> Result<FeatureVector> {
        let window = &tail[tail.len().saturating_sub(ROLLING_WINDOW)..];
        let (rolling_mean_3, rolling_std_3) = rolling_stats(window)?;
        let latest = &window[window.len() - 1];

        Ok(FeatureVector {
            merchant_index,
            month: period.month(),
            year: period.year(),
            month_index: self.month_index(period),
            sales_lag_1: latest.sales_amount,
            sales_lag_2: previous.sales_lag_1,
            rolling_mean_3,
            rolling_std_3,
        })
    }
}

/// Mean and sample standard deviation over a full rolling window.
fn rolling_stats(window: &[TransactionRecord]) -> Result<(f64, f64)> {
    if window.len() < ROLLING_WINDOW {
        let merchant_id = window
            .first()
            .map(|r| r.merchant_id.clone())
            .unwrap_or_default();
        return Err(ForecastError::InsufficientHistory {
            merchant_id,
            available: window.len(),
            required: ROLLING_WINDOW,
        });
    }

    let n = window.len() as f64;
    let mean = window.iter().map(|r| r.sales_amount).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|r| (r.sales_amount - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);

    Ok((mean, variance.sqrt()))
}

fn validate_history(history: &[TransactionRecord]) -> Result<()> {
    let Some(first) = history.first() else {
        return Ok(());
    };

    for pair in history.windows(2) {
        if pair[1].merchant_id != first.merchant_id {
            return Err(ForecastError::InvalidInput(format!(
                "history mixes merchants {} and {}",
                first.merchant_id, pair[1].merchant_id
            )));
        }
        if pair[1].period <= pair[0].period {
            return Err(ForecastError::InvalidInput(format!(
                "history for merchant {} is not strictly ascending at {}",
                first.merchant_id, pair[1].period
            )));
        }
    }

    Ok(())
}
