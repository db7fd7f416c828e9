//! Cash-advance eligibility from forecasted sales.
//!
//! A merchant qualifies when the average forecasted month strictly exceeds
//! the threshold. The offer is the holdback share of the whole forecast
//! volume, discounted by the fee. Every decision carries the formula and the
//! parameters used so a third party can recompute it from the reply alone.

use crate::error::{ForecastError, Result};
use crate::types::forecast::ForecastPoint;
use serde::{Deserialize, Serialize};

/// Human-readable offer formula reported with every decision.
pub const OFFER_FORMULA: &str = "sales_volume * holdback / (1 + fee)";

/// Fee, holdback and threshold applied by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Fixed fee applied to the advance
    #[serde(default = "default_fee")]
    pub fee: f64,
    /// Share of future sales held back as repayment security
    #[serde(default = "default_holdback")]
    pub holdback: f64,
    /// Minimum average monthly forecast, exclusive
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_fee() -> f64 {
    0.15
}

fn default_holdback() -> f64 {
    0.10
}

fn default_threshold() -> f64 {
    30_000.0
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            holdback: default_holdback(),
            threshold: default_threshold(),
        }
    }
}

/// Offer parameters echoed back for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OfferParams {
    pub fee: f64,
    pub holdback: f64,
}

/// Outcome of an eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub merchant_id: String,
    pub eligible: bool,
    /// Mean forecast, rounded to cents
    pub average_forecast: f64,
    pub forecast_values: Vec<f64>,
    /// `None` when not eligible, never zero
    pub cash_advance_offer: Option<f64>,
    pub formula: String,
    pub params: OfferParams,
}

impl EligibilityPolicy {
    /// Evaluate a completed forecast.
    pub fn evaluate(&self, points: &[ForecastPoint]) -> Result<EligibilityDecision> {
        let first = points.first().ok_or_else(|| {
            ForecastError::InvalidInput("Invalid forecast data: no forecast points".to_string())
        })?;

        for point in points {
            if point.merchant_id != first.merchant_id {
                return Err(ForecastError::InvalidInput(format!(
                    "Invalid forecast data: points for merchants {} and {}",
                    first.merchant_id, point.merchant_id
                )));
            }
            if !point.predicted_sales.is_finite() {
                return Err(ForecastError::InvalidInput(format!(
                    "Invalid forecast data: non-finite predicted sales at {}",
                    point.forecast_period
                )));
            }
        }

        let forecast_values: Vec<f64> = points.iter().map(|p| p.predicted_sales).collect();
        let total_volume: f64 = forecast_values.iter().sum();
        let average = total_volume / forecast_values.len() as f64;

        let eligible = average > self.threshold;
        let cash_advance_offer = eligible.then(|| self.offer_for(total_volume));

        Ok(EligibilityDecision {
            merchant_id: first.merchant_id.clone(),
            eligible,
            average_forecast: round_cents(average),
            forecast_values,
            cash_advance_offer,
            formula: OFFER_FORMULA.to_string(),
            params: OfferParams {
                fee: self.fee,
                holdback: self.holdback,
            },
        })
    }

    /// Offer amount for a forecast volume, rounded to cents.
    pub fn offer_for(&self, total_volume: f64) -> f64 {
        round_cents(total_volume * self.holdback / (1.0 + self.fee))
    }
}

/// Evaluate with the default fee, holdback and threshold.
pub fn evaluate(points: &[ForecastPoint]) -> Result<EligibilityDecision> {
    EligibilityPolicy::default().evaluate(points)
}

/// Round to two decimals on the exact decimal value of `value`, ties to even.
///
/// Scaling by 100 first would round the scaled product instead, which moves
/// values sitting near a half cent to the wrong side.
pub fn round_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
