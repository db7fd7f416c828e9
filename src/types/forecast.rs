//! Forecast output records

use crate::types::period::Period;
use serde::{Deserialize, Serialize};

/// One projected month of sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub merchant_id: String,
    /// Serialized as `YYYY-MM`
    pub forecast_period: Period,
    pub predicted_sales: f64,
}
