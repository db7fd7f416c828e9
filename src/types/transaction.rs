//! Monthly transaction aggregates, the raw input of the forecasting core

use crate::types::period::Period;
use serde::{Deserialize, Serialize};

/// One merchant's total sales for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Anonymous merchant identifier
    #[serde(alias = "anonymous_uu_id")]
    pub merchant_id: String,

    /// Calendar month the sales belong to
    #[serde(alias = "transaction_month")]
    pub period: Period,

    /// Total sales for the month
    pub sales_amount: f64,
}

impl TransactionRecord {
    /// Create a new record
    pub fn new(merchant_id: impl Into<String>, period: Period, sales_amount: f64) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            period,
            sales_amount,
        }
    }
}
