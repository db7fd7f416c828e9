//! Type definitions for the forecasting service

pub mod forecast;
pub mod period;
pub mod request;
pub mod transaction;

pub use forecast::ForecastPoint;
pub use period::Period;
pub use request::{ForecastFailure, ForecastReply, ForecastRequest, ForecastResponse};
pub use transaction::TransactionRecord;
