//! Cash-Advance Forecaster Library
//!
//! Forecasts a merchant's monthly sales several months ahead with a
//! single-step model applied autoregressively, and turns the forecast into a
//! cash-advance eligibility decision and offer.

pub mod config;
pub mod consumer;
pub mod dataset;
pub mod eligibility;
pub mod error;
pub mod feature_deriver;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use dataset::Dataset;
pub use eligibility::{EligibilityDecision, EligibilityPolicy};
pub use error::{ForecastError, Result};
pub use feature_deriver::{FeatureDeriver, FeatureVector};
pub use forecast::ForecastEngine;
pub use models::{OnnxSalesPredictor, SalesPredictor};
pub use pipeline::{MerchantPipeline, PipelineOutput};
pub use producer::ReplyProducer;
pub use types::{ForecastPoint, Period, TransactionRecord};
