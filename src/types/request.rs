//! Wire messages exchanged with the forecasting service

use crate::eligibility::EligibilityDecision;
use crate::error::ForecastError;
use crate::pipeline::PipelineOutput;
use crate::types::forecast::ForecastPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to forecast one merchant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub merchant_id: String,
}

/// Successful reply: the forecast and the decision derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Unique reply identifier
    pub request_id: String,
    pub merchant_id: String,
    pub generated_at: DateTime<Utc>,
    pub forecast: Vec<ForecastPoint>,
    pub decision: EligibilityDecision,
}

impl ForecastResponse {
    pub fn new(merchant_id: impl Into<String>, output: PipelineOutput) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            merchant_id: merchant_id.into(),
            generated_at: Utc::now(),
            forecast: output.forecast,
            decision: output.decision,
        }
    }
}

/// Failure reply carrying the error kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastFailure {
    pub request_id: String,
    pub merchant_id: String,
    pub error_kind: String,
    pub message: String,
}

impl ForecastFailure {
    pub fn new(merchant_id: impl Into<String>, error: &ForecastError) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            merchant_id: merchant_id.into(),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Either reply, serialized untagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForecastReply {
    Success(ForecastResponse),
    Failure(ForecastFailure),
}

impl ForecastReply {
    /// Wrap a pipeline result for the given merchant.
    pub fn from_result(merchant_id: &str, result: crate::error::Result<PipelineOutput>) -> Self {
        match result {
            Ok(output) => ForecastReply::Success(ForecastResponse::new(merchant_id, output)),
            Err(error) => ForecastReply::Failure(ForecastFailure::new(merchant_id, &error)),
        }
    }

    pub fn merchant_id(&self) -> &str {
        match self {
            ForecastReply::Success(r) => &r.merchant_id,
            ForecastReply::Failure(f) => &f.merchant_id,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            ForecastReply::Success(r) => &r.request_id,
            ForecastReply::Failure(f) => &f.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility;
    use crate::types::period::Period;

    fn output(sales: f64) -> PipelineOutput {
        let forecast = vec![ForecastPoint {
            merchant_id: "m-1".to_string(),
            forecast_period: Period::new(2024, 1).unwrap(),
            predicted_sales: sales,
        }];
        let decision = eligibility::evaluate(&forecast).unwrap();
        PipelineOutput { forecast, decision }
    }

    #[test]
    fn test_success_reply_round_trip() {
        let reply = ForecastReply::Success(ForecastResponse::new("m-1", output(50_000.0)));
        let json = serde_json::to_string(&reply).unwrap();
        let back: ForecastReply = serde_json::from_str(&json).unwrap();

        match back {
            ForecastReply::Success(r) => {
                assert_eq!(r.merchant_id, "m-1");
                assert!(r.decision.eligible);
                assert_eq!(r.forecast[0].forecast_period.to_string(), "2024-01");
            }
            ForecastReply::Failure(_) => panic!("expected success"),
        }
    }

    #[test]
    fn test_failure_reply_carries_kind() {
        let err = ForecastError::MerchantNotFound("ghost".to_string());
        let reply = ForecastReply::from_result("ghost", Err(err));

        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["error_kind"], "merchant_not_found");
        assert_eq!(value["merchant_id"], "ghost");
        assert_eq!(reply.merchant_id(), "ghost");
        assert!(!reply.request_id().is_empty());
    }

    #[test]
    fn test_request_parsing() {
        let request: ForecastRequest = serde_json::from_str(r#"{"merchant_id":"abc"}"#).unwrap();
        assert_eq!(request.merchant_id, "abc");
    }
}
