//! NATS message consumer for incoming forecast requests

use crate::types::request::ForecastRequest;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving forecast requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to forecast request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload.
///
/// Accepts a JSON `ForecastRequest` or a bare merchant id.
pub fn parse_request(payload: &[u8]) -> Result<ForecastRequest> {
    if let Ok(request) = serde_json::from_slice::<ForecastRequest>(payload) {
        return Ok(request);
    }

    let merchant_id = std::str::from_utf8(payload)
        .context("Request payload is not UTF-8")?
        .trim();
    if merchant_id.is_empty() || merchant_id.starts_with('{') {
        anyhow::bail!("Request payload carries no merchant id");
    }

    Ok(ForecastRequest {
        merchant_id: merchant_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_request() {
        let request = parse_request(br#"{"merchant_id":"m-42"}"#).unwrap();
        assert_eq!(request.merchant_id, "m-42");
    }

    #[test]
    fn test_parse_bare_merchant_id() {
        let request = parse_request(b"  m-42\n").unwrap();
        assert_eq!(request.merchant_id, "m-42");
    }

    #[test]
    fn test_reject_empty_or_malformed() {
        assert!(parse_request(b"").is_err());
        assert!(parse_request(br#"{"merchant":"m-42"}"#).is_err());
        assert!(parse_request(&[0xff, 0xfe]).is_err());
    }
}
