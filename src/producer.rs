//! NATS message producer for forecast replies

use crate::types::request::ForecastReply;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing forecast replies to NATS
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
    subject: String,
}

impl ReplyProducer {
    /// Create a new reply producer publishing to `subject` by default
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a reply to the request's inbox, or to the default subject
    pub async fn publish(&self, reply: &ForecastReply, inbox: Option<Subject>) -> Result<()> {
        let payload = serde_json::to_vec(reply)?;
        let subject = reply_subject(inbox, &self.subject);

        self.client
            .publish(subject.clone(), payload.into())
            .await?;

        debug!(
            request_id = %reply.request_id(),
            merchant_id = %reply.merchant_id(),
            subject = %subject,
            "Published forecast reply"
        );

        Ok(())
    }

    /// Get the default subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Requests sent with `request()` carry an inbox; fire-and-forget ones go
/// to the default subject.
fn reply_subject(inbox: Option<Subject>, default_subject: &str) -> Subject {
    inbox.unwrap_or_else(|| Subject::from(default_subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_goes_to_inbox() {
        let inbox = Subject::from("_INBOX.abc123");
        let subject = reply_subject(Some(inbox), "forecast.decisions");
        assert_eq!(subject.as_str(), "_INBOX.abc123");
    }

    #[test]
    fn test_reply_falls_back_to_default_subject() {
        let subject = reply_subject(None, "forecast.decisions");
        assert_eq!(subject.as_str(), "forecast.decisions");
    }
}
