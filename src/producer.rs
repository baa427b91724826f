//! NATS producer for screening replies

use crate::types::ScreeningReply;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes replies to the requester, or to the decision subject when the
/// submission carried no reply subject
#[derive(Clone)]
pub struct DecisionProducer {
    client: Client,
    subject: String,
}

impl DecisionProducer {
    /// Create a new decision producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a reply
    pub async fn publish(&self, reply: &ScreeningReply, reply_to: Option<&Subject>) -> Result<()> {
        let payload = serde_json::to_vec(reply)?;

        let target = match reply_to {
            Some(subject) => subject.clone(),
            None => Subject::from(self.subject.as_str()),
        };

        self.client.publish(target.clone(), payload.into()).await?;

        debug!(
            reply_id = %reply.reply_id,
            application_id = %reply.application_id,
            subject = %target,
            status = ?reply.status,
            "Published screening reply"
        );

        Ok(())
    }

    /// Get the default decision subject
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
