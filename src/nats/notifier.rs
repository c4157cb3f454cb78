use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

use super::messages::NotificationMessage;
use crate::ids::ChannelId;
use crate::notify::Notifier;

/// Publishes channel notifications for the chat gateway to post
#[derive(Clone)]
pub struct NatsNotifier {
    client: Client,
}

impl NatsNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Notifier for NatsNotifier {
    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        let subject = format!("voicelog.notify.channel-{}", channel_id);

        let message = NotificationMessage {
            channel_id,
            text: text.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish notification")?;

        info!("Published notification to {}", subject);

        Ok(())
    }
}
