use anyhow::Result;

use crate::ids::ChannelId;

/// Posts a result message back to a channel
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<()>;
}
