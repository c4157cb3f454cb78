use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use futures::stream::StreamExt;
use tracing::{debug, info};

use super::messages::{ConnectReply, ControlAction, ControlMessage, VoiceFrameMessage};
use crate::ids::{ChannelId, GuildId};
use crate::voice::{VoiceConnection, VoicePacket, VoiceTransport};

/// Voice transport backed by a NATS-connected voice gateway
///
/// Subjects:
/// - `voice.connect.channel-{id}`: connect request/reply
/// - `voice.control.channel-{id}`: speaking and disconnect announcements
/// - `voice.frame.channel-{id}`: audio frames published by the gateway
#[derive(Clone)]
pub struct NatsVoiceTransport {
    client: Client,
}

impl NatsVoiceTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Connect to NATS server
pub async fn connect(url: &str) -> Result<Client> {
    info!("Connecting to NATS at {}", url);

    let client = async_nats::connect(url)
        .await
        .context("Failed to connect to NATS")?;

    info!("Connected to NATS successfully");

    Ok(client)
}

fn control(
    guild_id: GuildId,
    channel_id: ChannelId,
    action: ControlAction,
    speaking: bool,
) -> Result<Vec<u8>> {
    let message = ControlMessage {
        guild_id,
        channel_id,
        action,
        speaking,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    Ok(serde_json::to_vec(&message)?)
}

#[async_trait::async_trait]
impl VoiceTransport for NatsVoiceTransport {
    async fn open(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceConnection>> {
        // Subscribe first so no frame published after the gateway acks is lost
        let frames = self
            .client
            .subscribe(format!("voice.frame.channel-{}", channel_id))
            .await
            .context("Failed to subscribe to voice frames")?;

        let payload = control(guild_id, channel_id, ControlAction::Connect, false)?;
        let reply = self
            .client
            .request(format!("voice.connect.channel-{}", channel_id), payload.into())
            .await
            .context("Voice gateway did not answer connect request")?;

        let reply: ConnectReply =
            serde_json::from_slice(&reply.payload).context("Invalid connect reply")?;
        if !reply.ok {
            anyhow::bail!(
                "Voice gateway refused channel {}: {}",
                channel_id,
                reply.error.unwrap_or_else(|| "no reason given".to_string())
            );
        }

        info!("Connected to voice channel {}", channel_id);

        Ok(Box::new(NatsVoiceConnection {
            client: self.client.clone(),
            frames: Some(frames),
            guild_id,
            channel_id,
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

pub struct NatsVoiceConnection {
    client: Client,
    frames: Option<Subscriber>,
    guild_id: GuildId,
    channel_id: ChannelId,
}

impl NatsVoiceConnection {
    async fn publish_control(&self, action: ControlAction, speaking: bool) -> Result<()> {
        let payload = control(self.guild_id, self.channel_id, action, speaking)?;

        self.client
            .publish(format!("voice.control.channel-{}", self.channel_id), payload.into())
            .await
            .context("Failed to publish voice control message")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl VoiceConnection for NatsVoiceConnection {
    async fn read_frame(&mut self) -> Result<VoicePacket> {
        let frames = self.frames.as_mut().context("Voice connection closed")?;

        let msg = frames
            .next()
            .await
            .context("Voice frame stream ended")?;

        let frame: VoiceFrameMessage =
            serde_json::from_slice(&msg.payload).context("Failed to parse voice frame")?;

        frame.into_packet()
    }

    async fn set_speaking(&mut self, speaking: bool) -> Result<()> {
        self.publish_control(ControlAction::Speaking, speaking).await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut frames) = self.frames.take() else {
            return Ok(());
        };

        debug!("Leaving voice channel {}", self.channel_id);

        let announced = self.publish_control(ControlAction::Disconnect, false).await;
        frames
            .unsubscribe()
            .await
            .context("Failed to unsubscribe from voice frames")?;

        announced
    }
}
