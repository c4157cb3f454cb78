use anyhow::{Context, Result};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, GuildId};
use crate::voice::VoicePacket;

/// Audio frame bridged from the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceFrameMessage {
    pub channel_id: ChannelId,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub pcm: String, // Base64-encoded 16-bit LE PCM
}

impl VoiceFrameMessage {
    pub fn into_packet(self) -> Result<VoicePacket> {
        let payload = base64::engine::general_purpose::STANDARD
            .decode(&self.pcm)
            .with_context(|| format!("Invalid PCM payload in frame {}", self.sequence))?;

        Ok(VoicePacket {
            sequence: self.sequence,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
            payload: Bytes::from(payload),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Connect,
    Speaking,
    Disconnect,
}

/// Request sent to the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub action: ControlAction,
    #[serde(default)]
    pub speaking: bool,
    pub timestamp: String, // RFC3339 timestamp
}

/// Gateway reply to a connect request
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectReply {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Message posted back to a channel
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub channel_id: ChannelId,
    pub text: String,
    pub timestamp: String, // RFC3339 timestamp
}
