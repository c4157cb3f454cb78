use anyhow::Result;
use bytes::Bytes;

use crate::ids::{ChannelId, GuildId};

/// One encoded audio frame received from a voice channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePacket {
    /// Transport sequence number (wraps at u16::MAX)
    pub sequence: u16,
    /// Media timestamp in sample ticks
    pub timestamp: u32,
    /// Synchronization source of the sender
    pub ssrc: u32,
    /// Frame payload (16-bit little-endian PCM for the NATS bridge)
    pub payload: Bytes,
}

/// Voice transport capability
///
/// Implementations:
/// - NATS: frames bridged from the voice gateway (`crate::nats::NatsVoiceTransport`)
/// - In-memory mocks for tests
#[async_trait::async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Connect to a voice channel
    async fn open(&self, guild_id: GuildId, channel_id: ChannelId)
        -> Result<Box<dyn VoiceConnection>>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// An open connection to a single voice channel
#[async_trait::async_trait]
pub trait VoiceConnection: Send {
    /// Wait for the next audio frame
    ///
    /// Must be cancel-safe: the capture loop races it against its
    /// cancellation token and drops the future on stop.
    async fn read_frame(&mut self) -> Result<VoicePacket>;

    /// Announce (or withdraw) presence in the channel
    async fn set_speaking(&mut self, speaking: bool) -> Result<()>;

    /// Leave the channel and release transport resources
    async fn close(&mut self) -> Result<()>;
}
