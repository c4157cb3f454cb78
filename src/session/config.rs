use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ids::ChannelId;

/// Settings shared by every recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Directory for in-progress recordings
    pub tmp_dir: PathBuf,

    /// Hard upper bound on a recording, counted from entering Recording
    /// Default: 1 hour
    pub session_ttl: Duration,

    /// Bound on connecting to the channel and opening the writer
    /// Default: 5 seconds
    pub startup_timeout: Duration,

    /// Bound on each of the upload and notification steps while finalizing
    pub finalize_timeout: Duration,

    /// How long stored recordings are retained
    /// Default: 7 days
    pub artifact_ttl: Duration,

    /// Pause after a failed frame read before trying again
    pub read_error_backoff: Duration,

    /// Sample rate written to the container (voice gateway runs at 48kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Base URL that download links in notifications point at
    pub public_base_url: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from(".tmp"),
            session_ttl: Duration::from_secs(60 * 60),
            startup_timeout: Duration::from_secs(5),
            finalize_timeout: Duration::from_secs(30),
            artifact_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            read_error_backoff: Duration::from_millis(20),
            sample_rate: 48000,
            channels: 2,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl SessionSettings {
    /// Local path of the in-progress recording for a channel
    pub fn record_path(&self, channel_id: ChannelId) -> PathBuf {
        self.tmp_dir.join(format!("channel-{}.wav", channel_id))
    }

    pub fn download_link(&self, artifact_id: impl std::fmt::Display) -> String {
        format!(
            "{}/api/voices/{}",
            self.public_base_url.trim_end_matches('/'),
            artifact_id
        )
    }
}
