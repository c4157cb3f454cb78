use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::ids::{ChannelId, GuildId};

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Starting,
    Recording,
    Stopping,
    Terminated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

/// Why a session left Recording (or never reached it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last member left an occupied channel
    ChannelEmpty,
    /// The session-wide TTL elapsed
    TtlElapsed,
    /// Explicit stop (single session or shutdown)
    Requested,
    /// Connecting or opening the writer failed or timed out
    StartupFailed,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub state: SessionState,

    /// Members currently present
    pub members: u32,

    /// Whether anyone has been present since the session started
    pub ever_occupied: bool,

    pub created_at: DateTime<Utc>,

    /// When capture started, if it did
    pub recording_started_at: Option<DateTime<Utc>>,

    pub stop_reason: Option<StopReason>,

    /// Stored recording, once uploaded
    pub artifact_id: Option<Uuid>,

    /// Last error recorded by the lifecycle
    pub error: Option<String>,

    pub frames_written: u64,
    pub read_errors: u64,
    pub write_errors: u64,
}

impl SessionStatus {
    pub fn new(session_id: Uuid, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            session_id,
            guild_id,
            channel_id,
            state: SessionState::Created,
            members: 0,
            ever_occupied: false,
            created_at: Utc::now(),
            recording_started_at: None,
            stop_reason: None,
            artifact_id: None,
            error: None,
            frames_written: 0,
            read_errors: 0,
            write_errors: 0,
        }
    }

    /// Copy the live capture counters into this snapshot
    pub fn with_capture(mut self, stats: &CaptureStats) -> Self {
        self.frames_written = stats.frames_written();
        self.read_errors = stats.read_errors();
        self.write_errors = stats.write_errors();
        self
    }
}

/// Counters maintained by the capture loop
#[derive(Debug, Default)]
pub struct CaptureStats {
    frames_written: AtomicU64,
    read_errors: AtomicU64,
    write_errors: AtomicU64,
}

impl CaptureStats {
    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn frame_written(&self) -> u64 {
        self.frames_written.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn read_failed(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failed(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }
}
