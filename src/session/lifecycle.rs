use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::capture::{CaptureLoop, CaptureTask};
use super::config::SessionSettings;
use super::error::SessionError;
use super::event::{MemberEvent, Occupancy, OccupancyChange};
use super::stats::{CaptureStats, SessionState, SessionStatus, StopReason};
use crate::audio::{ContainerFactory, ContainerWriter};
use crate::ids::{ChannelId, GuildId};
use crate::notify::Notifier;
use crate::storage::ArtifactStore;
use crate::voice::{VoiceConnection, VoiceTransport};

/// Collaborators and settings shared by every session
pub struct SessionDeps {
    pub transport: Arc<dyn VoiceTransport>,
    pub containers: Arc<dyn ContainerFactory>,
    pub store: Arc<dyn ArtifactStore>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: SessionSettings,
}

/// Registry-side handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    events: mpsc::UnboundedSender<MemberEvent>,
    stop: CancellationToken,
    status: watch::Receiver<SessionStatus>,
    capture_stats: Arc<CaptureStats>,
}

impl SessionHandle {
    /// Queue a membership event for the session's event path
    ///
    /// Returns false once the session has gone away.
    pub fn send(&self, event: MemberEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Ask the session to stop; repeated requests are no-ops
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone().with_capture(&self.capture_stats)
    }

    /// Watch state transitions as they are published
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the session reaches Terminated
    pub async fn terminated(&self) -> SessionStatus {
        let mut status = self.status.clone();
        let terminal = status
            .wait_for(|s| s.state.is_terminal())
            .await
            .map(|s| s.clone());

        match terminal {
            Ok(s) => s.with_capture(&self.capture_stats),
            // Lifecycle task went away without publishing Terminated
            Err(_) => status.borrow().clone().with_capture(&self.capture_stats),
        }
    }
}

/// State machine owning one channel's recording from connect to cleanup
///
/// Runs on a single task: state, occupancy and event intake are only
/// touched here, so transitions never race with event processing.
pub struct SessionLifecycle {
    guild_id: GuildId,
    channel_id: ChannelId,
    deps: Arc<SessionDeps>,
    status: watch::Sender<SessionStatus>,
    occupancy: Occupancy,
    events: mpsc::UnboundedReceiver<MemberEvent>,
    stop: CancellationToken,
    capture_stats: Arc<CaptureStats>,
    record_path: PathBuf,
    conn: Option<Box<dyn VoiceConnection>>,
}

impl SessionLifecycle {
    pub fn new(
        deps: Arc<SessionDeps>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> (Self, SessionHandle) {
        let session_id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) =
            watch::channel(SessionStatus::new(session_id, guild_id, channel_id));
        let stop = CancellationToken::new();
        let capture_stats = Arc::new(CaptureStats::default());
        let record_path = deps.settings.record_path(channel_id);

        let handle = SessionHandle {
            session_id,
            guild_id,
            channel_id,
            events: events_tx,
            stop: stop.clone(),
            status: status_rx,
            capture_stats: Arc::clone(&capture_stats),
        };

        let lifecycle = Self {
            guild_id,
            channel_id,
            deps,
            status: status_tx,
            occupancy: Occupancy::default(),
            events: events_rx,
            stop,
            capture_stats,
            record_path,
            conn: None,
        };

        (lifecycle, handle)
    }

    /// Drive the session to Terminated
    ///
    /// Never fails: startup and finalize errors are logged and recorded
    /// in the final status.
    pub async fn run(mut self) -> SessionStatus {
        self.transition(SessionState::Starting);

        let (capture, reason) = match self.start().await {
            Ok((conn, writer)) => {
                let capture = self.begin_recording(conn, writer);
                let reason = self.record().await;
                (Some(capture), reason)
            }
            Err(e) => {
                error!("Failed to start recording session: {}", e);
                self.record_error(&e);

                let reason = match e {
                    SessionError::StartupCancelled => StopReason::Requested,
                    _ => StopReason::StartupFailed,
                };
                (None, reason)
            }
        };

        info!("Stopping recording session ({:?})", reason);
        self.status.send_modify(|s| {
            s.state = SessionState::Stopping;
            s.stop_reason = Some(reason);
        });

        self.finalize(capture).await;

        self.transition(SessionState::Terminated);
        info!("Recording session terminated");

        self.status.borrow().clone().with_capture(&self.capture_stats)
    }

    /// Starting: connect, announce presence and open the writer
    async fn start(
        &mut self,
    ) -> Result<(Box<dyn VoiceConnection>, Box<dyn ContainerWriter>), SessionError> {
        let timeout = self.deps.settings.startup_timeout;
        let stop = self.stop.clone();

        let started = tokio::select! {
            biased;
            _ = stop.cancelled() => Err(SessionError::StartupCancelled),
            started = tokio::time::timeout(timeout, self.open_resources()) => match started {
                Ok(Ok(writer)) => Ok(writer),
                Ok(Err(e)) => Err(SessionError::Startup(e)),
                Err(_) => Err(SessionError::StartupTimeout(timeout)),
            },
        };
        let writer = started?;

        match self.conn.take() {
            Some(conn) => Ok((conn, writer)),
            None => Err(SessionError::Startup(anyhow::anyhow!(
                "voice connection missing after startup"
            ))),
        }
    }

    async fn open_resources(&mut self) -> Result<Box<dyn ContainerWriter>> {
        let deps = Arc::clone(&self.deps);

        let conn = deps
            .transport
            .open(self.guild_id, self.channel_id)
            .await
            .context("Failed to connect to voice channel")?;

        // Stored before anything else can fail so cleanup closes it
        let conn = self.conn.insert(conn);

        conn.set_speaking(true)
            .await
            .context("Failed to send speaking packet")?;

        tokio::fs::create_dir_all(&deps.settings.tmp_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", deps.settings.tmp_dir))?;

        deps.containers
            .create(
                &self.record_path,
                deps.settings.sample_rate,
                deps.settings.channels,
            )
            .context("Failed to create record writer")
    }

    /// Starting → Recording: hand the connection and writer to the capture loop
    fn begin_recording(
        &self,
        conn: Box<dyn VoiceConnection>,
        writer: Box<dyn ContainerWriter>,
    ) -> CaptureTask {
        self.status.send_modify(|s| {
            s.state = SessionState::Recording;
            s.recording_started_at = Some(Utc::now());
        });
        info!(
            "Voice recording session started via {} ({:?})",
            self.deps.transport.name(),
            self.record_path
        );

        let capture = CaptureLoop::new(
            conn,
            writer,
            Arc::clone(&self.capture_stats),
            self.deps.settings.read_error_backoff,
        );

        capture.spawn()
    }

    /// Recording: process events until the first stop trigger fires
    async fn record(&mut self) -> StopReason {
        let ttl = tokio::time::sleep(self.deps.settings.session_ttl);
        tokio::pin!(ttl);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => {
                    debug!("Stop requested");
                    return StopReason::Requested;
                }
                _ = &mut ttl => {
                    info!("Session TTL of {:?} elapsed", self.deps.settings.session_ttl);
                    return StopReason::TtlElapsed;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        warn!("Event intake closed, stopping session");
                        return StopReason::Requested;
                    };

                    if self.handle_event(event) {
                        return StopReason::ChannelEmpty;
                    }
                }
            }
        }
    }

    /// Apply one membership event; true when the channel just emptied
    fn handle_event(&mut self, event: MemberEvent) -> bool {
        let change = self.occupancy.apply(event);

        match change {
            OccupancyChange::Joined(members) => debug!("Member joined ({} present)", members),
            OccupancyChange::Left(members) => debug!("Member left ({} present)", members),
            OccupancyChange::Emptied => debug!("Channel is empty, stopping session"),
            OccupancyChange::Underflow => {
                warn!("Member left while no members were tracked, ignoring")
            }
        }

        let occupancy = self.occupancy;
        self.status.send_modify(|s| {
            s.members = occupancy.members();
            s.ever_occupied = occupancy.ever_occupied();
        });

        change == OccupancyChange::Emptied
    }

    /// Stopping: finalize the recording and release every resource
    ///
    /// Writer close, transport close and temp-file removal are independent;
    /// each runs whatever happened before it.
    async fn finalize(&mut self, capture: Option<CaptureTask>) {
        let mut writer = None;

        if let Some(capture) = capture {
            match capture.stop().await {
                Ok(parts) => {
                    self.conn = Some(parts.conn);
                    writer = Some(parts.writer);
                }
                Err(e) => {
                    error!("Capture loop failed: {:#}", e);
                    self.record_error(&e);
                }
            }
        }

        if let Some(mut writer) = writer {
            match writer.close() {
                Ok(()) => {
                    let published = AssertUnwindSafe(self.publish_artifact())
                        .catch_unwind()
                        .await;
                    if published.is_err() {
                        error!("Publishing the voice record panicked");
                        self.record_error(&"artifact publish panicked");
                    }
                }
                Err(e) => {
                    error!("Failed to close record file, skipping upload: {:#}", e);
                    self.record_error(&e);
                }
            }
        }

        if let Some(mut conn) = self.conn.take() {
            let timeout = self.deps.settings.finalize_timeout;
            match tokio::time::timeout(timeout, conn.close()).await {
                Ok(Ok(())) => debug!("Voice connection closed"),
                Ok(Err(e)) => error!("Failed to close voice connection: {:#}", e),
                Err(_) => warn!("Abandoned closing voice connection after {:?}", timeout),
            }
        }

        match tokio::fs::remove_file(&self.record_path).await {
            Ok(()) => debug!("Removed {:?}", self.record_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {:?}: {}", self.record_path, e),
        }
    }

    /// Upload the finished record and tell the channel where to find it
    async fn publish_artifact(&mut self) {
        let deps = Arc::clone(&self.deps);
        let settings = &deps.settings;
        let timeout = settings.finalize_timeout;

        let stored = tokio::time::timeout(
            timeout,
            deps.store.store(&self.record_path, settings.artifact_ttl),
        )
        .await;

        let artifact_id = match stored {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                error!("Failed to upload voice record: {:#}", e);
                self.record_error(&e);
                return;
            }
            Err(_) => {
                warn!("Abandoned voice record upload after {:?}", timeout);
                self.record_error(&format!("upload timed out after {:?}", timeout));
                return;
            }
        };

        info!("Voice record uploaded: {}", artifact_id);
        self.status.send_modify(|s| s.artifact_id = Some(artifact_id));

        let channel_id = self.channel_id;
        let text = format!(
            "Got it! Download link - {}",
            settings.download_link(artifact_id)
        );

        match tokio::time::timeout(timeout, deps.notifier.send(channel_id, &text)).await {
            Ok(Ok(())) => debug!("Channel notified"),
            Ok(Err(e)) => warn!("Failed to notify channel: {:#}", e),
            Err(_) => warn!("Abandoned channel notification after {:?}", timeout),
        }
    }

    fn transition(&self, state: SessionState) {
        self.status.send_modify(|s| s.state = state);
        debug!("Session state: {:?}", state);
    }

    fn record_error(&self, err: &dyn std::fmt::Display) {
        let message = format!("{:#}", err);
        self.status.send_modify(|s| s.error = Some(message));
    }
}
