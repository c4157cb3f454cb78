use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::error::SessionError;
use super::event::MemberEvent;
use super::lifecycle::{SessionDeps, SessionHandle, SessionLifecycle};
use super::shutdown::{ShutdownCoordinator, ShutdownReport};
use super::stats::SessionStatus;
use crate::ids::{ChannelId, GuildId};

/// Active recording sessions indexed by channel
///
/// Cloning is cheap; every clone shares the same map.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    deps: Arc<SessionDeps>,
    sessions: RwLock<Sessions>,
    tasks: TaskTracker,
}

struct Sessions {
    active: HashMap<ChannelId, SessionHandle>,
    /// Cleared once shutdown begins
    accepting: bool,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                deps: Arc::new(deps),
                sessions: RwLock::new(Sessions {
                    active: HashMap::new(),
                    accepting: true,
                }),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Start tracking and recording a channel
    ///
    /// Returns as soon as the lifecycle task is launched; startup failures
    /// are logged by the session itself. A channel that already has a
    /// session is rejected rather than replaced.
    pub async fn spawn(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.inner.sessions.write().await;

        if !sessions.accepting {
            return Err(SessionError::ShuttingDown);
        }

        if sessions.active.contains_key(&channel_id) {
            warn!("Channel {} already has a recording session", channel_id);
            return Err(SessionError::AlreadyActive(channel_id));
        }

        let (lifecycle, handle) =
            SessionLifecycle::new(Arc::clone(&self.inner.deps), guild_id, channel_id);
        let session_id = handle.session_id;
        sessions.active.insert(channel_id, handle.clone());

        let span = info_span!(
            "session",
            guild_id = %guild_id,
            channel_id = %channel_id,
            session_id = %session_id
        );
        let registry = self.clone();

        self.inner.tasks.spawn(
            async move {
                // Run on its own task so a panic still reaches the removal below
                let run = tokio::spawn(lifecycle.run().in_current_span());
                if let Err(e) = run.await {
                    error!("Recording session task failed: {}", e);
                }
                registry.remove(channel_id, session_id).await;
            }
            .instrument(span),
        );

        info!("Spawned recording session {} for channel {}", session_id, channel_id);

        Ok(handle)
    }

    /// Deliver a membership event to the channel's session
    ///
    /// Events for channels without a session are dropped. Returns whether
    /// the event was queued.
    pub async fn send_event(&self, channel_id: ChannelId, event: MemberEvent) -> bool {
        let handle = {
            let sessions = self.inner.sessions.read().await;
            sessions.active.get(&channel_id).cloned()
        };

        match handle {
            Some(handle) => handle.send(event),
            None => {
                debug!("No session for channel {}, dropping {:?}", channel_id, event);
                false
            }
        }
    }

    /// Ask a single session to stop; false if the channel has none
    pub async fn stop(&self, channel_id: ChannelId) -> bool {
        let sessions = self.inner.sessions.read().await;

        match sessions.active.get(&channel_id) {
            Some(handle) => {
                info!("Stop requested for channel {}", channel_id);
                handle.request_stop();
                true
            }
            None => false,
        }
    }

    /// Stop every session and wait for them to finish, bounded by `deadline`
    ///
    /// New spawns are rejected from here on.
    pub async fn stop_all(&self, deadline: Duration) -> ShutdownReport {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.inner.sessions.write().await;
            sessions.accepting = false;
            sessions.active.values().cloned().collect()
        };

        ShutdownCoordinator::new(deadline)
            .run(handles, &self.inner.tasks)
            .await
    }

    pub async fn get(&self, channel_id: ChannelId) -> Option<SessionHandle> {
        self.inner.sessions.read().await.active.get(&channel_id).cloned()
    }

    pub async fn status(&self, channel_id: ChannelId) -> Option<SessionStatus> {
        self.get(channel_id).await.map(|handle| handle.status())
    }

    pub async fn statuses(&self) -> Vec<SessionStatus> {
        let sessions = self.inner.sessions.read().await;
        let mut statuses: Vec<SessionStatus> =
            sessions.active.values().map(|h| h.status()).collect();
        statuses.sort_by_key(|s| s.created_at);
        statuses
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.active.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop a terminated session, unless the entry has been taken over
    async fn remove(&self, channel_id: ChannelId, session_id: Uuid) {
        let mut sessions = self.inner.sessions.write().await;

        match sessions.active.get(&channel_id) {
            Some(handle) if handle.session_id == session_id => {
                sessions.active.remove(&channel_id);
                debug!("Session removed from registry");
            }
            _ => warn!("Registry entry for channel {} no longer belongs to this session", channel_id),
        }
    }
}
