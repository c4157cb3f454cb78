use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::lifecycle::SessionHandle;
use crate::ids::ChannelId;

/// Outcome of a full shutdown
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// Sessions asked to stop
    pub requested: usize,
    /// Sessions that reached Terminated before the deadline
    pub terminated: usize,
    /// Sessions still finalizing when the deadline expired
    pub abandoned: Vec<ChannelId>,
}

impl ShutdownReport {
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// Stops a set of sessions together and waits for all of them
pub struct ShutdownCoordinator {
    deadline: Duration,
}

impl ShutdownCoordinator {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Request stop on every session, then wait for each to terminate
    ///
    /// `tasks` is closed and awaited as well, so returning normally means
    /// every lifecycle task has exited. Sessions still running at the
    /// deadline are not aborted; their cleanup keeps running and they are
    /// reported as abandoned.
    pub async fn run(&self, handles: Vec<SessionHandle>, tasks: &TaskTracker) -> ShutdownReport {
        let requested = handles.len();
        info!("Stopping {} recording sessions", requested);

        for handle in &handles {
            handle.request_stop();
        }
        tasks.close();

        let acknowledged = join_all(handles.iter().map(|handle| async move {
            let status = handle.terminated().await;
            match &status.error {
                Some(err) => warn!(
                    "Session for channel {} terminated with error: {}",
                    status.channel_id, err
                ),
                None => info!("Session for channel {} terminated", status.channel_id),
            }
        }));

        let all_done = async {
            acknowledged.await;
            tasks.wait().await;
        };

        if tokio::time::timeout(self.deadline, all_done).await.is_ok() {
            info!("All {} recording sessions stopped", requested);
            return ShutdownReport {
                requested,
                terminated: requested,
                abandoned: Vec::new(),
            };
        }

        let abandoned: Vec<ChannelId> = handles
            .iter()
            .filter(|handle| !handle.state().is_terminal())
            .map(|handle| handle.channel_id)
            .collect();

        for channel_id in &abandoned {
            warn!(
                "Shutdown deadline of {:?} reached, abandoning session for channel {} mid-cleanup",
                self.deadline, channel_id
            );
        }

        ShutdownReport {
            requested,
            terminated: requested - abandoned.len(),
            abandoned,
        }
    }
}
