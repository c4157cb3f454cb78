use thiserror::Error;

use crate::ids::ChannelId;

/// Errors surfaced at the registry/lifecycle boundary
///
/// Everything that happens inside a running session is absorbed and logged.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("channel {0} already has an active recording session")]
    AlreadyActive(ChannelId),

    #[error("session registry is shutting down")]
    ShuttingDown,

    #[error("session startup timed out after {0:?}")]
    StartupTimeout(std::time::Duration),

    #[error("session startup cancelled")]
    StartupCancelled,

    #[error("session startup failed: {0:#}")]
    Startup(anyhow::Error),
}
