use crate::session::SessionRegistry;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active recording sessions (channel_id → session)
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }
}
