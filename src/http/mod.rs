//! HTTP control surface for the session registry
//!
//! - POST /sessions - Start recording a channel
//! - POST /sessions/:channel_id/events - Deliver a member join/leave
//! - POST /sessions/:channel_id/stop - Stop recording a channel
//! - GET /sessions - List active sessions
//! - GET /sessions/:channel_id - Query session status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
