//! Recording session lifecycle engine
//!
//! This module decides, per voice channel, when a recording starts and stops:
//! - `SessionRegistry`: spawns sessions and routes membership events to them
//! - `SessionLifecycle`: Created → Starting → Recording → Stopping → Terminated
//! - `CaptureLoop`: moves audio frames from the transport into the container
//! - `ShutdownCoordinator`: stops every session and waits for cleanup

mod capture;
mod config;
mod error;
mod event;
mod lifecycle;
mod registry;
mod shutdown;
mod stats;

pub use capture::{CaptureLoop, CaptureParts, CaptureTask};
pub use config::SessionSettings;
pub use error::SessionError;
pub use event::{MemberEvent, Occupancy, OccupancyChange};
pub use lifecycle::{SessionDeps, SessionHandle, SessionLifecycle};
pub use registry::SessionRegistry;
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use stats::{CaptureStats, SessionState, SessionStatus, StopReason};
