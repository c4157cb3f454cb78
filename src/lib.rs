pub mod audio;
pub mod config;
pub mod http;
pub mod ids;
pub mod logging;
pub mod nats;
pub mod notify;
pub mod session;
pub mod storage;
pub mod voice;

pub use audio::{ContainerFactory, ContainerWriter, RtpPacket, WavContainerFactory};
pub use config::Config;
pub use http::{create_router, AppState};
pub use ids::{ChannelId, GuildId};
pub use nats::{NatsNotifier, NatsVoiceTransport};
pub use notify::Notifier;
pub use session::{
    MemberEvent, SessionDeps, SessionError, SessionHandle, SessionRegistry, SessionSettings,
    SessionState, SessionStatus, ShutdownReport, StopReason,
};
pub use storage::{ArtifactId, ArtifactStore, LocalArtifactStore};
pub use voice::{VoiceConnection, VoicePacket, VoiceTransport};
