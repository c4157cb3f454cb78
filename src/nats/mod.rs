pub mod client;
pub mod messages;
pub mod notifier;

pub use client::{connect, NatsVoiceConnection, NatsVoiceTransport};
pub use messages::{
    ConnectReply, ControlAction, ControlMessage, NotificationMessage, VoiceFrameMessage,
};
pub use notifier::NatsNotifier;
