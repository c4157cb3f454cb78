pub mod transport;

pub use transport::{VoiceConnection, VoicePacket, VoiceTransport};
