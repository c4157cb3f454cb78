use bytes::Bytes;

use crate::voice::VoicePacket;

/// RTP version written into every packet header
pub const RTP_VERSION: u8 = 2;

/// Dynamic payload type used by the voice gateway for audio frames
pub const RTP_PAYLOAD_TYPE: u8 = 0x78;

/// Header fields the container writer expects with each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

/// A frame in container framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Bytes,
}

impl From<VoicePacket> for RtpPacket {
    fn from(packet: VoicePacket) -> Self {
        Self {
            header: RtpHeader {
                version: RTP_VERSION,
                payload_type: RTP_PAYLOAD_TYPE,
                sequence: packet.sequence,
                timestamp: packet.timestamp,
                ssrc: packet.ssrc,
            },
            payload: packet.payload,
        }
    }
}
