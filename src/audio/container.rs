use anyhow::Result;
use std::path::Path;

use super::packet::RtpPacket;

/// Creates container writers for new recordings
pub trait ContainerFactory: Send + Sync {
    /// Create a writer at `path` for the given audio format
    fn create(&self, path: &Path, sample_rate: u32, channels: u16)
        -> Result<Box<dyn ContainerWriter>>;
}

/// Appends frames to a playable audio file
pub trait ContainerWriter: Send {
    /// Append one frame
    fn append(&mut self, packet: &RtpPacket) -> Result<()>;

    /// Flush and finalize the file
    ///
    /// Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;
}
