use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::container::{ContainerFactory, ContainerWriter};
use super::packet::RtpPacket;

/// Writes recordings as 16-bit PCM WAV files
#[derive(Debug, Clone, Copy, Default)]
pub struct WavContainerFactory;

impl ContainerFactory for WavContainerFactory {
    fn create(
        &self,
        path: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Box<dyn ContainerWriter>> {
        Ok(Box::new(WavContainer::create(path, sample_rate, channels)?))
    }
}

/// A single WAV recording on disk
pub struct WavContainer {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    /// Bytes per interleaved sample frame (16-bit PCM)
    frame_bytes: usize,
    last_sequence: Option<u16>,
    packets: u64,
    samples: u64,
    gaps: u64,
}

impl WavContainer {
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        debug!("WAV container created: {:?} ({}Hz, {} channels)", path, sample_rate, channels);

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            frame_bytes: 2 * usize::from(channels.max(1)),
            last_sequence: None,
            packets: 0,
            samples: 0,
            gaps: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Sequence discontinuities seen so far
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    fn track_sequence(&mut self, sequence: u16) {
        if let Some(last) = self.last_sequence {
            let expected = last.wrapping_add(1);
            if sequence != expected {
                self.gaps += 1;
                debug!("Sequence gap: expected {}, got {}", expected, sequence);
            }
        }
        self.last_sequence = Some(sequence);
    }
}

impl ContainerWriter for WavContainer {
    fn append(&mut self, packet: &RtpPacket) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("WAV container already closed")?;

        // A partial sample frame would leave the data chunk unfinalizable
        if packet.payload.len() % self.frame_bytes != 0 {
            anyhow::bail!(
                "PCM payload length {} is not a multiple of {} bytes (seq={})",
                packet.payload.len(),
                self.frame_bytes,
                packet.header.sequence
            );
        }

        for chunk in packet.payload.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
                .context("Failed to write sample to WAV")?;
        }

        self.samples += packet.payload.len() as u64 / 2;
        self.packets += 1;
        self.track_sequence(packet.header.sequence);

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;

            info!(
                "WAV container closed: {:?} ({} packets, {} samples, {} gaps)",
                self.path, self.packets, self.samples, self.gaps
            );
        }

        Ok(())
    }
}

impl Drop for WavContainer {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
