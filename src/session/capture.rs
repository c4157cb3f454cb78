use anyhow::{Context, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::stats::CaptureStats;
use crate::audio::{ContainerWriter, RtpPacket};
use crate::voice::VoiceConnection;

/// Resources handed back by the capture loop once it stops
pub struct CaptureParts {
    pub conn: Box<dyn VoiceConnection>,
    pub writer: Box<dyn ContainerWriter>,
}

/// Pulls frames from the voice connection into the container writer
pub struct CaptureLoop {
    conn: Box<dyn VoiceConnection>,
    writer: Box<dyn ContainerWriter>,
    stats: Arc<CaptureStats>,
    cancel: CancellationToken,
    read_error_backoff: Duration,
}

impl CaptureLoop {
    pub fn new(
        conn: Box<dyn VoiceConnection>,
        writer: Box<dyn ContainerWriter>,
        stats: Arc<CaptureStats>,
        read_error_backoff: Duration,
    ) -> Self {
        Self {
            conn,
            writer,
            stats,
            cancel: CancellationToken::new(),
            read_error_backoff,
        }
    }

    /// Run the loop on its own task, inside the caller's span
    pub fn spawn(self) -> CaptureTask {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(self.run().in_current_span());

        CaptureTask { handle, cancel }
    }

    /// Capture until cancelled
    ///
    /// Read and write failures are counted and logged; neither ends the loop.
    /// A panicking transport or writer counts as a failure too, so the
    /// connection and writer always come back for cleanup.
    pub async fn run(mut self) -> CaptureParts {
        info!("Capture loop started");

        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                read = AssertUnwindSafe(self.conn.read_frame()).catch_unwind() => {
                    read.unwrap_or_else(|panic| Err(panicked("read_frame", panic)))
                }
            };

            let packet = match read {
                Ok(packet) => packet,
                Err(e) => {
                    self.stats.read_failed();
                    debug!("Failed to read voice frame: {:#}", e);

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.read_error_backoff) => {}
                    }
                    continue;
                }
            };

            let rtp = RtpPacket::from(packet);

            let writer = &mut self.writer;
            let appended = std::panic::catch_unwind(AssertUnwindSafe(|| writer.append(&rtp)))
                .unwrap_or_else(|panic| Err(panicked("append", panic)));

            if let Err(e) = appended {
                self.stats.write_failed();
                debug!("Failed to write frame {} to record: {:#}", rtp.header.sequence, e);
                continue;
            }

            let written = self.stats.frame_written();
            if written % 1000 == 0 {
                debug!("{} frames captured", written);
            }
        }

        info!(
            "Capture loop stopped ({} frames, {} read errors, {} write errors)",
            self.stats.frames_written(),
            self.stats.read_errors(),
            self.stats.write_errors()
        );

        CaptureParts {
            conn: self.conn,
            writer: self.writer,
        }
    }
}

fn panicked(operation: &str, panic: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    warn!("{} panicked: {}", operation, message);
    anyhow::anyhow!("{} panicked: {}", operation, message)
}

/// Handle to a running capture loop
pub struct CaptureTask {
    handle: JoinHandle<CaptureParts>,
    cancel: CancellationToken,
}

impl CaptureTask {
    /// Signal the loop to stop and wait for it to hand its resources back
    pub async fn stop(self) -> Result<CaptureParts> {
        self.cancel.cancel();
        self.handle.await.context("Capture task panicked")
    }
}
