//! Durable storage for finished recordings
//!
//! The session core only needs `store` and `fetch`; the local
//! filesystem store additionally honors retention with `purge_expired`.

mod local;

pub use local::{ArtifactMetadata, LocalArtifactStore};

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Identifier of a stored artifact
pub type ArtifactId = Uuid;

/// Readable artifact contents
pub type ArtifactStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist the file at `path`, retained for `ttl`
    async fn store(&self, path: &Path, ttl: Duration) -> Result<ArtifactId>;

    /// Open a previously stored artifact
    async fn fetch(&self, id: ArtifactId) -> Result<ArtifactStream>;
}
