use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ArtifactId, ArtifactStore, ArtifactStream};

/// Sidecar metadata written next to every stored artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub id: ArtifactId,
    /// File name of the artifact inside the store root
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl ArtifactMetadata {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Artifact store backed by a local directory
///
/// Layout: `{root}/{id}.{ext}` plus `{root}/{id}.json` metadata.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create artifact directory: {:?}", root))?;

        info!("Local artifact store at {:?}", root);

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, id: ArtifactId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    pub async fn metadata(&self, id: ArtifactId) -> Result<ArtifactMetadata> {
        let raw = tokio::fs::read(self.metadata_path(id))
            .await
            .with_context(|| format!("Artifact {} not found", id))?;

        serde_json::from_slice(&raw).with_context(|| format!("Corrupt metadata for artifact {}", id))
    }

    /// Delete every artifact whose retention has elapsed
    ///
    /// Returns the number of artifacts removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .context("Failed to list artifact directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                continue;
            };

            let meta = match self.metadata(id).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping artifact {}: {:#}", id, e);
                    continue;
                }
            };

            if !meta.is_expired(now) {
                continue;
            }

            if let Err(e) = tokio::fs::remove_file(self.root.join(&meta.file_name)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove artifact {}: {}", id, e);
                    continue;
                }
            }
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove metadata for artifact {}", id))?;

            debug!("Purged expired artifact {}", id);
            removed += 1;
        }

        if removed > 0 {
            info!("Purged {} expired artifacts", removed);
        }

        Ok(removed)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, path: &Path, ttl: Duration) -> Result<ArtifactId> {
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .with_context(|| format!("Artifact TTL of {:?} out of range", ttl))?;

        let id = Uuid::new_v4();
        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        };

        let size_bytes = tokio::fs::copy(path, self.root.join(&file_name))
            .await
            .with_context(|| format!("Failed to copy {:?} into artifact store", path))?;

        let meta = ArtifactMetadata {
            id,
            file_name,
            created_at,
            expires_at,
            size_bytes,
        };

        tokio::fs::write(self.metadata_path(id), serde_json::to_vec_pretty(&meta)?)
            .await
            .context("Failed to write artifact metadata")?;

        info!("Stored artifact {} ({} bytes, expires {})", id, size_bytes, meta.expires_at);

        Ok(id)
    }

    async fn fetch(&self, id: ArtifactId) -> Result<ArtifactStream> {
        let meta = self.metadata(id).await?;

        if meta.is_expired(Utc::now()) {
            anyhow::bail!("Artifact {} expired at {}", id, meta.expires_at);
        }

        let file = tokio::fs::File::open(self.root.join(&meta.file_name))
            .await
            .with_context(|| format!("Failed to open artifact {}", id))?;

        Ok(Box::new(file))
    }
}
