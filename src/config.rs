use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionSettings;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub http: HttpConfig,
    pub nats: NatsConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// "local" or "production"; picks the default log level and format
    pub env: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub tmp_dir: PathBuf,
    pub session_ttl_secs: u64,
    pub startup_timeout_secs: u64,
    pub finalize_timeout_secs: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub artifact_ttl_secs: u64,
    pub purge_interval_secs: u64,
    pub public_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub deadline_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voicelog".to_string(),
            env: "local".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            tmp_dir: session.tmp_dir,
            session_ttl_secs: session.session_ttl.as_secs(),
            startup_timeout_secs: session.startup_timeout.as_secs(),
            finalize_timeout_secs: session.finalize_timeout.as_secs(),
            sample_rate: session.sample_rate,
            channels: session.channels,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            root: PathBuf::from("data/voices"),
            artifact_ttl_secs: session.artifact_ttl.as_secs(),
            purge_interval_secs: 15 * 60,
            public_base_url: session.public_base_url,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { deadline_secs: 30 }
    }
}

impl Config {
    /// Load `path` (any format the `config` crate knows, optional) and
    /// overlay `VOICELOG__SECTION__KEY` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOICELOG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn is_production(&self) -> bool {
        self.service.env == "production"
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tmp_dir: self.recording.tmp_dir.clone(),
            session_ttl: Duration::from_secs(self.recording.session_ttl_secs),
            startup_timeout: Duration::from_secs(self.recording.startup_timeout_secs),
            finalize_timeout: Duration::from_secs(self.recording.finalize_timeout_secs),
            artifact_ttl: Duration::from_secs(self.storage.artifact_ttl_secs),
            sample_rate: self.recording.sample_rate,
            channels: self.recording.channels,
            public_base_url: self.storage.public_base_url.clone(),
            ..SessionSettings::default()
        }
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown.deadline_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.storage.purge_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = Config::load("does/not/exist/voicelog").unwrap();

        assert_eq!(cfg.service.name, "voicelog");
        assert_eq!(cfg.http.port, 8080);
        assert_eq!(cfg.recording.session_ttl_secs, 3600);
        assert_eq!(cfg.storage.artifact_ttl_secs, 7 * 24 * 3600);
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_file_overrides_and_session_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("voicelog.toml"),
            r#"
[service]
env = "production"

[recording]
session_ttl_secs = 120
sample_rate = 16000
channels = 1

[storage]
public_base_url = "https://voices.example.org"
"#,
        )
        .unwrap();

        let path = dir.path().join("voicelog");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        let settings = cfg.session_settings();

        assert!(cfg.is_production());
        assert_eq!(settings.session_ttl, Duration::from_secs(120));
        assert_eq!(settings.startup_timeout, Duration::from_secs(5));
        assert_eq!(settings.sample_rate, 16000);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.public_base_url, "https://voices.example.org");
        assert_eq!(cfg.http.port, 8080);
    }
}
