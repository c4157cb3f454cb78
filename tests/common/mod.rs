// Shared test doubles for the session engine
//
// Every collaborator records what happened to it so tests can assert on
// connects, closes, uploads and notifications without a real gateway.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncRead;
use uuid::Uuid;
use voicelog::audio::{ContainerFactory, ContainerWriter, RtpPacket};
use voicelog::storage::{ArtifactId, ArtifactStore, ArtifactStream};
use voicelog::{
    ChannelId, GuildId, Notifier, SessionDeps, SessionRegistry, SessionSettings, VoiceConnection,
    VoicePacket, VoiceTransport,
};

pub const GUILD: GuildId = GuildId(42);

pub fn packet(sequence: u16) -> VoicePacket {
    VoicePacket {
        sequence,
        timestamp: sequence as u32 * 960,
        ssrc: 7,
        payload: Bytes::from_static(&[0, 0, 1, 0, 2, 0, 3, 0]),
    }
}

// ============================================================================
// Voice transport
// ============================================================================

/// One scripted read: a frame, or a read error
#[derive(Clone)]
pub enum Read {
    Frame(VoicePacket),
    Error,
}

#[derive(Default)]
pub struct MockTransport {
    pub opens: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub speaking: Arc<Mutex<Vec<bool>>>,
    script: Vec<Read>,
    fail_open: bool,
    panic_open: bool,
    open_delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads each connection serves before blocking forever
    pub fn with_script(mut self, script: Vec<Read>) -> Self {
        self.script = script;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn panicking_open(mut self) -> Self {
        self.panic_open = true;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VoiceTransport for MockTransport {
    async fn open(
        &self,
        _guild_id: GuildId,
        _channel_id: ChannelId,
    ) -> Result<Box<dyn VoiceConnection>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open {
            return Err(anyhow!("gateway refused connection"));
        }
        if self.panic_open {
            panic!("gateway client bug");
        }

        Ok(Box::new(MockConnection {
            script: self.script.iter().cloned().collect(),
            closes: Arc::clone(&self.closes),
            speaking: Arc::clone(&self.speaking),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub struct MockConnection {
    script: VecDeque<Read>,
    closes: Arc<AtomicUsize>,
    speaking: Arc<Mutex<Vec<bool>>>,
    closed: bool,
}

#[async_trait::async_trait]
impl VoiceConnection for MockConnection {
    async fn read_frame(&mut self) -> Result<VoicePacket> {
        match self.script.pop_front() {
            Some(Read::Frame(packet)) => Ok(packet),
            Some(Read::Error) => Err(anyhow!("malformed frame")),
            None => std::future::pending().await,
        }
    }

    async fn set_speaking(&mut self, speaking: bool) -> Result<()> {
        self.speaking.lock().unwrap().push(speaking);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ============================================================================
// Container
// ============================================================================

#[derive(Default)]
pub struct MockContainers {
    pub created: Mutex<Vec<PathBuf>>,
    pub appended: Arc<Mutex<Vec<RtpPacket>>>,
    pub closes: Arc<AtomicUsize>,
    fail_close: bool,
    append: AppendBehavior,
}

/// How `MockWriter::append` treats each frame
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub enum AppendBehavior {
    #[default]
    Record,
    Fail,
    Panic,
}

impl MockContainers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn failing_append(mut self) -> Self {
        self.append = AppendBehavior::Fail;
        self
    }

    pub fn panicking_append(mut self) -> Self {
        self.append = AppendBehavior::Panic;
        self
    }

    pub fn appended(&self) -> Vec<RtpPacket> {
        self.appended.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl ContainerFactory for MockContainers {
    fn create(
        &self,
        path: &Path,
        _sample_rate: u32,
        _channels: u16,
    ) -> Result<Box<dyn ContainerWriter>> {
        std::fs::write(path, b"RIFF")?;
        self.created.lock().unwrap().push(path.to_path_buf());

        Ok(Box::new(MockWriter {
            appended: Arc::clone(&self.appended),
            closes: Arc::clone(&self.closes),
            fail_close: self.fail_close,
            append: self.append,
        }))
    }
}

pub struct MockWriter {
    appended: Arc<Mutex<Vec<RtpPacket>>>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
    append: AppendBehavior,
}

impl ContainerWriter for MockWriter {
    fn append(&mut self, packet: &RtpPacket) -> Result<()> {
        match self.append {
            AppendBehavior::Record => {
                self.appended.lock().unwrap().push(packet.clone());
                Ok(())
            }
            AppendBehavior::Fail => Err(anyhow!("write refused")),
            AppendBehavior::Panic => panic!("writer bug at frame {}", packet.header.sequence),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(anyhow!("disk full"));
        }
        Ok(())
    }
}

// ============================================================================
// Artifact store
// ============================================================================

#[derive(Default)]
pub struct MockStore {
    /// (path, file existed at upload time, ttl)
    pub uploads: Mutex<Vec<(PathBuf, bool, Duration)>>,
    pub stored: Mutex<Vec<ArtifactId>>,
    fail: bool,
    delay: Option<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MockStore {
    async fn store(&self, path: &Path, ttl: Duration) -> Result<ArtifactId> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists(), ttl));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("bucket unavailable"));
        }

        let id = Uuid::new_v4();
        self.stored.lock().unwrap().push(id);
        Ok(id)
    }

    async fn fetch(&self, _id: ArtifactId) -> Result<ArtifactStream> {
        let empty: Box<dyn AsyncRead + Send + Unpin> = Box::new(tokio::io::empty());
        Ok(empty)
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct MockNotifier {
    pub messages: Mutex<Vec<(ChannelId, String)>>,
    fail: bool,
    panic: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        if self.panic {
            panic!("chat client bug");
        }
        if self.fail {
            return Err(anyhow!("channel not reachable"));
        }

        self.messages
            .lock()
            .unwrap()
            .push((channel_id, text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Mocks plus a scratch directory, wired into `SessionDeps`
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub containers: Arc<MockContainers>,
    pub store: Arc<MockStore>,
    pub notifier: Arc<MockNotifier>,
    pub settings: SessionSettings,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let settings = SessionSettings {
            tmp_dir: dir.path().join("tmp"),
            public_base_url: "https://voices.test/".to_string(),
            ..SessionSettings::default()
        };

        Self {
            transport: Arc::new(MockTransport::new()),
            containers: Arc::new(MockContainers::new()),
            store: Arc::new(MockStore::new()),
            notifier: Arc::new(MockNotifier::new()),
            settings,
            dir,
        }
    }

    pub fn with_transport(mut self, transport: MockTransport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_containers(mut self, containers: MockContainers) -> Self {
        self.containers = Arc::new(containers);
        self
    }

    pub fn with_store(mut self, store: MockStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_notifier(mut self, notifier: MockNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn with_settings(mut self, f: impl FnOnce(&mut SessionSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            transport: self.transport.clone(),
            containers: self.containers.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn registry(&self) -> SessionRegistry {
        SessionRegistry::new(self.deps())
    }

    pub fn record_path(&self, channel_id: ChannelId) -> PathBuf {
        self.settings.record_path(channel_id)
    }
}
