use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use voicelog::{
    create_router, logging, nats, AppState, Config, LocalArtifactStore, NatsNotifier,
    NatsVoiceTransport, SessionDeps, SessionRegistry, WavContainerFactory,
};

#[derive(Parser, Debug)]
#[command(name = "voicelog", about = "Records voice channels while members are present")]
struct Cli {
    /// Config file path, without extension
    #[arg(short, long, default_value = "config/voicelog")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        cfg.http.bind = bind;
    }
    if let Some(port) = cli.port {
        cfg.http.port = port;
    }

    logging::init(cfg.is_production());

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Connecting to NATS at {}", cfg.nats.url);
    let client = nats::connect(&cfg.nats.url).await?;

    let store = Arc::new(LocalArtifactStore::new(cfg.storage.root.clone()).await?);
    info!("Storing recordings under {}", store.root().display());

    let registry = SessionRegistry::new(SessionDeps {
        transport: Arc::new(NatsVoiceTransport::new(client.clone())),
        containers: Arc::new(WavContainerFactory),
        store: store.clone(),
        notifier: Arc::new(NatsNotifier::new(client)),
        settings: cfg.session_settings(),
    });

    let cancel = CancellationToken::new();
    let purge = tokio::spawn(purge_loop(store, cfg.purge_interval(), cancel.clone()));

    let addr: SocketAddr = format!("{}:{}", cfg.http.bind, cfg.http.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let app = create_router(AppState::new(registry.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, stopping recording sessions");
    let report = registry.stop_all(cfg.shutdown_deadline()).await;
    if report.is_complete() {
        info!("Stopped {} sessions", report.terminated);
    } else {
        warn!(
            "Stopped {} of {} sessions, abandoned: {:?}",
            report.terminated, report.requested, report.abandoned
        );
    }

    cancel.cancel();
    let _ = purge.await;

    Ok(())
}

async fn purge_loop(
    store: Arc<LocalArtifactStore>,
    every: std::time::Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => match store.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired recordings", n),
                Err(e) => warn!("Failed to purge expired recordings: {:#}", e),
            },
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
