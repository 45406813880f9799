mod poller;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telemission_core::{
    load_config, register_commands, validate_config, CommandDeps, ConversationEngine,
    DfStorageReporter, SanitizedConfig, StorageReporter, TorrentControl, TransmissionClient,
};

use poller::Poller;
use telegram::TelegramApi;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("telemission {}", VERSION);

    // Determine config path
    let config_path = std::env::var("TELEMISSION_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default()
    );

    // Torrent-control backend
    let control: Arc<dyn TorrentControl> =
        Arc::new(TransmissionClient::new(config.transmission.clone()));
    info!("Using torrent backend: {}", control.name());

    // Storage reporter
    let storage: Arc<dyn StorageReporter> =
        Arc::new(DfStorageReporter::new(config.storage.clone()));

    // Build the engine with the standard command catalog
    let deps = CommandDeps {
        control: Arc::clone(&control),
        storage,
        downloads: config.downloads.clone(),
    };
    let builder = ConversationEngine::builder(control, config.engine.on_backend_error)
        .allow_users(config.auth.allowed_user_ids.iter().copied());
    let engine = register_commands(builder, &deps)
        .build()
        .context("Failed to build conversation engine")?;
    info!(
        allow_listed = config.auth.allowed_user_ids.len(),
        "Conversation engine ready"
    );

    // Start polling
    let api = TelegramApi::new(&config.telegram.token, config.telegram.poll_timeout_secs);
    let poller = Poller::new(api, engine, config.telegram.poll_timeout_secs);

    info!("Starting long-poll loop");
    poller.run(shutdown_signal()).await?;

    info!("Bot stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
