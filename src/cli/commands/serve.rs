//! `serve` command handler.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{self, AppState, parse_bind_addr};
use crate::cli::args::ServeArgs;
use crate::config::loader::{ConfigLoader, lobby_url, validate};
use crate::config::schema::{AppConfig, StorageBackend};
use crate::error::EopError;
use crate::export::ExportAssembler;
use crate::session::{LobbyClient, LobbyConfig, SessionOrchestrator};
use crate::store::{ArtifactStore, FileStore, MemoryStore};

/// Serve the HTTP API until `cancel` fires.
///
/// # Errors
///
/// Returns a config error if the configuration is invalid, or an I/O error
/// if the listener cannot be bound or the server fails.
pub async fn run(args: &ServeArgs, cancel: CancellationToken) -> Result<(), EopError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let config = resolve_config(args)?;

    let store: Arc<dyn ArtifactStore> = match config.storage.backend {
        StorageBackend::File => {
            info!(path = %config.storage.path.display(), "using file store");
            Arc::new(FileStore::new(&config.storage.path))
        }
        StorageBackend::Memory => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let lobby = LobbyClient::new(
        LobbyConfig {
            base_url: lobby_url(&config.lobby.url)?,
            timeout: Duration::from_millis(config.lobby.timeout_ms),
        },
        Arc::clone(&store),
    )?;

    let state = Arc::new(AppState {
        game: config.game.name.clone(),
        orchestrator: SessionOrchestrator::new(Arc::new(lobby), Arc::clone(&store)),
        exporter: ExportAssembler::new(store),
    });

    let addr = parse_bind_addr(&config.api.bind)?;
    let (listener, bound) = api::bind(addr).await?;
    info!(
        %bound,
        lobby = %config.lobby.url,
        game = %config.game.name,
        "API listening"
    );

    api::serve(listener, api::router(state, config.api.max_body_size), cancel).await?;
    info!("API stopped");
    Ok(())
}

/// Builds the effective configuration: file (or defaults), then CLI
/// overrides, then validation.
///
/// # Errors
///
/// Returns a config error if loading or validation fails.
pub fn resolve_config(args: &ServeArgs) -> Result<AppConfig, EopError> {
    let mut config = if let Some(ref path) = args.config {
        info!(config = %path.display(), "loading configuration");
        let load_result = ConfigLoader::default().load(path)?;
        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }
        load_result.config
    } else {
        AppConfig::default()
    };

    if let Some(ref bind) = args.bind {
        config.api.bind.clone_from(bind);
    }
    if let Some(ref url) = args.lobby_url {
        config.lobby.url.clone_from(url);
    }
    if let Some(ref game) = args.game {
        config.game.name.clone_from(game);
    }
    if let Some(ref dir) = args.data_dir {
        config.storage.backend = StorageBackend::File;
        config.storage.path.clone_from(dir);
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }

    validate(&config)?;
    Ok(config)
}
