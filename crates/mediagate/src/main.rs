use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod error;
mod extract;
mod handlers;
mod models;
mod services;

use mediaserver_api::BackendClient;

use crate::config::{AppConfig, UrlSegment, DATA_DIR};
use crate::services::{DownloadChain, MediaServerChain, MediaServerOper};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<tokio::sync::RwLock<AppConfig>>,
    pub media_server_chain: Arc<dyn MediaServerChain>,
    pub download_chain: Arc<dyn DownloadChain>,
    pub media_server_oper: Arc<dyn MediaServerOper>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: BackendClient) -> Self {
        let backend = Arc::new(backend);
        Self {
            config: Arc::new(tokio::sync::RwLock::new(config)),
            media_server_chain: backend.clone(),
            download_chain: backend.clone(),
            media_server_oper: backend,
        }
    }

    /// First non-empty entry of the configured media server list.
    pub async fn primary_media_server(&self) -> Option<String> {
        let config = self.config.read().await;
        config.primary_media_server().map(str::to_string)
    }
}

/// Mount the media server routes under `/{api_prefix}`.
pub fn app_router(state: AppState, api_prefix: &UrlSegment) -> Router {
    Router::new()
        .nest(&format!("/{api_prefix}"), handlers::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn build_backend(config: &AppConfig) -> Result<BackendClient, mediaserver_api::Error> {
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()?;

    let mut backend = BackendClient::new_with_client(
        &config.backend_url,
        config.backend_api_key.clone(),
        reqwest_client,
    )?;
    for server in &config.media_servers {
        info!("  {} ({})", server.name, server.server_type);
        backend = backend.with_server(server.name.clone(), server.server_type);
    }
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize file logging

    let file_appender = tracing_appender::rolling::daily(DATA_DIR.join("logs"), "mediagate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Defaults to "mediagate=info" but can be overridden with RUST_LOG env var
    // Examples:
    //   RUST_LOG=debug                                  - Enable debug for all modules
    //   RUST_LOG=mediagate=debug,mediaserver_api=debug  - Debug the gateway and its backend client
    let default_filter = "mediagate=info,mediaserver_api=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    let loaded_config = crate::config::load_config();
    info!(
        "Loaded configuration: backend {} ({} media servers, timeout {}s)",
        loaded_config.backend_url,
        loaded_config.media_servers.len(),
        loaded_config.timeout
    );

    let backend = build_backend(&loaded_config).unwrap_or_else(|e| {
        error!("Failed to create backend client: {}", e);
        std::process::exit(1);
    });

    match loaded_config.primary_media_server() {
        Some(server) => info!("Play links are resolved on media server {}", server),
        None => warn!("No media server configured, play links are unavailable."),
    }

    let api_prefix = loaded_config.api_prefix.clone();
    let addr = match format!("{}:{}", loaded_config.host, loaded_config.port).parse::<SocketAddr>()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!(
                "Invalid address {}:{}: {}",
                loaded_config.host, loaded_config.port, e
            );
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(loaded_config, backend);
    let app = app_router(app_state, &api_prefix);

    info!("Starting media server gateway on http://{}/{}", addr, api_prefix);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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
    info!("Shutting down");
}
