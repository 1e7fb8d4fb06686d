use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod models;
mod parser;
mod services;

use config::AppConfig;
use parser::PathParser;
use services::identity::IdentityService;
use services::matcher::MultiSourceMatcher;
use services::providers::{PreferencesStore, ProviderSearchClient};
use services::sources::{HttpRecordSource, RecordSource};

pub struct AppState {
    pub identity: IdentityService,
    /// None when no search endpoint is configured
    pub search: Option<ProviderSearchClient>,
    pub preferences: PreferencesStore,
}

impl AppState {
    /// Wire up sources, matcher and provider clients from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let mut sources: Vec<Arc<dyn RecordSource>> = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let http = HttpRecordSource::new(&source.name, &source.url, config.source_timeout)?;
            sources.push(Arc::new(http));
        }

        let identity = IdentityService::new(
            PathParser::new(config.parser.library_folders.clone()),
            MultiSourceMatcher::new(sources),
            config.parser.tv_library_tokens.clone(),
        );

        let search = config
            .search_url
            .as_deref()
            .map(|url| ProviderSearchClient::new(url, config.provider_timeout))
            .transpose()?;

        let preferences = PreferencesStore::new(
            config.preferences_url.clone(),
            config.preferences.clone(),
            config.provider_timeout,
        )?;

        Ok(Self {
            identity,
            search,
            preferences,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artwork_resolver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load();
    config.log_config();

    let addr = format!("{}:{}", config.bind_address, config.port);

    let state = Arc::new(AppState::from_config(config)?);
    tracing::debug!(
        "Record source lookup order: [{}]",
        state.identity.matcher().source_names().join(", ")
    );

    // Root handler
    async fn root_handler() -> &'static str {
        "Artwork Resolver"
    }

    // Build router
    let app = Router::new()
        .route("/", get(root_handler).head(root_handler))
        .route("/health", get(|| async { "OK" }))
        .merge(api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Starting server on {}", addr);

    // Create shutdown signal listener
    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        }
    };

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
