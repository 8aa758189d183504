//! CS2 Timer Dashboard Backend
//!
//! Serves live game server state, rolling player-count history and the timer
//! plugin's records to the community dashboard.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod history;
mod models;
mod poller;
mod query;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, ServerRegistry};
use db::Repository;
use history::{HistoryStore, ServerHistories};
use poller::Poller;
use query::QueryClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub query: Arc<QueryClient>,
    /// Global history fed by POST /api/player-count
    pub history: Arc<HistoryStore>,
    /// Per-server histories fed by the poller
    pub server_history: Arc<ServerHistories>,
    /// `None` when no record store is configured
    pub repo: Option<Arc<Repository>>,
}

impl AppState {
    pub fn new(config: Config, repo: Option<Repository>) -> Self {
        Self {
            query: Arc::new(QueryClient::new(config.query_timeout)),
            history: Arc::new(HistoryStore::new(config.history_capacity)),
            server_history: Arc::new(ServerHistories::new(config.history_capacity)),
            repo: repo.map(Arc::new),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CS2 Timer Dashboard Backend");
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Query timeout: {:?}", config.query_timeout);

    match &config.servers {
        ServerRegistry::Valid(targets) => {
            tracing::info!("Configured game servers: {}", targets.len())
        }
        ServerRegistry::Invalid(reason) => {
            tracing::error!("{}; /api/servers will fail until this is fixed", reason)
        }
    }

    let repo = match &config.database_url {
        Some(url) => Some(Repository::new(db::init_database(url)?)),
        None => {
            tracing::warn!("No record store configured (DATABASE_URL or DB_HOST). Record endpoints are disabled!");
            None
        }
    };

    let state = AppState::new(config.clone(), repo);
    tracing::info!("History capacity: {}", state.history.capacity());

    let poller = match (config.poll_interval, config.servers.targets()) {
        (Some(interval), Ok(targets)) if !targets.is_empty() => Some(Poller::start(
            state.query.clone(),
            targets.to_vec(),
            state.server_history.clone(),
            interval,
        )),
        _ => None,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(poller) = poller {
        poller.stop().await;
    }
    tracing::info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    // Writes need the PSK when one is configured
    let record_player_count = post(api::record_player_count).route_layer(middleware::from_fn(
        move |req, next| auth::require_psk(psk.clone(), req, next),
    ));

    // API routes
    let api_routes = Router::new()
        .route("/servers", get(api::list_servers))
        .route("/servers/history", get(api::server_history))
        .route("/servers/history/{connect}", get(api::server_history_by_connect))
        .route(
            "/player-count",
            get(api::get_player_count).merge(record_player_count),
        )
        .route("/getMapRecords", get(api::get_map_records))
        .route("/getMapRecords/grouped", get(api::get_grouped_map_records))
        .route("/getPlayers", get(api::get_players));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
