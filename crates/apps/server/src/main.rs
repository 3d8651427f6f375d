mod generator;
mod ws_feed;

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use streaming::FeedConfig;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::generator::PointGenerator;
use crate::ws_feed::{serve_socket, FeedSession};

#[derive(Clone, Debug, PartialEq)]
struct ServerConfig {
    addr: SocketAddr,
    static_dir: PathBuf,
    /// Fixed seed for reproducible feeds; each connection offsets it by its
    /// connection number.
    seed: Option<u64>,
    feed: FeedConfig,
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = FeedConfig::default();
        let addr = lookup("FEED_ADDR").unwrap_or_else(|| "0.0.0.0:5005".to_string());
        let addr = addr
            .parse()
            .with_context(|| format!("invalid FEED_ADDR `{addr}`"))?;
        Ok(Self {
            addr,
            static_dir: lookup("FEED_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("build")),
            seed: lookup("FEED_SEED").and_then(|v| v.parse().ok()),
            feed: FeedConfig {
                interval_ms: parse_or(lookup("FEED_INTERVAL_MS"), defaults.interval_ms).max(1),
                batch_size: parse_or(lookup("FEED_BATCH_SIZE"), defaults.batch_size),
                icon_url: defaults.icon_url,
            },
        })
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
    connections: Arc<AtomicU64>,
}

impl AppState {
    fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            connections: Arc::new(AtomicU64::new(0)),
        }
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    if !config.static_dir.is_dir() {
        warn!(dir = %config.static_dir.display(), "static bundle directory not found");
    }

    let app = router(AppState::new(config.clone()));

    info!(
        interval_ms = config.feed.interval_ms,
        batch_size = config.feed.batch_size,
        "feed server listening on ws://{}",
        config.addr
    );
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("feed server stopped");
    Ok(())
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// `/` carries both the feed and the bundle's index page: upgrade requests
/// join the feed, plain requests fall through to the static directory.
async fn root(
    State(state): State<AppState>,
    ws: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    match ws {
        Some(ws) => upgrade(ws, &state),
        None => match ServeDir::new(&state.config.static_dir).oneshot(req).await {
            Ok(res) => res.into_response(),
            Err(never) => match never {},
        },
    }
}

fn upgrade(ws: WebSocketUpgrade, state: &AppState) -> Response {
    let n = state.connections.fetch_add(1, Ordering::Relaxed);
    let cfg = &state.config;
    let generator = match cfg.seed {
        Some(seed) => PointGenerator::seeded(seed.wrapping_add(n), &cfg.feed),
        None => PointGenerator::from_entropy(&cfg.feed),
    };
    let session = FeedSession::new(cfg.feed.interval(), generator);
    debug!(session = %session.id(), connection = n, "upgrading listener");
    ws.on_upgrade(move |socket| async move {
        serve_socket(socket, session).await;
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}
