//! Station Feed API Server
//!
//! Signed ingestion of station readings and decimated range queries for
//! the charting front end.

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod auth;
pub mod error;
pub mod ingest;
pub mod query;
pub mod rate_limit;
pub mod routes;
pub mod settings;

use auth::{SignatureVerifier, SIGNATURE_HEADER};
use data_validator::Validator;
use ingest::IngestionService;
use query::QueryService;
use settings::{LogFormat, ServerSettings, Settings};
use storage::{open_store, ReadingStore, StorageError};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub ingest: IngestionService,
    pub query: QueryService,
    pub verifier: SignatureVerifier,
    /// Prometheus handle; `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire both services to one store
    pub fn new(store: Arc<dyn ReadingStore>, settings: &Settings) -> Self {
        Self {
            ingest: IngestionService::new(
                store.clone(),
                Validator::new(settings.validation.clone()),
            ),
            query: QueryService::new(store.clone(), settings.query.window_ms),
            verifier: SignatureVerifier::new(settings.auth.signing_key.as_deref()),
            store,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Startup failures
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("rate limit needs a positive rate and burst size")]
    RateLimit,
    #[error("metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime_seconds: u64,
    pub feed_count: u64,
    pub signing_enabled: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, settings: &Settings) -> Result<Router, StartupError> {
    let governor = rate_limit::create_governor_config(&settings.rate_limit)
        .ok_or(StartupError::RateLimit)?;

    let router = Router::new()
        .route(
            "/api/v1/feeds",
            get(routes::feeds::get_range).merge(
                post(routes::feeds::post_feed).layer(GovernorLayer { config: governor }),
            ),
        )
        .route("/api/v1/feeds/latest", get(routes::feeds::get_latest))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(RequestBodyLimitLayer::new(settings.server.body_limit_bytes))
        .layer(cors_layer(&settings.server))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SIGNATURE_HEADER)])
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, feed_count) = match state.store.count().await {
        Ok(count) => ("healthy", count),
        Err(err) => {
            warn!("Health check could not count feeds: {}", err);
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: storage::now_millis(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        feed_count,
        signing_enabled: state.verifier.is_enabled(),
    })
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(err) = result {
        eprintln!("Tracing subscriber already set: {}", err);
    }
}

/// Run the server
pub async fn run_server(settings: Settings) -> Result<(), StartupError> {
    let store = open_store(&settings.storage).await?;
    let metrics = PrometheusBuilder::new().install_recorder()?;

    let state = AppState::new(store, &settings).with_metrics(metrics);
    if !state.verifier.is_enabled() {
        warn!("No signing key configured; accepting unsigned readings");
    }

    let app = create_router(Arc::new(state), &settings)?;

    info!("Starting API server on {}", settings.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
