// Server module - axum HTTP server setup and configuration

pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::{Config, FailureStatus, ServerConfig};
use crate::watermark::WatermarkService;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<WatermarkService>,
}

impl AppState {
    pub fn new(service: WatermarkService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the application router: the watermark API plus, when configured,
/// the static frontend with an `index.html` fallback.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut api = Router::new()
        .route("/api/watermark/add", post(routes::add_watermark))
        .route("/api/watermark/add-pdf", post(routes::add_pdf_watermark))
        .route("/api/watermark/health", get(routes::health))
        .layer(DefaultBodyLimit::max(config.max_body_size_bytes()));

    if config.failure_status == FailureStatus::Ok {
        api = api.layer(middleware::map_response(failures_as_ok));
    }

    let api = api
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match &config.static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            let frontend = ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .fallback(index);
            api.fallback_service(frontend)
        }
        None => api,
    }
}

/// Rewrite JSON failure envelopes to 200 for clients that only read the body.
async fn failures_as_ok(mut response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json && (response.status().is_client_error() || response.status().is_server_error()) {
        *response.status_mut() = StatusCode::OK;
    }
    response
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config, service: WatermarkService) -> std::io::Result<()> {
    let app = router(AppState::new(service), &config.server);
    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        max_body_size_mb = config.server.max_body_size_mb,
        static_dir = ?config.server.static_dir,
        "imageseal listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
