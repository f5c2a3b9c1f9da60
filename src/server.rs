//! Browser front-end server.
//!
//! Serves the widget page and forwards its two API calls to the configured
//! backend, so the page only ever talks to its own origin.

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{Endpoint, HttpBackend};
use crate::config::{AppConfig, DEFAULT_CHAT_PATH, DEFAULT_UPLOAD_PATH, WidgetConfig};
use crate::page::render_page;

/// Largest request body accepted for forwarding (25MB).
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// State shared across handlers.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Rendered widget page.
    page: Bytes,
    /// Client for the real backend.
    backend: Arc<HttpBackend>,
}

impl ServerState {
    /// Render the page once and wrap the backend client for sharing.
    pub fn new(widget: &WidgetConfig, backend: HttpBackend) -> Self {
        Self {
            page: Bytes::from(render_page(widget)),
            backend: Arc::new(backend),
        }
    }
}

/// Build the router: `/` plus the two forwarded API routes.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(DEFAULT_CHAT_PATH, post(chat_handler))
        .route(DEFAULT_UPLOAD_PATH, post(upload_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the page server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend = HttpBackend::from_config(&config.backend)?;

    info!(
        name: "backend.config.loaded",
        chat_url = %backend.endpoint_url(Endpoint::Chat),
        upload_url = %backend.endpoint_url(Endpoint::Upload),
        "Backend configuration loaded"
    );

    let app = router(ServerState::new(&config.widget, backend));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - the widget page.
async fn index_handler(State(state): State<ServerState>) -> Html<Bytes> {
    Html(state.page.clone())
}

/// POST /api/chat - forwarded verbatim.
async fn chat_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(&state, Endpoint::Chat, &headers, body).await
}

/// POST /api/upload - forwarded verbatim, multipart boundary included.
async fn upload_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(&state, Endpoint::Upload, &headers, body).await
}

async fn forward(
    state: &ServerState,
    endpoint: Endpoint,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    tracing::debug!(
        endpoint = ?endpoint,
        body_len = body.len(),
        "Forwarding request to backend"
    );

    let upstream = match state.backend.forward(endpoint, content_type, body).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(endpoint = ?endpoint, error = %e, "Backend unreachable");
            return bad_gateway();
        }
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let upstream_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = (status, bytes).into_response();
            if let Some(value) = upstream_type {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            response
        }
        Err(e) => {
            tracing::error!(endpoint = ?endpoint, error = %e, "Backend response interrupted");
            bad_gateway()
        }
    }
}

/// Plain-text 502; the page fails to parse it and shows its connection error.
fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Backend unavailable").into_response()
}
