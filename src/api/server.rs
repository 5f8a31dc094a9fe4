//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::handlers::{self, UploadError};
use super::models::ErrorBody;
use crate::analysis::TermSheetAnalyzer;
use crate::config::Config;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<TermSheetAnalyzer>,
    pub config: Arc<Config>,
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state.config.server.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(
    analyzer: Arc<TermSheetAnalyzer>,
    config: Arc<Config>,
    port: u16,
) -> Result<()> {
    let app = build_router(AppState { analyzer, config });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(e: UploadError) -> Response {
    let status = e.status();
    if status.is_server_error() {
        error!("Error in /api/analyze: {}", e);
    } else {
        warn!("Rejected upload: {}", e);
    }
    (status, Json(ErrorBody::new(e.to_string()))).into_response()
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check()))
}

/// Document upload and analysis handler
async fn analyze_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break None,
            Err(e) => return multipart_error(e, &state),
        };

        if field.name() != Some("file") {
            continue;
        }

        let mime_type = field.content_type().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => break Some((mime_type, bytes)),
            Err(e) => return multipart_error(e, &state),
        }
    };

    let Some((mime_type, bytes)) = upload else {
        return error_response(UploadError::MissingFile);
    };

    let server = &state.config.server;
    let mime_type = match handlers::validate_upload(mime_type.as_deref(), bytes.len(), server) {
        Ok(mime_type) => mime_type,
        Err(e) => return error_response(e),
    };

    match handlers::analyze_upload(&state.analyzer, server, bytes.to_vec(), mime_type).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError, state: &AppState) -> Response {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let limit_mb = state.config.server.max_upload_bytes / (1024 * 1024);
        return error_response(UploadError::TooLarge(limit_mb));
    }
    error_response(UploadError::Malformed(e.body_text()))
}
