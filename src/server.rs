//! HTTP surface.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/upload-pdf/` (also under `/api/v1`) | multipart, field `file` |
//! | `GET`  | `/health` | none |
//!
//! A processed upload answers 200 with [`ExtractionResponse`]. Any pipeline
//! failure answers 500 with `{"detail": "Error processing PDF: <message>"}`;
//! a request without a `file` part answers 422 and a body over
//! [`MAX_UPLOAD_BYTES`] answers 413.
//!
//! [`ExtractionResponse`]: crate::output::ExtractionResponse

use crate::config::ExtractorConfig;
use crate::error::PdfTablesError;
use crate::extract::TablePipeline;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Name reported by the service.
pub const SERVICE_TITLE: &str = "PDF Table Extractor";

/// Prefix under which the upload route is mounted a second time.
pub const API_PREFIX: &str = "/api/v1";

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TablePipeline>,
}

impl AppState {
    pub fn new(pipeline: TablePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    create_router_with_limit(state, MAX_UPLOAD_BYTES)
}

/// Like [`create_router`] with a custom request body limit.
pub fn create_router_with_limit(state: AppState, body_limit: usize) -> Router {
    let upload = Router::new()
        .route("/upload-pdf/", post(upload_pdf))
        .route("/upload-pdf", post(upload_pdf));

    Router::new()
        .merge(upload.clone())
        .nest(API_PREFIX, upload)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the web server.
pub async fn serve(config: ExtractorConfig, host: &str, port: u16) -> Result<(), PdfTablesError> {
    let pipeline = TablePipeline::from_config(config)?;
    let app = create_router(AppState::new(pipeline));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| PdfTablesError::InvalidConfig(format!("bind address {host}:{port}: {e}")))?;
    info!("Starting {} at http://{}", SERVICE_TITLE, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PdfTablesError::Internal(format!("bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| PdfTablesError::Internal(format!("server: {e}")))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

/// 413 when the body limit was hit, 422 for any other malformed multipart.
fn field_error(e: MultipartError) -> Response {
    let status = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    warn!("Rejected upload: {}", e);
    detail(status, e.body_text())
}

async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()),
    };

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes));
                        break;
                    }
                    Err(e) => return field_error(e),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return field_error(e),
        }
    }

    let Some((filename, bytes)) = upload else {
        warn!("Upload without a 'file' field");
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "Field 'file' is required");
    };

    info!("Received {} ({} bytes)", filename, bytes.len());
    match state.pipeline.process_bytes(&bytes).await {
        Ok(report) => Json(report.response).into_response(),
        Err(e) => {
            error!("Error processing {}: {}", filename, e);
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing PDF: {e}"),
            )
        }
    }
}
