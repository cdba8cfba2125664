//! HTTP server for the tagsheet API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/upload`     | Upload an `.xlsx` register           |
//! | GET    | `/api/logs`       | SSE stream for real-time job logs    |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, log_warning, LOG_BROADCASTER};
use super::types::{reject, UploadResponse};
use crate::config::Settings;
use crate::delivery::{JsonSnapshot, OutboxDelivery};
use crate::error::ServerError;
use crate::transform::pipeline::{JobContext, Orchestrator};
use crate::transform::CategoryRegistry;

/// Multipart framing allowance on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

type Rejection = (StatusCode, Json<Value>);

/// Build the router.
pub fn app(settings: Settings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = settings.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_xlsx))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(Arc::new(settings))
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Tagsheet server running on http://localhost:{}", port);
    println!("   POST /api/upload - Upload .xlsx register");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");
    println!();
    println!("📮 Outbox: {}", settings.outbox_dir.display());
    if let Some(ref dir) = settings.snapshot_dir {
        println!("💾 Snapshots: {}", dir.display());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(settings)).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tagsheet",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: multipart `file` plus optional `email`.
async fn upload_xlsx(
    State(settings): State<Arc<Settings>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, Rejection> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut email: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?;
                file_data = Some(bytes.to_vec());
            }
            "email" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?;
                email = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;
    if bytes.len() > settings.max_upload_bytes {
        log_warning(format!("Rejected upload of {} bytes", bytes.len()));
        return Err(reject(ServerError::PayloadTooLarge {
            size: bytes.len(),
            limit: settings.max_upload_bytes,
        }));
    }

    let document = file_name.unwrap_or_else(|| "upload.xlsx".to_string());
    let job = JobContext::new(document, email);
    log_info(format!(
        "📄 New upload: {} ({} bytes), job {}",
        job.document_name,
        bytes.len(),
        job.job_id
    ));

    let report = tokio::task::spawn_blocking(move || {
        let mut orchestrator = Orchestrator::new(CategoryRegistry::builtin());
        if job.initiator.is_some() {
            orchestrator = orchestrator.with_delivery(OutboxDelivery::new(settings.outbox_dir.clone()));
        }
        if let Some(ref dir) = settings.snapshot_dir {
            orchestrator = orchestrator.with_persistence(JsonSnapshot::new(dir.clone()));
        }
        orchestrator.transform_bytes(&bytes, &job)
    })
    .await
    .map_err(|e| reject(ServerError::Internal(e.to_string())))?
    .map_err(|e| {
        log_error(format!("❌ Job failed: {}", e));
        reject(ServerError::from(e))
    })?;

    log_success(format!(
        "✅ Job {} done: {} row(s) in {} sheet(s)",
        report.job_id,
        report.workbook.row_count(),
        report.workbook.len()
    ));
    Ok(Json(UploadResponse::from(report)))
}
