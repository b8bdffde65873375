//! Classification service: `POST /analyze` with a multipart `file` part,
//! answered with `{"heuristic": {...}}`.
//!
//! This is the server side of `HttpClassifier`. Uploads are decoded in
//! memory and classified with `HeuristicClassifier` on the blocking pool.

use std::future::Future;

use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use scanpro_core::{ClassifyError, ServiceResponse};
use serde_json::json;

use crate::classifier::HeuristicClassifier;

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
enum ApiError {
    MissingFile,
    Multipart(String),
    Classify(ClassifyError),
    Worker(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::MissingFile => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("missing multipart field '{FILE_FIELD}'"),
            ),
            ApiError::Multipart(e) => (StatusCode::BAD_REQUEST, format!("bad multipart body: {e}")),
            ApiError::Classify(ClassifyError::ImageDecode(e)) => {
                (StatusCode::BAD_REQUEST, format!("image decode error: {e}"))
            }
            ApiError::Classify(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Worker(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        tracing::warn!(%status, %detail, "analyze rejected");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Routes of the service, for embedding or serving.
pub fn router() -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

async fn analyze(mut multipart: Multipart) -> Result<Json<ServiceResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("-").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Multipart(e.to_string()))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) = upload.ok_or(ApiError::MissingFile)?;

    let size = bytes.len();
    let heuristic =
        tokio::task::spawn_blocking(move || HeuristicClassifier::new().classify_bytes(&bytes))
            .await
            .map_err(|e| ApiError::Worker(format!("classifier task failed: {e}")))?
            .map_err(ApiError::Classify)?;
    tracing::info!(
        file = %file_name,
        size,
        object = %heuristic.object,
        threat = heuristic.threat_score,
        "analyzed upload"
    );
    Ok(Json(ServiceResponse { heuristic }))
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "classification service listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!(%addr, "classification service stopped");
    Ok(())
}

/// Blocking entry point: runs the service on its own runtime. Binding stays
/// with the caller so address errors surface before the runtime starts.
pub fn run<F>(listener: std::net::TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    listener.set_nonblocking(true)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::from_std(listener)?;
        serve(listener, shutdown).await
    })
}
