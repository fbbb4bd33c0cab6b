//! Axum request handlers for all service endpoints.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use bytes::Bytes;
use common::protocol::{ErrorResponse, FileListResponse, HealthResponse, UploadResponse};
use common::ServiceError;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use super::{page, state::AppState};
use crate::crypto::ContainerError;
use crate::storage::{validate_name, StorageError};

/// Message shown for both missing and undecryptable files, so callers cannot
/// tell tampering apart from absence.
const NOT_FOUND_OR_CORRUPTED: &str = "file not found or corrupted";

/// Error returned by handlers, rendered as an [`ErrorResponse`] JSON body.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// `GET /` — HTML page with the upload form and the stored file list.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let files = state.storage.list().await.map_err(listing_failure)?;
    Ok(Html(page::render_index(&files)))
}

/// `POST /upload` — store the multipart field `file`, then redirect to `/`.
///
/// The upload is spooled to a scratch file that is sealed into the store and
/// removed; the guard also removes it if anything fails part-way.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_failure)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().map(client_file_name).unwrap_or_default();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("no file selected".into()).into());
        }
        validate_name(&name).map_err(|e| storage_failure(&name, e))?;

        let scratch = state.storage.scratch_file(&name);
        let mut file = tokio::fs::File::create(scratch.path())
            .await
            .map_err(io_failure)?;
        while let Some(chunk) = field.chunk().await.map_err(multipart_failure)? {
            file.write_all(&chunk).await.map_err(io_failure)?;
        }
        file.flush().await.map_err(io_failure)?;
        drop(file);

        state
            .storage
            .import(&name, scratch.path())
            .await
            .map_err(|e| storage_failure(&name, e))?;
        return Ok(Redirect::to("/"));
    }
    Err(ServiceError::BadRequest("missing multipart field `file`".into()).into())
}

/// `GET /download/{name}` — stream the decrypted file as an attachment.
///
/// The decrypted scratch copy is deleted once the body has been sent or the
/// connection is dropped.
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let scratch = state
        .storage
        .retrieve(&name)
        .await
        .map_err(|e| storage_failure(&name, e))?;
    let len = tokio::fs::metadata(scratch.path())
        .await
        .map_err(io_failure)?
        .len();
    let stream = scratch.into_stream().await.map_err(io_failure)?;

    info!(name, bytes = len, "file downloaded");
    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (header::CONTENT_DISPOSITION, content_disposition(&name)),
        (header::CONTENT_LENGTH, len.to_string()),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `GET /files` — JSON list of stored file names.
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.storage.list().await.map_err(listing_failure)?;
    Ok(Json(FileListResponse { files }))
}

/// `PUT /files/{name}` — store the raw request body as `name`.
pub async fn put_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let stored_bytes = state
        .storage
        .store(&name, &body)
        .await
        .map_err(|e| storage_failure(&name, e))?;
    Ok((StatusCode::CREATED, Json(UploadResponse { name, stored_bytes })))
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when the upload directory exists and is readable.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let key_id = state.storage.codec().key_id();
    let listing = match state.storage.check().await {
        Ok(()) => state.storage.list().await,
        Err(e) => Err(e),
    };
    let (status_code, status_str, stored_files) = match listing {
        Ok(files) => (StatusCode::OK, "ok", files.len()),
        Err(e) => {
            warn!(error = %e, "upload directory unreadable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", 0)
        }
    };

    let body = HealthResponse {
        status: status_str.into(),
        key_id,
        stored_files,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Error mapping helpers
// ---------------------------------------------------------------------------

/// Map a storage failure for `name` onto a caller-safe error.
///
/// Missing, truncated, and tampered containers all become the same 404.
fn storage_failure(name: &str, err: StorageError) -> ApiError {
    let service = match err {
        StorageError::InvalidName => ServiceError::BadRequest("invalid file name".into()),
        StorageError::NotFound => ServiceError::NotFound(NOT_FOUND_OR_CORRUPTED.into()),
        StorageError::Container(
            e @ (ContainerError::Malformed(_) | ContainerError::Authentication),
        ) => {
            warn!(name, error = %e, "stored container rejected");
            ServiceError::NotFound(NOT_FOUND_OR_CORRUPTED.into())
        }
        other => {
            error!(name, error = %other, "storage operation failed");
            ServiceError::Internal("internal error".into())
        }
    };
    ApiError(service)
}

fn listing_failure(err: StorageError) -> ApiError {
    error!(error = %err, "failed to list stored files");
    ApiError(ServiceError::Internal("internal error".into()))
}

fn io_failure(err: std::io::Error) -> ApiError {
    error!(error = %err, "file I/O failed");
    ApiError(ServiceError::Internal("internal error".into()))
}

fn multipart_failure(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(ServiceError::PayloadTooLarge("upload exceeds the size limit".into()))
    } else {
        ApiError(ServiceError::BadRequest(err.body_text()))
    }
}

/// Strip any directory part a browser may have sent with the file name.
fn client_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_owned()
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' '..='~' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        page::percent_encode(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ContainerCodec;
    use crate::key::SecretKey;
    use crate::storage::Storage;
    use axum::routing::get;
    use axum::{http::Request, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state(dir: &std::path::Path) -> AppState {
        let key = SecretKey::from_slice(b"0123456789abcdef").unwrap();
        AppState::new(Storage::new(dir, Arc::new(ContainerCodec::new(key))))
    }

    #[tokio::test]
    async fn health_returns_ok_with_key_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.storage.store("a.txt", b"a").await.unwrap();
        let key_id = state.storage.codec().key_id();

        let app = Router::new()
            .route("/health", get(health))
            .with_state(state);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.stored_files, 1);
        assert_eq!(health.key_id, key_id);
    }

    #[tokio::test]
    async fn health_degraded_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let app = Router::new()
            .route("/health", get(health))
            .with_state(test_state(&not_a_dir));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_degraded_when_directory_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let state = test_state(&root);
        state.storage.init().await.unwrap();
        std::fs::remove_dir(&root).unwrap();

        let app = Router::new()
            .route("/health", get(health))
            .with_state(state);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "degraded");
    }

    #[test]
    fn missing_and_tampered_map_to_same_error() {
        let missing = storage_failure("a", StorageError::NotFound).into_response();
        let tampered = storage_failure(
            "a",
            StorageError::Container(ContainerError::Authentication),
        )
        .into_response();
        let truncated = storage_failure(
            "a",
            StorageError::Container(ContainerError::Malformed(3)),
        )
        .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(tampered.status(), StatusCode::NOT_FOUND);
        assert_eq!(truncated.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_failures_map_to_generic_statuses() {
        let bad = storage_failure("a", StorageError::InvalidName).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let io = storage_failure(
            "a",
            StorageError::Io(std::io::Error::other("disk full")),
        )
        .into_response();
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_file_name_strips_directories() {
        assert_eq!(client_file_name("report.pdf"), "report.pdf");
        assert_eq!(client_file_name("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(client_file_name("/home/me/report.pdf"), "report.pdf");
        assert_eq!(client_file_name("dir/"), "");
    }

    #[test]
    fn content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("a b.txt"),
            "attachment; filename=\"a b.txt\"; filename*=UTF-8''a%20b.txt"
        );
        let header = content_disposition("ré\"sumé.txt");
        assert!(header.starts_with("attachment; filename=\"r__sum_.txt\""));
        assert!(header.ends_with("filename*=UTF-8''r%C3%A9%22sum%C3%A9.txt"));
    }
}
