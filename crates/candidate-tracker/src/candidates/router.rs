use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::export::{ExportArtifact, ExportError, ExportFormat, ExportId, ExportScope, ExportStatus, PageRequest};

use super::domain::{CandidateId, CandidatePatch, CandidateUpdate, NewCandidate};
use super::labels::Locale;
use super::repository::{CandidateRepository, RepositoryError};
use super::service::{CandidateService, CandidateServiceError};

const DEFAULT_LIST_SIZE: usize = 20;

/// Router builder exposing candidate CRUD and export endpoints.
pub fn candidate_router<R>(service: Arc<CandidateService<R>>) -> Router
where
    R: CandidateRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/v1/candidates/export", get(export_handler::<R>))
        .route(
            "/api/v1/candidates/export/async",
            post(submit_export_handler::<R>),
        )
        .route(
            "/api/v1/candidates/export/async/:export_id",
            get(download_handler::<R>),
        )
        .route(
            "/api/v1/candidates/export/async/:export_id/status",
            get(export_status_handler::<R>),
        )
        .route(
            "/api/v1/candidates/:candidate_id",
            get(get_handler::<R>)
                .put(replace_handler::<R>)
                .patch(patch_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<usize>,
    size: Option<usize>,
}

/// Body of `POST /export/async`; the same fields arrive as query parameters on
/// the synchronous download.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExportRequest {
    format: String,
    #[serde(default)]
    export_all: bool,
    page: Option<usize>,
    size: Option<usize>,
}

impl ExportRequest {
    fn resolve(&self) -> Result<(ExportFormat, ExportScope), ExportError> {
        let format = self.format.parse::<ExportFormat>()?;
        let scope = ExportScope::from_parts(self.export_all, self.page, self.size)?;
        Ok((format, scope))
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    let request = PageRequest::new(
        query.page.unwrap_or(0),
        query.size.unwrap_or(DEFAULT_LIST_SIZE),
    );
    match service.list(request, locale) {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<u64>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    match service.get(CandidateId(candidate_id), locale) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<NewCandidate>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    match service.create(body, locale) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn replace_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<u64>,
    axum::Json(body): axum::Json<CandidateUpdate>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    match service.replace(CandidateId(candidate_id), body, locale) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn patch_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<u64>,
    axum::Json(patch): axum::Json<CandidatePatch>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    match service.patch(CandidateId(candidate_id), patch, locale) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<u64>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    match service.delete(CandidateId(candidate_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn submit_export_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ExportRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    let (format, scope) = match request.resolve() {
        Ok(resolved) => resolved,
        Err(err) => return export_error_response(&err, locale),
    };

    match service.submit_export(format, scope, locale) {
        Ok(ticket) => {
            let accepted = locale.message("export.accepted").unwrap_or("Export in progress");
            let payload = json!({
                "export_id": ticket.id.to_string(),
                "message": format!("{accepted}. ID: {}", ticket.id),
                "status_url": format!("/api/v1/candidates/export/async/{}/status", ticket.id),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err, locale),
    }
}

pub(crate) async fn download_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Path(export_id): Path<String>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    let Ok(id) = export_id.parse::<ExportId>() else {
        return export_not_found(locale);
    };

    match service.exports().status(&id) {
        ExportStatus::Ready { artifact, .. } => artifact_response(&artifact),
        ExportStatus::Failed(err) => export_error_response(&err, locale),
        ExportStatus::Pending | ExportStatus::Expired | ExportStatus::Unknown => {
            export_not_found(locale)
        }
    }
}

pub(crate) async fn export_status_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    Path(export_id): Path<String>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let status = match export_id.parse::<ExportId>() {
        Ok(id) => service.exports().status(&id),
        Err(_) => ExportStatus::Unknown,
    };

    let mut payload = json!({
        "export_id": export_id,
        "status": status.code(),
    });
    match &status {
        ExportStatus::Ready {
            artifact,
            expires_at,
        } => {
            payload["filename"] = json!(artifact.filename);
            payload["format"] = json!(artifact.format);
            payload["rows"] = json!(artifact.rows);
            payload["size_bytes"] = json!(artifact.size());
            payload["expires_at"] = json!(expires_at.to_rfc3339());
        }
        ExportStatus::Failed(err) => {
            payload["error"] = json!(err.to_string());
        }
        _ => {}
    }

    let code = match status {
        ExportStatus::Unknown => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    (code, axum::Json(payload)).into_response()
}

pub(crate) async fn export_handler<R>(
    State(service): State<Arc<CandidateService<R>>>,
    headers: HeaderMap,
    Query(request): Query<ExportRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
{
    let locale = Locale::from_headers(&headers);
    let (format, scope) = match request.resolve() {
        Ok(resolved) => resolved,
        Err(err) => return export_error_response(&err, locale),
    };

    let outcome =
        tokio::task::spawn_blocking(move || service.export_now(format, scope, locale)).await;
    match outcome {
        Ok(Ok(artifact)) => artifact_response(&artifact),
        Ok(Err(err)) => error_response(err, locale),
        Err(join) => export_error_response(&ExportError::Worker(join.to_string()), locale),
    }
}

fn artifact_response(artifact: &ExportArtifact) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", artifact.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes.clone(),
    )
        .into_response()
}

fn export_not_found(locale: Locale) -> Response {
    let message = locale
        .message("export.not_found")
        .unwrap_or("Export not found or still in progress");
    let payload = json!({
        "error": message,
        "error_code": "NOT_FOUND_001",
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn localized(locale: Locale, key: &str) -> &'static str {
    locale.message(key).unwrap_or("error")
}

pub(crate) fn error_response(err: CandidateServiceError, locale: Locale) -> Response {
    match err {
        CandidateServiceError::Validation(errors) => {
            let payload = json!({
                "error": localized(locale, "error.validation"),
                "error_code": "VAL_001",
                "validation_errors": errors,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        CandidateServiceError::NotFound(id) => {
            let payload = json!({
                "error": localized(locale, "error.not_found"),
                "error_code": "NOT_FOUND_001",
                "messages": [format!("candidate {id} not found")],
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        CandidateServiceError::Repository(RepositoryError::Conflict(field)) => {
            let payload = json!({
                "error": localized(locale, "error.conflict"),
                "error_code": "CONFLICT_001",
                "messages": [format!("a candidate with the same {field} already exists")],
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        CandidateServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "error": localized(locale, "error.not_found"),
                "error_code": "NOT_FOUND_001",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        CandidateServiceError::Export(err) => export_error_response(&err, locale),
        CandidateServiceError::Repository(other) => {
            error!(error = %other, "candidate repository failure");
            let payload = json!({
                "error": localized(locale, "error.internal"),
                "error_code": "INTERNAL_001",
                "messages": [other.to_string()],
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) fn export_error_response(err: &ExportError, locale: Locale) -> Response {
    match err {
        ExportError::LimitExceeded {
            format,
            ceiling,
            requested,
        } => {
            let payload = json!({
                "error": localized(locale, "error.export_limit"),
                "error_code": "EXPORT_LIMIT_001",
                "format": format,
                "max_allowed": ceiling,
                "requested": requested,
                "messages": [err.to_string()],
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ExportError::UnsupportedFormat(_) | ExportError::InvalidScope(_) => {
            let payload = json!({
                "error": localized(locale, "error.bad_request"),
                "error_code": "BAD_REQUEST_001",
                "messages": [err.to_string()],
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        ExportError::Source(_) | ExportError::Encode { .. } | ExportError::Worker(_) => {
            let payload = json!({
                "error": localized(locale, "error.internal"),
                "error_code": "INTERNAL_001",
                "messages": [err.to_string()],
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
