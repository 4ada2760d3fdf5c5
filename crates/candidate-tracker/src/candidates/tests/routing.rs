use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::candidates::repository::CandidateRepository;
use crate::candidates::router::{delete_handler, get_handler};

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn await_ready(router: &Router, export_id: &str) -> Value {
    let status_url = format!("/api/v1/candidates/export/async/{export_id}/status");
    for _ in 0..100 {
        let response = send(router, get(&status_url)).await;
        let payload = read_json_body(response).await;
        if payload["status"] != "PENDING" {
            return payload;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("export {export_id} never settled");
}

#[tokio::test]
async fn create_route_returns_created_view() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let body = serde_json::to_value(new_candidate(1)).unwrap();
    let response = send(&router, json_request("POST", "/api/v1/candidates", &body)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], 1);
    assert_eq!(payload["status"], "ACTIVE");
    assert_eq!(payload["status_label"], "Activo");
    assert_eq!(payload["registered_on"], "2025-06-01");
}

#[tokio::test]
async fn create_route_reports_validation_errors() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let mut body = serde_json::to_value(new_candidate(1)).unwrap();
    body["email"] = json!("broken");
    body["phone"] = json!("12");
    let response = send(&router, json_request("POST", "/api/v1/candidates", &body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "VAL_001");
    let fields: Vec<_> = payload["validation_errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["field"].as_str().unwrap().to_string())
        .collect();
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"phone".to_string()));
}

#[tokio::test]
async fn create_route_maps_duplicates_to_conflict() {
    let (service, _, _) = seeded_service(1);
    let router = router_with_service(service);

    let mut body = serde_json::to_value(new_candidate(2)).unwrap();
    body["document_number"] = json!("10000001");
    let response = send(&router, json_request("POST", "/api/v1/candidates", &body)).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "CONFLICT_001");
}

#[tokio::test]
async fn get_handler_returns_not_found_for_unknown_ids() {
    let (service, _, _) = build_service();

    let response = get_handler::<MemoryRepository>(
        State(Arc::new(service)),
        HeaderMap::new(),
        Path(42),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "NOT_FOUND_001");
}

#[tokio::test]
async fn get_handler_returns_internal_error_on_repository_failure() {
    let service = unavailable_service();

    let response = get_handler::<UnavailableRepository>(
        State(Arc::new(service)),
        HeaderMap::new(),
        Path(1),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "INTERNAL_001");
}

#[tokio::test]
async fn delete_handler_returns_no_content() {
    let (service, repository, _) = seeded_service(1);

    let response =
        delete_handler::<MemoryRepository>(State(Arc::new(service)), HeaderMap::new(), Path(1))
            .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(repository.all().unwrap().is_empty());
}

#[tokio::test]
async fn patch_route_updates_a_single_field() {
    let (service, _, _) = seeded_service(1);
    let router = router_with_service(service);

    let response = send(
        &router,
        json_request("PATCH", "/api/v1/candidates/1", &json!({ "city": "Cali" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["city"], "Cali");
    assert_eq!(payload["country"], "Colombia");
    assert_eq!(payload["modified_by"], "system");
}

#[tokio::test]
async fn list_route_uses_accept_language() {
    let (service, _, _) = seeded_service(3);
    let router = router_with_service(service);

    let request = Request::get("/api/v1/candidates?page=0&size=2")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["content"].as_array().unwrap().len(), 2);
    assert_eq!(payload["content"][0]["status_label"], "Active");
    assert_eq!(payload["total_elements"], 3);
    assert_eq!(payload["total_pages"], 2);
    assert_eq!(payload["last"], false);
}

#[tokio::test]
async fn list_route_tolerates_the_largest_page_index() {
    let (service, _, _) = seeded_service(3);
    let router = router_with_service(service);

    let uri = format!("/api/v1/candidates?page={}&size=20", usize::MAX);
    let response = send(&router, get(&uri)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["content"].as_array().unwrap().is_empty());
    assert_eq!(payload["total_elements"], 3);
    assert_eq!(payload["last"], true);
}

#[tokio::test]
async fn sync_export_downloads_csv_attachment() {
    let (service, _, _) = seeded_service(2);
    let router = router_with_service(service);

    let response = send(
        &router,
        get("/api/v1/candidates/export?format=csv&export_all=true"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"exported-data.csv\""
    );
    let body = String::from_utf8(read_body(response).await).unwrap();
    assert_eq!(body.lines().count(), 3);
}

#[tokio::test]
async fn sync_export_over_the_ceiling_is_unprocessable() {
    let (service, _, _) = seeded_service(4);
    let router = router_with_service(service);

    let response = send(
        &router,
        get("/api/v1/candidates/export?format=pdf&export_all=true"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "EXPORT_LIMIT_001");
    assert_eq!(payload["format"], "PDF");
    assert_eq!(payload["max_allowed"], 3);
    assert_eq!(payload["requested"], 4);
}

#[tokio::test]
async fn unsupported_format_is_a_bad_request() {
    let (service, _, _) = seeded_service(1);
    let router = router_with_service(service);

    let response = send(
        &router,
        json_request(
            "POST",
            "/api/v1/candidates/export/async",
            &json!({ "format": "docx", "export_all": true }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error_code"], "BAD_REQUEST_001");
}

#[tokio::test]
async fn async_export_is_accepted_then_downloadable() {
    let (service, _, _) = seeded_service(3);
    let router = router_with_service(service);

    let response = send(
        &router,
        json_request(
            "POST",
            "/api/v1/candidates/export/async",
            &json!({ "format": "excel", "export_all": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = read_json_body(response).await;
    let export_id = accepted["export_id"].as_str().unwrap().to_string();
    assert_eq!(
        accepted["status_url"],
        format!("/api/v1/candidates/export/async/{export_id}/status")
    );
    assert!(accepted["message"]
        .as_str()
        .unwrap()
        .ends_with(&export_id));

    let status = await_ready(&router, &export_id).await;
    assert_eq!(status["status"], "READY");
    assert_eq!(status["filename"], "exported-data.xlsx");
    assert_eq!(status["rows"], 3);

    let response = send(
        &router,
        get(&format!("/api/v1/candidates/export/async/{export_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"exported-data.xlsx\""
    );
    let bytes = read_body(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn async_export_over_the_ceiling_fails_without_an_artifact() {
    let (service, _, _) = seeded_service(4);
    let router = router_with_service(service);

    let response = send(
        &router,
        json_request(
            "POST",
            "/api/v1/candidates/export/async",
            &json!({ "format": "pdf", "export_all": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let export_id = read_json_body(response).await["export_id"]
        .as_str()
        .unwrap()
        .to_string();

    let status = await_ready(&router, &export_id).await;
    assert_eq!(status["status"], "FAILED");

    let response = send(
        &router,
        get(&format!("/api/v1/candidates/export/async/{export_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_export_ids_are_not_found() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = send(
        &router,
        get("/api/v1/candidates/export/async/6f1c2b7e-0c1f-4a57-9d55-8f0f2f7d8c11"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &router,
        get("/api/v1/candidates/export/async/not-a-uuid/status"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "UNKNOWN");
}

#[tokio::test]
async fn expired_exports_are_no_longer_downloadable() {
    let (service, _, clock) = seeded_service(2);
    let service = Arc::new(service);
    let router = crate::candidates::candidate_router(Arc::clone(&service));

    let ticket = service
        .submit_export(
            crate::export::ExportFormat::Csv,
            crate::export::ExportScope::All,
            crate::candidates::Locale::Es,
        )
        .unwrap();
    let id = ticket.handle.await.unwrap().unwrap();
    clock.advance(chrono::Duration::seconds(90));

    let response = send(&router, get(&format!("/api/v1/candidates/export/async/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &router,
        get(&format!("/api/v1/candidates/export/async/{id}/status")),
    )
    .await;
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "EXPIRED");
}
