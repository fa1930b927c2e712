use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::create_router;
use super::routes::MULTIPART_OVERHEAD;
use crate::testutil::{test_state, uploadthing_state};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

struct FilePart<'a> {
    name: &'a str,
    content_type: &'a str,
    data: &'a [u8],
}

fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some(file) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file.name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn catalog_fields<'a>(title: &'a str, roles: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("description", "Operating procedures"),
        ("category", "manual"),
        ("language", "en"),
        ("provider", "internal"),
        ("roles", roles),
    ]
}

async fn upload(app: &Router, title: &str, name: &str, data: &[u8]) -> Value {
    let body = multipart_body(
        &catalog_fields(title, r#"["operator"]"#),
        Some(FilePart {
            name,
            content_type: "application/pdf",
            data,
        }),
    );
    let (status, json) = send_json(app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {json}");
    json["data"].clone()
}

fn fail_message(json: &Value) -> &str {
    assert_eq!(json["status"], "fail");
    json["data"]["message"].as_str().unwrap()
}

// ============================================================================
// Catalog upload
// ============================================================================

#[tokio::test]
async fn test_upload_creates_record_and_blob() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = create_router(state.clone());

    let file = upload(&app, "  Pump Manual  ", "pump.PDF", b"%PDF-1.4 data").await;

    assert_eq!(file["title"], "Pump Manual");
    assert_eq!(file["file_name"], "pump.PDF");
    assert_eq!(file["file_size"], 13);
    assert_eq!(file["mime_type"], "application/pdf");
    assert_eq!(file["file_type"], "document");
    assert_eq!(file["roles"], json!(["operator"]));

    let path = file["file_path"].as_str().unwrap();
    assert!(path.ends_with(".pdf"));
    let on_disk = std::fs::read(dir.path().join("files").join(path)).unwrap();
    assert_eq!(on_disk, b"%PDF-1.4 data");
}

#[tokio::test]
async fn test_upload_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let body = multipart_body(&catalog_fields("t", r#"["a"]"#), None);
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "No file provided");
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = || {
        Some(FilePart {
            name: "a.txt",
            content_type: "text/plain",
            data: b"hello",
        })
    };

    let missing = multipart_body(&[("title", "only a title")], file());
    let (status, json) = send_json(&app, multipart_request("/api/upload", missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "Missing required fields");

    let bad_roles = multipart_body(&catalog_fields("t", "admin,user"), file());
    let (status, json) = send_json(&app, multipart_request("/api/upload", bad_roles)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "Invalid roles format");

    let no_roles = multipart_body(&catalog_fields("t", "[]"), file());
    let (status, json) = send_json(&app, multipart_request("/api/upload", no_roles)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "At least one role must be selected");

    // Nothing was stored for rejected uploads
    let (_, json) = send_json(&app, get("/api/files")).await;
    assert_eq!(json["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_upload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let limit = state.config.max_file_size as usize;
    let app = create_router(state);

    let data = vec![b'x'; limit + 1];
    let body = multipart_body(
        &catalog_fields("big", r#"["a"]"#),
        Some(FilePart {
            name: "big.bin",
            content_type: "application/octet-stream",
            data: &data,
        }),
    );
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(fail_message(&json).starts_with("File too large"));
}

#[tokio::test]
async fn test_upload_beyond_body_limit() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let limit = state.config.max_file_size;
    let app = create_router(state);

    // Larger than the route's body limit, so the stream is cut off mid-file
    let data = vec![b'x'; limit as usize + MULTIPART_OVERHEAD + 10];
    let body = multipart_body(
        &catalog_fields("huge", r#"["a"]"#),
        Some(FilePart {
            name: "huge.bin",
            content_type: "application/octet-stream",
            data: &data,
        }),
    );
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        fail_message(&json),
        format!("File too large. Maximum size is {limit} bytes")
    );
}

#[tokio::test]
async fn test_missing_fields_reported_before_roles_format() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let body = multipart_body(
        &[
            ("description", "d"),
            ("category", "c"),
            ("language", "l"),
            ("provider", "p"),
            ("roles", "not json"),
        ],
        Some(FilePart {
            name: "a.txt",
            content_type: "text/plain",
            data: b"hello",
        }),
    );
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "Missing required fields");
}

// ============================================================================
// Catalog CRUD
// ============================================================================

#[tokio::test]
async fn test_get_download_and_url() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = upload(&app, "Guide", "guide v2.pdf", b"content").await;
    let id = file["id"].as_str().unwrap();

    let (status, json) = send_json(&app, get(&format!("/api/files/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Guide");

    let (status, headers, body) = send(&app, get(&format!("/api/files/{id}/download"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"content");
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CONTENT_LENGTH], "7");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"guide v2.pdf\""
    );

    let (status, json) = send_json(&app, get(&format!("/api/files/{id}/url"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"]["url"],
        format!(
            "http://localhost:3000/api/files/serve/{}",
            file["file_path"].as_str().unwrap()
        )
    );
}

#[tokio::test]
async fn test_get_unknown_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let (status, json) = send_json(&app, get("/api/files/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(fail_message(&json), "File not found");

    let (status, _) = send_json(&app, get("/api/files/nope/download")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_blob() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = upload(&app, "Gone", "gone.pdf", b"bytes").await;
    std::fs::remove_file(
        dir.path()
            .join("files")
            .join(file["file_path"].as_str().unwrap()),
    )
    .unwrap();

    let uri = format!("/api/files/{}/download", file["id"].as_str().unwrap());
    let (status, json) = send_json(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(fail_message(&json), "File content not found");
}

#[tokio::test]
async fn test_update_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = upload(&app, "Draft", "d.pdf", b"x").await;
    let uri = format!("/api/files/{}", file["id"].as_str().unwrap());

    let (status, json) = send_json(
        &app,
        json_request("PUT", &uri, json!({ "title": " Final ", "roles": ["lead", "lead"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Final");
    assert_eq!(json["data"]["roles"], json!(["lead"]));
    assert_eq!(json["data"]["category"], "manual");

    let (status, _) = send_json(&app, json_request("PUT", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send_json(&app, json_request("PUT", &uri, json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "title must not be empty");

    let (status, _) = send_json(
        &app,
        json_request("PUT", "/api/files/missing", json!({ "title": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = upload(&app, "Old", "old.pdf", b"x").await;
    let id = file["id"].as_str().unwrap();
    let blob = dir.path().join("files").join(file["file_path"].as_str().unwrap());
    assert!(blob.exists());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/files/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert!(!blob.exists());

    let (status, _) = send_json(&app, get(&format!("/api/files/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_survives_missing_blob() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    let file = upload(&app, "Orphan", "o.pdf", b"x").await;
    std::fs::remove_file(dir.path().join("files").join(file["file_path"].as_str().unwrap()))
        .unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/files/{}", file["id"].as_str().unwrap()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_search_sort_paginate() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));
    upload(&app, "Beta handbook", "b.pdf", b"bb").await;
    upload(&app, "alpha handbook", "a.pdf", b"a").await;
    upload(&app, "Gamma sheet", "g.pdf", b"ggg").await;

    let (status, json) =
        send_json(&app, get("/api/files?search=HANDBOOK&sort=title&order=asc")).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = json["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["alpha handbook", "Beta handbook"]);
    assert_eq!(json["data"]["pagination"]["total"], 2);

    let (_, json) = send_json(&app, get("/api/files?sort=file_size&limit=1&offset=1")).await;
    assert_eq!(json["data"]["items"][0]["title"], "Beta handbook");
    assert_eq!(json["data"]["pagination"]["limit"], 1);
    assert_eq!(json["data"]["pagination"]["offset"], 1);
    assert_eq!(json["data"]["pagination"]["total"], 3);

    let (status, json) = send_json(&app, get("/api/files?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "limit must be greater than 0");

    let (status, _) = send_json(&app, get("/api/files?sort=colour")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Local uploads and serving
// ============================================================================

#[tokio::test]
async fn test_upload_local_and_serve() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let body = multipart_body(
        &[],
        Some(FilePart {
            name: "photo.PNG",
            content_type: "image/png",
            data: b"\x89PNG",
        }),
    );
    let (status, json) = send_json(&app, multipart_request("/api/upload/local", body)).await;
    assert_eq!(status, StatusCode::OK);

    let key = json["data"]["key"].as_str().unwrap().to_string();
    assert!(key.ends_with(".png"));
    assert_eq!(json["data"]["name"], "photo.PNG");
    assert_eq!(json["data"]["size"], 4);
    assert_eq!(
        json["data"]["url"],
        format!("http://localhost:3000/api/files/serve/{key}")
    );

    let (status, headers, body) = send(&app, get(&format!("/api/files/serve/{key}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"\x89PNG");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=31536000");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("inline; filename=\"{key}\"")
    );
}

#[tokio::test]
async fn test_upload_local_rejects_type() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let body = multipart_body(
        &[],
        Some(FilePart {
            name: "setup.exe",
            content_type: "application/x-msdownload",
            data: b"MZ",
        }),
    );
    let (status, json) = send_json(&app, multipart_request("/api/upload/local", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "File type not allowed");
}

#[tokio::test]
async fn test_serve_rejects_traversal_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let (status, json) = send_json(&app, get("/api/files/serve/..")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(fail_message(&json), "Access denied");

    let (status, _) = send_json(&app, get("/api/files/serve/nothing-here.pdf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serve_uses_recorded_mime() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let body = multipart_body(
        &catalog_fields("Slides", r#"["trainer"]"#),
        Some(FilePart {
            name: "deck",
            content_type: "application/vnd.ms-powerpoint",
            data: b"deck",
        }),
    );
    let (_, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    let path = json["data"]["file_path"].as_str().unwrap();

    let (status, headers, _) = send(&app, get(&format!("/api/files/serve/{path}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/vnd.ms-powerpoint");
}

// ============================================================================
// Managed upload provider
// ============================================================================

#[tokio::test]
async fn test_register_managed_upload() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(uploadthing_state(&dir));

    let payload = json!({
        "title": "Training video",
        "description": "Onboarding",
        "category": "video",
        "language": "fr",
        "provider": "internal",
        "roles": ["new-hire"],
        "file_name": "onboarding.mp4",
        "file_size": 1048576,
        "file_url": "https://utfs.io/f/abc123-onboarding.mp4"
    });

    let (status, json) =
        send_json(&app, json_request("POST", "/api/files/register", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["file_path"], "abc123-onboarding.mp4");
    assert_eq!(json["data"]["mime_type"], "video/mp4");
    assert_eq!(json["data"]["file_type"], "video");

    let id = json["data"]["id"].as_str().unwrap();
    let (_, json) = send_json(&app, get(&format!("/api/files/{id}/url"))).await;
    assert_eq!(json["data"]["url"], "https://utfs.io/f/abc123-onboarding.mp4");

    let (status, _) = send_json(&app, json_request("POST", "/api/files/register", payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_managed_provider_rejects_server_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(uploadthing_state(&dir));

    let file = || {
        Some(FilePart {
            name: "a.pdf",
            content_type: "application/pdf",
            data: b"x",
        })
    };

    let body = multipart_body(&catalog_fields("t", r#"["a"]"#), file());
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fail_message(&json), "UploadThing uploads are performed by the client");

    let body = multipart_body(&[], file());
    let (status, _) = send_json(&app, multipart_request("/api/upload/local", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, get("/api/files/serve/anything.pdf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_requires_managed_provider() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            "/api/files/register",
            json!({
                "title": "t", "description": "d", "category": "c", "language": "l",
                "provider": "p", "roles": ["r"], "file_name": "f.pdf", "file_size": 1,
                "file_key": "k"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Config and health
// ============================================================================

#[tokio::test]
async fn test_storage_config_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(&dir));

    let (status, json) = send_json(&app, get("/api/config/storage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["provider"], "local");
    assert_eq!(json["data"]["is_local"], true);

    let (status, json) = send_json(&app, get("/_internal/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");

    let dir = tempfile::tempdir().unwrap();
    let app = create_router(uploadthing_state(&dir));
    let (_, json) = send_json(&app, get("/api/config/storage")).await;
    assert_eq!(json["data"]["provider"], "uploadthing");
    assert_eq!(json["data"]["is_local"], false);
}
