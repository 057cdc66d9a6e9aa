//! Drive client tests against a local HTTP server.
//!
//! A small axum app stands in for the Drive v3 API so the real
//! `GoogleDriveClient` is exercised over HTTP: continuation tokens, query
//! parameters, status mapping and media pass-through.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use comic_reader::drive::{DriveSource, GoogleDriveClient};
use comic_reader::error::{DriveError, LibraryError};
use comic_reader::library::{LibraryService, PageRequest};

use super::test_utils::{ACCESS_TOKEN, PNG_BYTES};

const VOLUME: &str = "vol-remote";

type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false)
}

fn file(id: &str) -> serde_json::Value {
    json!({ "id": id, "name": format!("{}.jpg", id), "mimeType": "image/jpeg" })
}

/// `files.list`, split over three pages chained by `nextPageToken`.
async fn list_files(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    recorded.lock().await.push(params.clone());

    let body = match params.get("pageToken").map(String::as_str) {
        None => json!({ "files": [file("page10")], "nextPageToken": "t1" }),
        Some("t1") => json!({ "files": [file("page2")], "nextPageToken": "t2" }),
        Some("t2") => json!({ "files": [file("page1"), file("page3")] }),
        Some(_) => return (StatusCode::BAD_REQUEST, "bad token").into_response(),
    };
    Json(body).into_response()
}

async fn get_file(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    if id != VOLUME {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    Json(json!({
        "id": VOLUME,
        "name": "Invincible - 01 - Family Matters",
        "mimeType": "application/vnd.google-apps.folder",
    }))
    .into_response()
}

async fn media(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "png" => ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response(),
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}

/// Start the fake Drive API and return a client pointed at it.
async fn spawn_drive() -> (GoogleDriveClient, Recorded, String) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/files", get(list_files))
        .route("/files/{id}", get(get_file))
        .route("/media/{id}", get(media))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GoogleDriveClient::with_api_base(reqwest::Client::new(), base.clone());
    (client, recorded, base)
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_listing_follows_continuation_tokens() {
    let (client, recorded, _) = spawn_drive().await;

    let files = client.list_files(ACCESS_TOKEN, VOLUME).await.unwrap();
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["page10", "page2", "page1", "page3"]);

    let requests = recorded.lock().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].get("pageToken"), None);
    assert_eq!(requests[1]["pageToken"], "t1");
    assert_eq!(requests[2]["pageToken"], "t2");

    for params in requests.iter() {
        assert_eq!(params["pageSize"], "1000");
        assert_eq!(
            params["fields"],
            "nextPageToken,files(id,name,mimeType,webContentLink)"
        );
        assert!(params["q"].contains(&format!("'{}' in parents", VOLUME)));
        assert!(params["q"].contains("trashed=false"));
    }
}

#[tokio::test]
async fn test_pages_sorted_across_upstream_pages() {
    let (client, _, _) = spawn_drive().await;
    let library = LibraryService::new(Arc::new(client));

    let listing = library
        .pages(Some(ACCESS_TOKEN), VOLUME, PageRequest::default())
        .await
        .unwrap();
    let names: Vec<&str> = listing
        .files
        .iter()
        .map(|entry| entry.file.name.as_str())
        .collect();

    assert_eq!(names, ["page1.jpg", "page2.jpg", "page3.jpg", "page10.jpg"]);
    assert_eq!(listing.pagination.total_files, 4);
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn test_missing_folder_maps_to_not_found() {
    let (client, _, _) = spawn_drive().await;

    let err = client.get_folder(ACCESS_TOKEN, "ghost").await.unwrap_err();
    assert!(matches!(err, DriveError::NotFound(_)));

    let library = LibraryService::new(Arc::new(client));
    let err = library.volume(Some(ACCESS_TOKEN), "ghost").await.unwrap_err();
    assert!(matches!(err, LibraryError::VolumeNotFound(_)));
}

#[tokio::test]
async fn test_rejected_token_maps_to_api_error() {
    let (client, _, _) = spawn_drive().await;

    let err = client.get_folder("expired", VOLUME).await.unwrap_err();
    assert!(matches!(err, DriveError::Api { status: 401, .. }));

    let folder = client.get_folder(ACCESS_TOKEN, VOLUME).await.unwrap();
    assert_eq!(folder.name, "Invincible - 01 - Family Matters");
}

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_media_passes_content_type_through() {
    let (client, _, base) = spawn_drive().await;

    let media = client
        .fetch_media(ACCESS_TOKEN, &format!("{}/media/png", base))
        .await
        .unwrap();
    assert_eq!(media.content_type.as_deref(), Some("image/png"));
    assert_eq!(media.data.as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_forbidden_media_keeps_status() {
    let (client, _, base) = spawn_drive().await;

    let err = client
        .fetch_media(ACCESS_TOKEN, &format!("{}/media/private", base))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Api { status: 403, .. }));
}
