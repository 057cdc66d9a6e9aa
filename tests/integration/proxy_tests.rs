//! Image proxy integration tests.
//!
//! Tests verify:
//! - Cache HIT/MISS behaviour and response headers
//! - Content-type resolution
//! - Format selection and upstream error mirroring
//! - Authentication only on cache misses

use axum::http::{header, StatusCode};

use comic_reader::library::ImageFormat;
use comic_reader::proxy::IMAGE_CACHE_CONTROL;

use super::test_utils::{
    body_bytes, body_json, get, sample_drive, signed_in_cookie, test_router, test_state,
    JPEG_BYTES, PNG_BYTES,
};

const PAGE_ID: &str = "vol-01-page1.jpg";

#[tokio::test]
async fn test_miss_then_hit_returns_same_bytes() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, Some("image/jpeg"));
    let state = test_state(drive.clone());
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);
    let uri = format!("/api/proxy-image?id={}", PAGE_ID);

    let first = get(&router, &uri, Some(&cookie)).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache"], "MISS");
    let first_body = body_bytes(first).await;

    let second = get(&router, &uri, Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(body_bytes(second).await, first_body);

    assert_eq!(first_body.as_ref(), JPEG_BYTES);
    assert_eq!(drive.media_request_count().await, 1);
}

#[tokio::test]
async fn test_response_headers() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, Some("image/jpeg"));
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);
    let uri = format!("/api/proxy-image?id={}", PAGE_ID);

    for expected in ["MISS", "HIT"] {
        let response = get(&router, &uri, Some(&cookie)).await;
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(headers[header::CACHE_CONTROL], IMAGE_CACHE_CONTROL);
        assert_eq!(headers[header::ETAG], format!("\"{}\"", PAGE_ID).as_str());
        assert_eq!(headers["x-cache"], expected);
    }
}

#[tokio::test]
async fn test_content_type_sniffed_when_upstream_is_generic() {
    let drive = sample_drive().with_media(
        PAGE_ID,
        ImageFormat::Default,
        PNG_BYTES,
        Some("application/octet-stream"),
    );
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    let response = get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), Some(&cookie)).await;
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_unknown_bytes_fall_back_to_jpeg() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, b"not an image", None);
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    let response = get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
}

#[tokio::test]
async fn test_formats_are_cached_separately() {
    let drive = sample_drive()
        .with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, Some("image/jpeg"))
        .with_media(PAGE_ID, ImageFormat::View, PNG_BYTES, Some("image/png"));
    let state = test_state(drive.clone());
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    let default = get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), Some(&cookie)).await;
    assert_eq!(default.headers()["x-cache"], "MISS");

    let view = get(
        &router,
        &format!("/api/proxy-image?id={}&format=view", PAGE_ID),
        Some(&cookie),
    )
    .await;
    assert_eq!(view.headers()["x-cache"], "MISS");
    assert_eq!(body_bytes(view).await.as_ref(), PNG_BYTES);

    assert_eq!(drive.media_request_count().await, 2);
}

#[tokio::test]
async fn test_unknown_format_treated_as_default() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, Some("image/jpeg"));
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), Some(&cookie)).await;
    let response = get(
        &router,
        &format!("/api/proxy-image?id={}&format=thumbnail", PAGE_ID),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "HIT");
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_id_is_400() {
    let state = test_state(sample_drive());
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    for uri in ["/api/proxy-image", "/api/proxy-image?id="] {
        let response = get(&router, uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "File ID is required");
    }
}

#[tokio::test]
async fn test_id_unusable_as_header_is_rejected_before_fetch() {
    let drive = sample_drive().with_media("bad\u{1}id", ImageFormat::Default, JPEG_BYTES, None);
    let state = test_state(drive.clone());
    let cookie = signed_in_cookie(&state).await;
    let proxy = state.proxy.clone();
    let router = test_router(state);

    let response = get(&router, "/api/proxy-image?id=bad%01id", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(drive.media_request_count().await, 0);
    assert!(proxy.cache().is_empty().await);
}

#[tokio::test]
async fn test_cache_miss_without_session_is_401() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, None);
    let router = test_router(test_state(drive.clone()));

    let response = get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(drive.media_request_count().await, 0);
}

#[tokio::test]
async fn test_cache_hit_served_without_session() {
    let drive = sample_drive().with_media(PAGE_ID, ImageFormat::Default, JPEG_BYTES, None);
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);
    let uri = format!("/api/proxy-image?id={}", PAGE_ID);

    get(&router, &uri, Some(&cookie)).await;

    let response = get(&router, &uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "HIT");
}

#[tokio::test]
async fn test_upstream_status_is_mirrored() {
    let drive = sample_drive()
        .with_media_status(PAGE_ID, ImageFormat::Default, 403)
        .with_media_status(PAGE_ID, ImageFormat::Download, 503);
    let state = test_state(drive);
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    let response = get(&router, &format!("/api/proxy-image?id={}", PAGE_ID), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to fetch image"));

    let response = get(
        &router,
        &format!("/api/proxy-image?id={}&format=download", PAGE_ID),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_missing_upstream_file_is_404() {
    let state = test_state(sample_drive());
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);

    let response = get(&router, "/api/proxy-image?id=ghost", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let drive = sample_drive().with_media_status(PAGE_ID, ImageFormat::Default, 500);
    let state = test_state(drive.clone());
    let cookie = signed_in_cookie(&state).await;
    let router = test_router(state);
    let uri = format!("/api/proxy-image?id={}", PAGE_ID);

    get(&router, &uri, Some(&cookie)).await;
    get(&router, &uri, Some(&cookie)).await;
    assert_eq!(drive.media_request_count().await, 2);
}
