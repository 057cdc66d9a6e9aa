//! HTTP request handlers for the comic API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/comics` - Root folder and volumes
//! - `GET /api/comics/{id}` - Volume metadata
//! - `GET /api/comics/{id}/pages` - Sorted, paginated pages
//! - `GET /api/comics/{id}/pages/count` - Page count
//! - `GET /api/proxy-image` - Image bytes through the cache
//! - `GET|POST /api/revalidate` - Drop cached listings

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRef, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::{AccessPolicy, IdentityProvider, SessionStore};
use crate::drive::DriveSource;
use crate::error::{AuthError, LibraryError, ProxyError};
use crate::library::{
    ImageFormat, LibraryService, PageListing, PageRequest, Revalidation, Volume, VolumeList,
};
use crate::proxy::{ImageProxy, IMAGE_CACHE_CONTROL};

use super::auth::{MaybeSession, RequireSession};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Services are built once at startup and shared through `Arc`.
pub struct AppState<D: DriveSource> {
    pub library: Arc<LibraryService<D>>,
    pub proxy: Arc<ImageProxy<D>>,
    pub sessions: Arc<SessionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub policy: AccessPolicy,

    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl<D: DriveSource> AppState<D> {
    pub fn new(
        library: LibraryService<D>,
        proxy: ImageProxy<D>,
        sessions: SessionStore,
        identity: Arc<dyn IdentityProvider>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            library: Arc::new(library),
            proxy: Arc::new(proxy),
            sessions: Arc::new(sessions),
            identity,
            policy,
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}

impl<D: DriveSource> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            library: Arc::clone(&self.library),
            proxy: Arc::clone(&self.proxy),
            sessions: Arc::clone(&self.sessions),
            identity: Arc::clone(&self.identity),
            policy: self.policy.clone(),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<D: DriveSource> FromRef<AppState<D>> for Arc<SessionStore> {
    fn from_ref(state: &AppState<D>) -> Self {
        Arc::clone(&state.sessions)
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for the pages endpoint.
///
/// Kept as strings so that unparsable values select the full listing instead
/// of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PagesQueryParams {
    pub page: Option<String>,

    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQueryParams {
    pub id: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevalidateQueryParams {
    pub path: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// HTTP status code
    pub status: u16,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// An error ready to be rendered as a JSON response.
///
/// `detail` is logged but never sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    /// A server error with a generic message; `detail` goes to the log only.
    pub fn internal(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let detail = self.detail.as_deref().unwrap_or(&self.message);

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", detail);
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED {
            debug!(status = status.as_u16(), "Client error: {}", detail);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", detail);
        }

        let body = ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        match &err {
            LibraryError::NotAuthenticated => ApiError::unauthorized(),
            LibraryError::VolumeNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "Comic not found")
            }
            LibraryError::RootFolderNotFound(name) => ApiError::new(
                StatusCode::NOT_FOUND,
                format!("Could not find the \"{}\" folder", name),
            ),
            LibraryError::Upstream(_) => {
                ApiError::internal("Failed to fetch data from Google Drive", err.to_string())
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match &err {
            ProxyError::MissingFileId => ApiError::bad_request(err.to_string()),
            ProxyError::NotAuthenticated => ApiError::unauthorized(),
            ProxyError::UpstreamFetch { status, message } => {
                let status = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                ApiError {
                    status,
                    message: format!("Failed to fetch image: {}", message),
                    detail: None,
                }
            }
            ProxyError::Upstream(_) => ApiError::internal("Failed to proxy image", err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::AccessDenied { .. } => ApiError::new(StatusCode::FORBIDDEN, "Access denied"),
            AuthError::InvalidState | AuthError::MissingCode | AuthError::Provider(_) => {
                ApiError::bad_request(err.to_string())
            }
            AuthError::SessionRequired => ApiError::unauthorized(),
            AuthError::TokenExchange(_) => ApiError::internal("Sign-in failed", err.to_string()),
        }
    }
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/comics`
pub async fn volumes_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    RequireSession(session): RequireSession,
) -> Result<Json<VolumeList>, ApiError> {
    let volumes = state.library.volumes(Some(&session.access_token)).await?;
    Ok(Json(volumes))
}

/// `GET /api/comics/{id}`
///
/// `404` when the folder does not exist or is not visible to the user.
pub async fn volume_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    RequireSession(session): RequireSession,
    Path(volume_id): Path<String>,
) -> Result<Json<Volume>, ApiError> {
    let volume = state
        .library
        .volume(Some(&session.access_token), &volume_id)
        .await?;
    Ok(Json(volume))
}

/// `GET /api/comics/{id}/pages?page=&pageSize=`
///
/// Files are sorted by name with numbers compared by value. `page` defaults
/// to 1 and `pageSize` to 350; a non-positive or unparsable value returns
/// every file.
pub async fn pages_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    RequireSession(session): RequireSession,
    Path(volume_id): Path<String>,
    Query(query): Query<PagesQueryParams>,
) -> Result<Json<PageListing>, ApiError> {
    let request = PageRequest::from_query(query.page.as_deref(), query.page_size.as_deref());
    debug!(volume_id = %volume_id, page = request.page, page_size = request.page_size, "Listing pages");

    let listing = state
        .library
        .pages(Some(&session.access_token), &volume_id, request)
        .await?;
    Ok(Json(listing))
}

/// `GET /api/comics/{id}/pages/count`
pub async fn page_count_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    RequireSession(session): RequireSession,
    Path(volume_id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .library
        .page_count(Some(&session.access_token), &volume_id)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// `GET /api/proxy-image?id=&format=`
///
/// # Headers
///
/// - `Content-Type`: upstream type, or sniffed from the bytes
/// - `Cache-Control`: one day fresh, seven days stale-while-revalidate
/// - `ETag`: the quoted file id
/// - `X-Cache: HIT|MISS`
pub async fn proxy_image_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<ProxyQueryParams>,
) -> Result<Response, ApiError> {
    let file_id = query.id.unwrap_or_default();
    let format = ImageFormat::parse(query.format.as_deref());
    let token = session.as_ref().map(|s| s.access_token.as_str());

    // The id must fit in a header before anything is fetched or cached
    let etag = HeaderValue::from_str(&format!("\"{}\"", file_id.trim()))
        .map_err(|e| ApiError::bad_request(format!("Invalid file id: {}", e)))?;

    let image = state.proxy.get_image(token, &file_id, format).await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("image/jpeg"));
    let cache_status = if image.cache_hit { "HIT" } else { "MISS" };

    let mut response = Response::new(Body::from(image.data));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMAGE_CACHE_CONTROL),
    );
    headers.insert(header::ETAG, etag);
    headers.insert("x-cache", HeaderValue::from_static(cache_status));

    Ok(response)
}

/// `GET|POST /api/revalidate?path=`
pub async fn revalidate_handler<D: DriveSource>(
    State(state): State<AppState<D>>,
    Query(query): Query<RevalidateQueryParams>,
) -> Result<Json<Revalidation>, ApiError> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Path parameter is required"))?;

    Ok(Json(state.library.revalidate(&path).await))
}

// =============================================================================
// Tests
// =============================================================================
