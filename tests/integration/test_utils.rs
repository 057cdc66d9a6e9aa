//! Test utilities: an in-memory Drive, a scripted identity provider and
//! helpers for driving the router.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tokio::sync::RwLock;
use tower::ServiceExt;

use comic_reader::auth::{
    AccessPolicy, IdentityProvider, SessionSigner, SessionStore, SignedInUser,
};
use comic_reader::drive::{DriveFile, DriveFolder, DriveMedia, DriveSource, FOLDER_MIME_TYPE};
use comic_reader::error::{AuthError, DriveError};
use comic_reader::library::{ImageFormat, LibraryService};
use comic_reader::proxy::ImageProxy;
use comic_reader::server::{create_router, AppState, RouterConfig};

pub const ALLOWED_EMAIL: &str = "reader@example.com";
pub const ACCESS_TOKEN: &str = "ya29.test-access-token";
pub const SESSION_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub const ROOT_ID: &str = "root-invincible";
pub const VOLUME_ONE: &str = "vol-01";
pub const VOLUME_TWO: &str = "vol-02";

/// Smallest byte strings `image::guess_format` recognizes.
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

// =============================================================================
// Mock Drive
// =============================================================================

#[derive(Clone)]
enum MockMedia {
    Ok {
        data: Bytes,
        content_type: Option<String>,
    },
    Status(u16),
}

/// In-memory Drive keyed by folder id.
///
/// Clones share request counters, so a test can keep a handle after moving
/// the source into the services.
#[derive(Clone, Default)]
pub struct MockDriveSource {
    folders: HashMap<String, DriveFolder>,
    parents: HashMap<String, String>,
    files: HashMap<String, Vec<DriveFile>>,
    media: HashMap<String, MockMedia>,
    list_requests: Arc<RwLock<HashMap<String, usize>>>,
    media_requests: Arc<RwLock<Vec<String>>>,
}

impl MockDriveSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, id: &str, name: &str, parent: Option<&str>) -> Self {
        self.folders.insert(
            id.to_string(),
            DriveFolder {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: FOLDER_MIME_TYPE.to_string(),
            },
        );
        if let Some(parent) = parent {
            self.parents.insert(id.to_string(), parent.to_string());
        }
        self
    }

    /// Add image files named `names` to `folder_id`, with ids `<folder>-<name>`.
    pub fn with_pages(mut self, folder_id: &str, names: &[&str]) -> Self {
        let files = self.files.entry(folder_id.to_string()).or_default();
        for name in names {
            files.push(page_file(&format!("{}-{}", folder_id, name), name));
        }
        self
    }

    pub fn with_files(mut self, folder_id: &str, files: Vec<DriveFile>) -> Self {
        self.files.entry(folder_id.to_string()).or_default().extend(files);
        self
    }

    /// Serve `data` for `file_id` requested in `format`.
    pub fn with_media(
        mut self,
        file_id: &str,
        format: ImageFormat,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Self {
        self.media.insert(
            format.source_url(file_id),
            MockMedia::Ok {
                data: Bytes::copy_from_slice(data),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    /// Answer media requests for `file_id` in `format` with an HTTP error.
    pub fn with_media_status(mut self, file_id: &str, format: ImageFormat, status: u16) -> Self {
        self.media
            .insert(format.source_url(file_id), MockMedia::Status(status));
        self
    }

    pub async fn list_request_count(&self, folder_id: &str) -> usize {
        self.list_requests
            .read()
            .await
            .get(folder_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn media_request_count(&self) -> usize {
        self.media_requests.read().await.len()
    }

    fn check_token(token: &str) -> Result<(), DriveError> {
        if token == ACCESS_TOKEN {
            Ok(())
        } else {
            Err(DriveError::Api {
                status: 401,
                message: "Invalid Credentials".to_string(),
            })
        }
    }
}

#[async_trait]
impl DriveSource for MockDriveSource {
    async fn get_folder(&self, token: &str, folder_id: &str) -> Result<DriveFolder, DriveError> {
        Self::check_token(token)?;
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| DriveError::NotFound(folder_id.to_string()))
    }

    async fn find_folder(
        &self,
        token: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<DriveFolder>, DriveError> {
        Self::check_token(token)?;
        let mut matches: Vec<&DriveFolder> = self
            .folders
            .values()
            .filter(|f| f.name == name)
            .filter(|f| match parent_id {
                Some(parent) => self.parents.get(&f.id).map(String::as_str) == Some(parent),
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|f| (*f).clone()))
    }

    async fn list_folders(
        &self,
        token: &str,
        parent_id: &str,
    ) -> Result<Vec<DriveFolder>, DriveError> {
        Self::check_token(token)?;
        Ok(self
            .folders
            .values()
            .filter(|f| self.parents.get(&f.id).map(String::as_str) == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn list_files(&self, token: &str, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        Self::check_token(token)?;
        *self
            .list_requests
            .write()
            .await
            .entry(folder_id.to_string())
            .or_insert(0) += 1;
        Ok(self.files.get(folder_id).cloned().unwrap_or_default())
    }

    async fn fetch_media(&self, token: &str, url: &str) -> Result<DriveMedia, DriveError> {
        Self::check_token(token)?;
        self.media_requests.write().await.push(url.to_string());
        match self.media.get(url) {
            Some(MockMedia::Ok { data, content_type }) => Ok(DriveMedia {
                data: data.clone(),
                content_type: content_type.clone(),
            }),
            Some(MockMedia::Status(status)) => Err(DriveError::Api {
                status: *status,
                message: format!("upstream answered {}", status),
            }),
            None => Err(DriveError::NotFound(url.to_string())),
        }
    }
}

pub fn page_file(id: &str, name: &str) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: "image/jpeg".to_string(),
        web_content_link: Some(format!(
            "https://drive.google.com/uc?id={}&export=download",
            id
        )),
    }
}

/// A root folder with two volumes; volume one holds pages in shuffled order.
pub fn sample_drive() -> MockDriveSource {
    MockDriveSource::new()
        .with_folder(ROOT_ID, "INVINCIBLE", None)
        .with_folder(VOLUME_TWO, "Invincible - 02 - Eight is Enough", Some(ROOT_ID))
        .with_folder(VOLUME_ONE, "Invincible - 01 - Family Matters", Some(ROOT_ID))
        .with_pages(
            VOLUME_ONE,
            &["page10.jpg", "page2.jpg", "page1.jpg", "page3.jpg"],
        )
}

/// `count` pages named `page1.jpg` .. `page<count>.jpg`, in reverse order.
pub fn numbered_pages(folder_id: &str, count: usize) -> Vec<DriveFile> {
    (1..=count)
        .rev()
        .map(|n| page_file(&format!("{}-{}", folder_id, n), &format!("page{}.jpg", n)))
        .collect()
}

// =============================================================================
// Mock Identity Provider
// =============================================================================

/// Codes accepted by [`MockIdentityProvider`]: `code-<email>`.
pub struct MockIdentityProvider;

pub const FAILING_CODE: &str = "broken-code";

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!(
            "https://accounts.example.com/o/oauth2/auth?state={}",
            state
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<SignedInUser, AuthError> {
        if code == FAILING_CODE {
            return Err(AuthError::TokenExchange("invalid_grant".to_string()));
        }
        let email = code
            .strip_prefix("code-")
            .ok_or_else(|| AuthError::TokenExchange(format!("unknown code {}", code)))?;
        Ok(SignedInUser {
            email: email.to_string(),
            name: Some("Test Reader".to_string()),
            access_token: ACCESS_TOKEN.to_string(),
            expires_in: 3600,
        })
    }
}

// =============================================================================
// App
// =============================================================================

pub fn test_state(drive: MockDriveSource) -> AppState<MockDriveSource> {
    let drive = Arc::new(drive);
    AppState::new(
        LibraryService::new(Arc::clone(&drive)),
        ImageProxy::new(drive),
        SessionStore::new(SessionSigner::new(SESSION_SECRET)),
        Arc::new(MockIdentityProvider),
        AccessPolicy::new(ALLOWED_EMAIL),
    )
}

pub fn test_router(state: AppState<MockDriveSource>) -> Router {
    create_router(state, RouterConfig::new().with_tracing(false))
}

/// Create a session for the allowed user; returns a `Cookie` header value.
pub async fn signed_in_cookie(state: &AppState<MockDriveSource>) -> String {
    let (_, value) = state
        .sessions
        .create(SignedInUser {
            email: ALLOWED_EMAIL.to_string(),
            name: Some("Test Reader".to_string()),
            access_token: ACCESS_TOKEN.to_string(),
            expires_in: 3600,
        })
        .await;
    format!("comic_session={}", value)
}

pub async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    send(router, "GET", uri, cookie).await
}

pub async fn send(router: &Router, method: &str, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
