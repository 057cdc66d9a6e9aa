//! reqwest-backed Drive API v3 client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::{DriveFile, DriveFolder, DriveMedia, FileList, FOLDER_MIME_TYPE};
use super::DriveSource;
use crate::error::DriveError;

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum page size accepted by `files.list`.
const MAX_PAGE_SIZE: u32 = 1000;

const FOLDER_FIELDS: &str = "id,name,mimeType";
const FILE_FIELDS: &str = "id,name,mimeType,webContentLink";

/// Image types we accept from the media endpoints.
const IMAGE_ACCEPT: &str = "image/jpeg, image/png, image/webp, image/*";

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive API v3 client.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct GoogleDriveClient {
    http: Client,
    api_base: String,
}

impl GoogleDriveClient {
    /// Create a client against the public Drive endpoint.
    pub fn new(http: Client) -> Self {
        Self::with_api_base(http, DRIVE_API_BASE)
    }

    /// Create a client against a custom API base (e.g. a local emulator).
    pub fn with_api_base(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// The API base this client talks to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Url::parse(&format!("{}{}", self.api_base, path))
            .map_err(|e| DriveError::InvalidResponse(format!("invalid Drive URL: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: Url) -> Result<T, DriveError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DriveError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Drive API request failed");
            return Err(DriveError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))
    }

    /// Run a `files.list` query, accumulating every page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        token: &str,
        query: &str,
        fields: &str,
        order_by: Option<&str>,
    ) -> Result<Vec<T>, DriveError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut url = self.endpoint("/files")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("q", query)
                    .append_pair("fields", &format!("nextPageToken,files({})", fields))
                    .append_pair("pageSize", &MAX_PAGE_SIZE.to_string());
                if let Some(order) = order_by {
                    pairs.append_pair("orderBy", order);
                }
                if let Some(ref cursor) = page_token {
                    pairs.append_pair("pageToken", cursor);
                }
            }

            let page: FileList<T> = self.get_json(token, url).await?;
            pages += 1;
            items.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!(pages, items = items.len(), "Drive listing complete");
        Ok(items)
    }
}

#[async_trait]
impl DriveSource for GoogleDriveClient {
    #[instrument(skip(self, token))]
    async fn get_folder(&self, token: &str, folder_id: &str) -> Result<DriveFolder, DriveError> {
        let mut url = self.endpoint(&format!("/files/{}", urlencoding::encode(folder_id)))?;
        url.query_pairs_mut().append_pair("fields", FOLDER_FIELDS);
        self.get_json(token, url).await
    }

    #[instrument(skip(self, token))]
    async fn find_folder(
        &self,
        token: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<DriveFolder>, DriveError> {
        let mut query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME_TYPE,
            escape_query_value(name)
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
        }

        let folders: Vec<DriveFolder> = self.list_all(token, &query, FOLDER_FIELDS, None).await?;
        Ok(folders.into_iter().next())
    }

    #[instrument(skip(self, token))]
    async fn list_folders(
        &self,
        token: &str,
        parent_id: &str,
    ) -> Result<Vec<DriveFolder>, DriveError> {
        let query = format!(
            "'{}' in parents and mimeType='{}' and trashed=false",
            escape_query_value(parent_id),
            FOLDER_MIME_TYPE
        );
        self.list_all(token, &query, FOLDER_FIELDS, Some("name"))
            .await
    }

    #[instrument(skip(self, token))]
    async fn list_files(&self, token: &str, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!(
            "'{}' in parents and trashed=false",
            escape_query_value(folder_id)
        );
        self.list_all(token, &query, FILE_FIELDS, Some("name")).await
    }

    #[instrument(skip(self, token))]
    async fn fetch_media(&self, token: &str, url: &str) -> Result<DriveMedia, DriveError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(header::ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .map_err(|e| DriveError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Upstream error");
            warn!(status = status.as_u16(), "Media fetch failed: {}", reason);
            return Err(DriveError::Api {
                status: status.as_u16(),
                message: reason.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .await
            .map_err(|e| DriveError::Connection(e.to_string()))?;

        Ok(DriveMedia { data, content_type })
    }
}
