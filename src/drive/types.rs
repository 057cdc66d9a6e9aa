//! Google Drive API v3 response types.
//!
//! Only the fields this application requests are modelled.
//! See <https://developers.google.com/drive/api/reference/rest/v3/files#File>.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

fn folder_mime_type() -> String {
    FOLDER_MIME_TYPE.to_string()
}

/// A Drive folder (a volume, or the root folder holding them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "folder_mime_type")]
    pub mime_type: String,
}

/// A file inside a volume folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: String,

    /// Direct download link, absent for some file kinds
    #[serde(default)]
    pub web_content_link: Option<String>,
}

/// One page of a `files.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList<T> {
    #[serde(default = "Vec::new")]
    pub files: Vec<T>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Raw media bytes fetched from Drive.
#[derive(Debug, Clone)]
pub struct DriveMedia {
    pub data: Bytes,

    /// `Content-Type` reported upstream, if any
    pub content_type: Option<String>,
}
