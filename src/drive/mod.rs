//! Google Drive adapter.
//!
//! The [`DriveSource`] trait is the seam between the library/proxy services and
//! Drive itself. [`GoogleDriveClient`] talks to the real Drive API v3; tests
//! plug in an in-memory source.
//!
//! Every call takes the caller's OAuth bearer token: the adapter holds no
//! credentials of its own.

mod client;
mod types;

use async_trait::async_trait;

use crate::error::DriveError;

pub use client::{escape_query_value, GoogleDriveClient, DRIVE_API_BASE};
pub use types::{DriveFile, DriveFolder, DriveMedia, FileList, FOLDER_MIME_TYPE};

/// Read-only access to a Drive account.
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// Fetch folder metadata by id.
    async fn get_folder(&self, token: &str, folder_id: &str) -> Result<DriveFolder, DriveError>;

    /// Find the first folder named `name`, optionally restricted to a parent.
    async fn find_folder(
        &self,
        token: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<DriveFolder>, DriveError>;

    /// List the child folders of `parent_id`.
    async fn list_folders(
        &self,
        token: &str,
        parent_id: &str,
    ) -> Result<Vec<DriveFolder>, DriveError>;

    /// List every non-trashed file in `folder_id`, following continuation
    /// tokens until the listing is complete.
    async fn list_files(&self, token: &str, folder_id: &str) -> Result<Vec<DriveFile>, DriveError>;

    /// Fetch media bytes from an arbitrary Drive URL with the bearer token.
    async fn fetch_media(&self, token: &str, url: &str) -> Result<DriveMedia, DriveError>;
}
