//! Library service: volume discovery and paginated page listings.
//!
//! ```text
//!   pages(token, volume, request)
//!        │
//!        ▼
//!   ┌──────────────┐  miss   ┌─────────────┐
//!   │ ListingCache │ ──────▶ │ DriveSource │  list_files (all upstream pages)
//!   └──────────────┘         └─────────────┘
//!        │ sorted listing           │
//!        ▼                          ▼
//!   paginate + DisplayUrls    compare_names sort, store
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::drive::DriveSource;
use crate::error::{DriveError, LibraryError};

use super::model::{PageEntry, PageFile, Volume};
use super::pagination::{paginate, PageRequest, PaginationMeta};
use super::sort::sort_by_name;

/// Default name of the Drive folder holding every volume.
pub const DEFAULT_ROOT_FOLDER: &str = "INVINCIBLE";

/// How long a folder listing is reused before Drive is asked again.
pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(5 * 60);

/// Number of folder listings kept.
pub const DEFAULT_LISTING_CAPACITY: usize = 64;

// =============================================================================
// Responses
// =============================================================================

/// The root folder and its volumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeList {
    pub root_folder: Volume,
    pub volumes: Vec<Volume>,
}

/// One window of a volume's pages.
#[derive(Debug, Clone, Serialize)]
pub struct PageListing {
    pub files: Vec<PageEntry>,
    pub pagination: PaginationMeta,
}

/// Result of a revalidation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revalidation {
    pub revalidated: bool,
    pub path: String,
    /// Epoch milliseconds at which the invalidation happened
    pub now: u64,
}

// =============================================================================
// Listing cache
// =============================================================================

struct CachedListing {
    files: Arc<Vec<PageFile>>,
    stored_at: Instant,
}

/// Sorted folder listings keyed by folder id, bounded by count and age.
struct ListingCache {
    entries: Mutex<LruCache<String, CachedListing>>,
    ttl: Duration,
}

impl ListingCache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity).unwrap_or(std::num::NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    async fn get(&self, folder_id: &str) -> Option<Arc<Vec<PageFile>>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(folder_id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&entry.files));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(folder_id);
        }
        None
    }

    async fn put(&self, folder_id: &str, files: Arc<Vec<PageFile>>) {
        let mut entries = self.entries.lock().await;
        entries.put(
            folder_id.to_string(),
            CachedListing {
                files,
                stored_at: Instant::now(),
            },
        );
    }

    async fn remove(&self, folder_id: &str) -> bool {
        self.entries.lock().await.pop(folder_id).is_some()
    }

    async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        count
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// The folder id a revalidation path refers to, if it names one.
///
/// Accepts `/comics/{id}` and `/api/comics/{id}` with any suffix.
pub fn folder_from_path(path: &str) -> Option<&str> {
    let path = path.trim_start_matches('/');
    let rest = path
        .strip_prefix("api/comics/")
        .or_else(|| path.strip_prefix("comics/"))?;
    let id = rest.split(['/', '?', '#']).next()?;
    (!id.is_empty()).then_some(id)
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn require_token(token: Option<&str>) -> Result<&str, LibraryError> {
    match token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(LibraryError::NotAuthenticated),
    }
}

// =============================================================================
// Library Service
// =============================================================================

/// Volume and page access on top of a [`DriveSource`].
///
/// Every operation takes the caller's bearer token; `None` yields
/// [`LibraryError::NotAuthenticated`] before Drive is contacted.
pub struct LibraryService<D: DriveSource> {
    drive: Arc<D>,
    root_folder: String,
    listings: ListingCache,
}

impl<D: DriveSource> LibraryService<D> {
    /// Create a service with the default root folder and listing cache.
    pub fn new(drive: Arc<D>) -> Self {
        Self::with_root_folder(drive, DEFAULT_ROOT_FOLDER)
    }

    pub fn with_root_folder(drive: Arc<D>, root_folder: impl Into<String>) -> Self {
        Self::with_listing_cache(
            drive,
            root_folder,
            DEFAULT_LISTING_CAPACITY,
            DEFAULT_LISTING_TTL,
        )
    }

    /// Create a service with explicit listing-cache bounds.
    pub fn with_listing_cache(
        drive: Arc<D>,
        root_folder: impl Into<String>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            drive,
            root_folder: root_folder.into(),
            listings: ListingCache::new(capacity, ttl),
        }
    }

    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    /// Metadata of one volume folder.
    pub async fn volume(&self, token: Option<&str>, volume_id: &str) -> Result<Volume, LibraryError> {
        let token = require_token(token)?;
        match self.drive.get_folder(token, volume_id).await {
            Ok(folder) => Ok(folder.into()),
            Err(DriveError::NotFound(_)) => Err(LibraryError::VolumeNotFound(volume_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// The root folder and its child volumes in reading order.
    pub async fn volumes(&self, token: Option<&str>) -> Result<VolumeList, LibraryError> {
        let token = require_token(token)?;
        let root = self
            .drive
            .find_folder(token, &self.root_folder, None)
            .await?
            .ok_or_else(|| LibraryError::RootFolderNotFound(self.root_folder.clone()))?;

        let mut volumes: Vec<Volume> = self
            .drive
            .list_folders(token, &root.id)
            .await?
            .into_iter()
            .map(Volume::from)
            .collect();
        sort_by_name(&mut volumes, |v| v.name.as_str());

        debug!(root = %root.id, count = volumes.len(), "Listed volumes");
        Ok(VolumeList {
            root_folder: root.into(),
            volumes,
        })
    }

    /// One window of a volume's pages, sorted by name, with display URLs.
    pub async fn pages(
        &self,
        token: Option<&str>,
        volume_id: &str,
        request: PageRequest,
    ) -> Result<PageListing, LibraryError> {
        let token = require_token(token)?;
        let files = self.listing(token, volume_id).await?;
        let (window, pagination) = paginate(&files, request);

        Ok(PageListing {
            files: window.into_iter().map(PageEntry::from).collect(),
            pagination,
        })
    }

    /// Number of files in a volume.
    pub async fn page_count(&self, token: Option<&str>, volume_id: &str) -> Result<usize, LibraryError> {
        let token = require_token(token)?;
        Ok(self.listing(token, volume_id).await?.len())
    }

    /// Drop cached listings for `path`.
    ///
    /// A volume path evicts that volume's listing; any other path clears
    /// every listing.
    pub async fn revalidate(&self, path: &str) -> Revalidation {
        match folder_from_path(path) {
            Some(folder_id) => {
                let evicted = self.listings.remove(folder_id).await;
                info!(path, folder_id, evicted, "Revalidated volume listing");
            }
            None => {
                let evicted = self.listings.clear().await;
                info!(path, evicted, "Revalidated all listings");
            }
        }

        Revalidation {
            revalidated: true,
            path: path.to_string(),
            now: epoch_millis(),
        }
    }

    /// Number of folder listings currently cached.
    pub async fn cached_listings(&self) -> usize {
        self.listings.len().await
    }

    async fn listing(&self, token: &str, folder_id: &str) -> Result<Arc<Vec<PageFile>>, LibraryError> {
        if let Some(files) = self.listings.get(folder_id).await {
            debug!(folder_id, "Listing cache hit");
            return Ok(files);
        }

        let mut files: Vec<PageFile> = self
            .drive
            .list_files(token, folder_id)
            .await?
            .into_iter()
            .map(PageFile::from)
            .collect();
        sort_by_name(&mut files, |f| f.name.as_str());

        debug!(folder_id, count = files.len(), "Fetched folder listing");
        let files = Arc::new(files);
        self.listings.put(folder_id, Arc::clone(&files)).await;
        Ok(files)
    }
}
