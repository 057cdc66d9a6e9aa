//! Image cache for proxied Drive media.
//!
//! An LRU cache of fetched image bytes, bounded by entry count and by age.
//!
//! # Cache Key
//!
//! Images are cached per file id and per source format, rendered as
//! `image-{file_id}-{format}`: the same file fetched through `view` and
//! `download` occupies two entries.
//!
//! # Expiry
//!
//! Each entry carries a deadline of `ttl` after its last access. Reading an
//! entry pushes its deadline forward; an expired entry is dropped on the read
//! that finds it.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::library::ImageFormat;

/// Default maximum number of cached images
pub const DEFAULT_IMAGE_CACHE_ENTRIES: usize = 200;

/// Default time-to-live: 7 days
pub const DEFAULT_IMAGE_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for proxied images.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageCacheKey {
    /// Drive file id
    pub file_id: Arc<str>,

    /// Source URL variant the bytes came from
    pub format: ImageFormat,
}

impl ImageCacheKey {
    pub fn new(file_id: impl Into<Arc<str>>, format: ImageFormat) -> Self {
        Self {
            file_id: file_id.into(),
            format,
        }
    }
}

impl fmt::Display for ImageCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image-{}-{}", self.file_id, self.format)
    }
}

/// Image bytes plus the content type they are served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub data: Bytes,
    pub content_type: String,
}

struct Entry {
    image: CachedImage,
    expires_at: Instant,
}

// =============================================================================
// Image Cache
// =============================================================================

/// LRU + TTL cache for proxied images.
///
/// Thread-safe; share it across handlers through `Arc`.
///
/// # Example
///
/// ```
/// use comic_reader::library::ImageFormat;
/// use comic_reader::proxy::{CachedImage, ImageCache, ImageCacheKey};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = ImageCache::new();
///
///     let key = ImageCacheKey::new("1AbC", ImageFormat::Default);
///     let image = CachedImage {
///         data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]),
///         content_type: "image/jpeg".to_string(),
///     };
///
///     cache.put(key.clone(), image.clone()).await;
///     assert_eq!(cache.get(&key).await, Some(image));
/// }
/// ```
pub struct ImageCache {
    cache: Mutex<LruCache<ImageCacheKey, Entry>>,
    max_entries: usize,
    ttl: Duration,
}

impl ImageCache {
    /// Create a cache with the default bounds (200 entries, 7 days).
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_IMAGE_CACHE_ENTRIES, DEFAULT_IMAGE_CACHE_TTL)
    }

    /// Create a cache holding at most `max_entries` images for `ttl` each.
    ///
    /// A zero `max_entries` is raised to one.
    pub fn with_limits(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            max_entries: capacity.get(),
            ttl,
        }
    }

    /// Get an image, refreshing its recency and its deadline.
    ///
    /// Expired entries are removed and reported as missing.
    pub async fn get(&self, key: &ImageCacheKey) -> Option<CachedImage> {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        let expired = match cache.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                return Some(entry.image.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            cache.pop(key);
        }
        None
    }

    /// Check for a live entry without touching recency or deadline.
    pub async fn contains(&self, key: &ImageCacheKey) -> bool {
        let cache = self.cache.lock().await;
        cache
            .peek(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Store an image. When full, the least-recently-used entry is evicted.
    pub async fn put(&self, key: ImageCacheKey, image: CachedImage) {
        let mut cache = self.cache.lock().await;
        let entry = Entry {
            image,
            expires_at: Instant::now() + self.ttl,
        };
        cache.put(key, entry);
    }

    pub async fn remove(&self, key: &ImageCacheKey) -> Option<CachedImage> {
        let mut cache = self.cache.lock().await;
        cache.pop(key).map(|entry| entry.image)
    }

    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    /// Number of stored entries (expired ones included until next read).
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    /// Total bytes held.
    pub async fn size(&self) -> usize {
        let cache = self.cache.lock().await;
        cache.iter().map(|(_, entry)| entry.image.data.len()).sum()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
