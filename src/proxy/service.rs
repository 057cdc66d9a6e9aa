//! Image proxy service.
//!
//! The proxy lets the browser load private Drive images from the app's own
//! origin. Each request runs:
//!
//! 1. Validate the file id
//! 2. Check the image cache (a hit needs no token)
//! 3. Resolve the caller's bearer token
//! 4. Fetch from the Drive URL for the requested format
//! 5. Settle the content type, cache and return

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::drive::DriveSource;
use crate::error::ProxyError;
use crate::library::ImageFormat;

use super::cache::{CachedImage, ImageCache, ImageCacheKey};

/// Content type used when neither upstream nor the bytes say otherwise.
pub const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// `Cache-Control` sent with every proxied image: one day fresh, a week stale.
pub const IMAGE_CACHE_CONTROL: &str =
    "public, max-age=86400, s-maxage=86400, stale-while-revalidate=604800";

/// A proxied image ready to send.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub data: Bytes,
    pub content_type: String,
    /// Whether the bytes came from the cache
    pub cache_hit: bool,
}

/// Pick the content type for fetched bytes.
///
/// An upstream `image/*` type wins. Otherwise the magic bytes decide, and
/// [`FALLBACK_CONTENT_TYPE`] covers anything unrecognised.
pub fn resolve_content_type(upstream: Option<&str>, data: &[u8]) -> String {
    if let Some(content_type) = upstream {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence.starts_with("image/") {
            return content_type.trim().to_string();
        }
    }

    image::guess_format(data)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// Cache-fronted image fetcher over a [`DriveSource`].
pub struct ImageProxy<D: DriveSource> {
    drive: Arc<D>,
    cache: ImageCache,
}

impl<D: DriveSource> ImageProxy<D> {
    /// Create a proxy with the default cache (200 images, 7 days).
    pub fn new(drive: Arc<D>) -> Self {
        Self::with_cache(drive, ImageCache::new())
    }

    pub fn with_cache_limits(drive: Arc<D>, max_entries: usize, ttl: Duration) -> Self {
        Self::with_cache(drive, ImageCache::with_limits(max_entries, ttl))
    }

    pub fn with_cache(drive: Arc<D>, cache: ImageCache) -> Self {
        Self { drive, cache }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Serve `file_id` in `format`, from cache when possible.
    #[instrument(skip(self, token))]
    pub async fn get_image(
        &self,
        token: Option<&str>,
        file_id: &str,
        format: ImageFormat,
    ) -> Result<ImageResponse, ProxyError> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(ProxyError::MissingFileId);
        }

        let key = ImageCacheKey::new(file_id, format);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(key = %key, "Image cache hit");
            return Ok(ImageResponse {
                data: cached.data,
                content_type: cached.content_type,
                cache_hit: true,
            });
        }

        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ProxyError::NotAuthenticated),
        };

        let url = format.source_url(file_id);
        let media = self.drive.fetch_media(token, &url).await?;
        let content_type = resolve_content_type(media.content_type.as_deref(), &media.data);

        debug!(key = %key, bytes = media.data.len(), content_type = %content_type, "Fetched image");
        self.cache
            .put(
                key,
                CachedImage {
                    data: media.data.clone(),
                    content_type: content_type.clone(),
                },
            )
            .await;

        Ok(ImageResponse {
            data: media.data,
            content_type,
            cache_hit: false,
        })
    }
}
