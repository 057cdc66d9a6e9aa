//! Same-origin image proxy with an LRU + TTL byte cache.

mod cache;
mod service;

pub use cache::{
    CachedImage, ImageCache, ImageCacheKey, DEFAULT_IMAGE_CACHE_ENTRIES, DEFAULT_IMAGE_CACHE_TTL,
};
pub use service::{
    resolve_content_type, ImageProxy, ImageResponse, FALLBACK_CONTENT_TYPE, IMAGE_CACHE_CONTROL,
};
