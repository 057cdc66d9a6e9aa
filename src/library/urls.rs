//! Pure derivations of image URLs from a file id.
//!
//! Nothing here is persisted: every URL is rebuilt from the id on demand.

use serde::Serialize;

/// Path of the image proxy endpoint.
pub const PROXY_PATH: &str = "/api/proxy-image";

/// Which Drive URL the proxy fetches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// Drive API media download (`files/{id}?alt=media`)
    #[default]
    Default,
    /// `uc?export=view`
    View,
    /// `uc?export=download`
    Download,
}

impl ImageFormat {
    /// Parse a `format` query value. Unknown values select [`ImageFormat::Default`].
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("view") => ImageFormat::View,
            Some("download") => ImageFormat::Download,
            _ => ImageFormat::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Default => "default",
            ImageFormat::View => "view",
            ImageFormat::Download => "download",
        }
    }

    /// Upstream URL the proxy fetches for this format.
    pub fn source_url(&self, file_id: &str) -> String {
        let id = urlencoding::encode(file_id);
        match self {
            ImageFormat::Default => {
                format!("https://www.googleapis.com/drive/v3/files/{}?alt=media", id)
            }
            ImageFormat::View => format!("https://drive.google.com/uc?export=view&id={}", id),
            ImageFormat::Download => {
                format!("https://drive.google.com/uc?export=download&id={}", id)
            }
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Same-origin proxy URL for a file in the given format.
pub fn proxy_url(file_id: &str, format: ImageFormat) -> String {
    let id = urlencoding::encode(file_id);
    match format {
        ImageFormat::Default => format!("{}?id={}", PROXY_PATH, id),
        other => format!("{}?id={}&format={}", PROXY_PATH, id, other),
    }
}

/// Display URLs attached to each page in API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayUrls {
    /// Reduced-size rendition served by Google's image CDN
    pub thumbnail_url: String,
    /// Full-size `uc?export=view` link
    pub direct_url: String,
}

impl DisplayUrls {
    pub fn derive(file_id: &str) -> Self {
        let id = urlencoding::encode(file_id);
        Self {
            thumbnail_url: format!("https://lh3.googleusercontent.com/d/{}=w800", id),
            direct_url: format!("https://drive.google.com/uc?export=view&id={}", id),
        }
    }
}
