//! Page-window slicing over a sorted file list.

use serde::{Deserialize, Serialize};

/// Default page number (1-based).
pub const DEFAULT_PAGE: i64 = 1;

/// Default number of files per API page (a volume rarely exceeds this).
pub const DEFAULT_PAGE_SIZE: i64 = 350;

/// Requested window. Non-positive values select the full listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Build a request from raw query values.
    ///
    /// Missing values take the defaults; values that do not parse as integers
    /// become `0`, which selects the full listing.
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: parse_param(page, DEFAULT_PAGE),
            page_size: parse_param(page_size, DEFAULT_PAGE_SIZE),
        }
    }

    /// Whether this request slices the listing.
    pub fn is_windowed(&self) -> bool {
        self.page > 0 && self.page_size > 0
    }

    /// The `[start, end)` index range of this window clamped to `total`.
    pub fn range(&self, total: usize) -> (usize, usize) {
        if !self.is_windowed() {
            return (0, total);
        }
        let size = self.page_size as u64;
        let start = (self.page as u64 - 1).saturating_mul(size);
        let end = (self.page as u64).saturating_mul(size);
        let clamp = |v: u64| usize::try_from(v).unwrap_or(usize::MAX).min(total);
        (clamp(start), clamp(end))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

fn parse_param(value: Option<&str>, default: i64) -> i64 {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or(0),
    }
}

/// Pagination metadata returned alongside a window of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total_files: usize,
    pub total_pages: usize,
    pub current_page: i64,
    pub page_size: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    /// Compute metadata for `request` over `total_files` items.
    pub fn compute(total_files: usize, request: PageRequest) -> Self {
        let total_pages = if request.page_size > 0 {
            total_files.div_ceil(request.page_size as usize)
        } else if total_files == 0 {
            0
        } else {
            1
        };

        let has_next_page = request.is_windowed()
            && (request.page as u64).saturating_mul(request.page_size as u64)
                < total_files as u64;

        Self {
            total_files,
            total_pages,
            current_page: request.page,
            page_size: request.page_size,
            has_next_page,
            has_prev_page: request.page > 1,
        }
    }

    /// Index range `[start, end)` this metadata's page covers in the full list.
    pub fn index_range(&self) -> (usize, usize) {
        PageRequest::new(self.current_page, self.page_size).range(self.total_files)
    }
}

/// Copy the requested window out of `items` and compute its metadata.
pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> (Vec<T>, PaginationMeta) {
    let meta = PaginationMeta::compute(items.len(), request);
    let (start, end) = request.range(items.len());
    (items[start..end].to_vec(), meta)
}
