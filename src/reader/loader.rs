//! Incremental loading of API pages while reading.
//!
//! The reader starts with one API page of files. Once the reader's position
//! enters the last 30% of the newest page's index range, the next page is
//! requested; each page number is requested at most once per mount.

use std::collections::{BTreeSet, HashSet};

use crate::library::{sort_by_name, PageFile, PaginationMeta};

/// Fraction of an API page read before the next one is requested, in tenths.
const LOAD_AHEAD_TENTHS: usize = 7;

/// A request for another API page of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    pub volume_id: String,
    pub page: i64,
    pub page_size: i64,
    /// Mount generation the response must match
    pub generation: u64,
}

/// First index of the last 30% of `[start, end)`.
pub fn load_threshold(start: usize, end: usize) -> usize {
    let len = end.saturating_sub(start);
    start + (len * LOAD_AHEAD_TENTHS).div_ceil(10)
}

/// Tracks pagination state and already-requested page numbers.
#[derive(Debug, Clone, Default)]
pub struct PageLoader {
    volume_id: Option<String>,
    pagination: Option<PaginationMeta>,
    requested: BTreeSet<i64>,
}

impl PageLoader {
    pub fn new(volume_id: Option<String>, pagination: Option<PaginationMeta>) -> Self {
        let mut requested = BTreeSet::new();
        if let Some(meta) = &pagination {
            requested.insert(meta.current_page);
        }
        Self {
            volume_id,
            pagination,
            requested,
        }
    }

    pub fn pagination(&self) -> Option<&PaginationMeta> {
        self.pagination.as_ref()
    }

    pub fn was_requested(&self, page: i64) -> bool {
        self.requested.contains(&page)
    }

    /// Next page to request for a reader at `index`, if any. The returned page
    /// is marked as requested.
    pub fn next_fetch(&mut self, index: usize, generation: u64) -> Option<PageFetch> {
        let volume_id = self.volume_id.as_ref()?;
        let meta = self.pagination.as_ref()?;
        if !meta.has_next_page {
            return None;
        }

        let (start, end) = meta.index_range();
        if end <= start || index < load_threshold(start, end) {
            return None;
        }

        let page = meta.current_page.checked_add(1)?;
        if !self.requested.insert(page) {
            return None;
        }

        Some(PageFetch {
            volume_id: volume_id.clone(),
            page,
            page_size: meta.page_size,
            generation,
        })
    }

    /// Record the metadata of a newly received page.
    pub fn advance(&mut self, meta: PaginationMeta) {
        self.requested.insert(meta.current_page);
        self.pagination = Some(meta);
    }

    pub fn reset(&mut self) {
        self.requested.clear();
        if let Some(meta) = &self.pagination {
            self.requested.insert(meta.current_page);
        }
    }
}

/// Merge `incoming` into `files`, skipping ids already present, then re-sort.
///
/// Returns the number of files added.
pub fn merge_pages(files: &mut Vec<PageFile>, incoming: Vec<PageFile>) -> usize {
    let mut known: HashSet<String> = files.iter().map(|f| f.id.clone()).collect();
    let before = files.len();

    for file in incoming {
        if known.insert(file.id.clone()) {
            files.push(file);
        }
    }

    sort_by_name(files, |f| f.name.as_str());
    files.len() - before
}
