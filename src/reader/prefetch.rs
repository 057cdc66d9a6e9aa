//! Neighbour prefetching.

use std::collections::HashSet;

use crate::library::{proxy_url, ImageFormat, PageFile};

/// Pages fetched on each side of the current one.
pub const PREFETCH_RADIUS: usize = 2;

/// One image the UI should start loading in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub file_id: String,
    pub url: String,
}

/// Tracks which files were already prefetched during this mount.
#[derive(Debug, Clone)]
pub struct PrefetchWindow {
    radius: usize,
    seen: HashSet<String>,
}

impl PrefetchWindow {
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            seen: HashSet::new(),
        }
    }

    /// Files around `index` not prefetched yet, nearest first, ahead before
    /// behind. The file at `index` and every returned file are recorded as
    /// prefetched.
    pub fn plan(&mut self, files: &[PageFile], index: usize) -> Vec<PrefetchRequest> {
        if let Some(current) = files.get(index) {
            self.seen.insert(current.id.clone());
        }

        let ahead = (1..=self.radius).filter_map(|d| index.checked_add(d));
        let behind = (1..=self.radius).filter_map(|d| index.checked_sub(d));

        let mut requests = Vec::new();
        for i in ahead.chain(behind) {
            let Some(file) = files.get(i) else {
                continue;
            };
            if self.seen.insert(file.id.clone()) {
                requests.push(PrefetchRequest {
                    file_id: file.id.clone(),
                    url: proxy_url(&file.id, ImageFormat::Default),
                });
            }
        }
        requests
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.seen.contains(file_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

impl Default for PrefetchWindow {
    fn default() -> Self {
        Self::new(PREFETCH_RADIUS)
    }
}
