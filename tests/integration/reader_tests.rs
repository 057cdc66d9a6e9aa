//! Reader state machine driven by real library responses.
//!
//! Tests verify:
//! - Incremental API-page loading end to end
//! - Stale responses after unmount are dropped
//! - Fallback URLs built from listed pages

use std::sync::Arc;
use std::time::Instant;

use comic_reader::library::{LibraryService, PageFile, PageListing, PageRequest};
use comic_reader::reader::{Effect, LoadPhase, PageFetch, ReaderState};

use super::test_utils::{numbered_pages, sample_drive, MockDriveSource, ACCESS_TOKEN};

const VOLUME: &str = "big";

fn library(drive: MockDriveSource) -> LibraryService<MockDriveSource> {
    LibraryService::new(Arc::new(drive))
}

async fn fetch(library: &LibraryService<MockDriveSource>, page: i64) -> PageListing {
    library
        .pages(Some(ACCESS_TOKEN), VOLUME, PageRequest::new(page, 350))
        .await
        .unwrap()
}

fn files(listing: &PageListing) -> Vec<PageFile> {
    listing.files.iter().map(|entry| entry.file.clone()).collect()
}

fn fetch_effect(effects: &[Effect]) -> Option<&PageFetch> {
    effects.iter().find_map(|effect| match effect {
        Effect::FetchPage(fetch) => Some(fetch),
        _ => None,
    })
}

#[tokio::test]
async fn test_reads_through_two_api_pages() {
    let library = library(sample_drive().with_files(VOLUME, numbered_pages(VOLUME, 700)));
    let first = fetch(&library, 1).await;
    assert!(first.pagination.has_next_page);

    let mut reader = ReaderState::new(
        files(&first),
        Some(VOLUME.to_string()),
        Some(first.pagination.clone()),
        Instant::now(),
    );
    reader.mount(Instant::now());
    assert_eq!(reader.total(), 350);

    // Reading below the 70% mark requests nothing
    assert!(fetch_effect(&reader.go_to(244)).is_none());

    let effects = reader.go_to(245);
    let request = fetch_effect(&effects).cloned().unwrap();
    assert_eq!(request.volume_id, VOLUME);
    assert_eq!(request.page, 2);
    assert_eq!(request.page_size, 350);

    // Same page is never requested twice
    assert!(fetch_effect(&reader.go_to(300)).is_none());

    let second = fetch(&library, request.page).await;
    let effects = reader.pages_loaded(request.generation, files(&second), second.pagination);
    assert!(fetch_effect(&effects).is_none());

    assert_eq!(reader.total(), 700);
    assert_eq!(reader.index(), 300);
    assert_eq!(reader.current_file().unwrap().name, "page301.jpg");
    assert_eq!(reader.files()[699].name, "page700.jpg");
    assert!(!reader.pagination().unwrap().has_next_page);
}

#[tokio::test]
async fn test_duplicate_page_response_is_merged_once() {
    let library = library(sample_drive().with_files(VOLUME, numbered_pages(VOLUME, 700)));
    let first = fetch(&library, 1).await;

    let mut reader = ReaderState::new(
        files(&first),
        Some(VOLUME.to_string()),
        Some(first.pagination.clone()),
        Instant::now(),
    );
    reader.mount(Instant::now());
    let request = fetch_effect(&reader.go_to(349)).cloned().unwrap();

    // A response that overlaps what is already loaded
    let mut overlapping = files(&first);
    overlapping.extend(files(&fetch(&library, 2).await));
    reader.pages_loaded(request.generation, overlapping, fetch(&library, 2).await.pagination);

    assert_eq!(reader.total(), 700);
}

#[tokio::test]
async fn test_response_after_unmount_is_ignored() {
    let library = library(sample_drive().with_files(VOLUME, numbered_pages(VOLUME, 700)));
    let first = fetch(&library, 1).await;

    let mut reader = ReaderState::new(
        files(&first),
        Some(VOLUME.to_string()),
        Some(first.pagination.clone()),
        Instant::now(),
    );
    reader.mount(Instant::now());
    let request = fetch_effect(&reader.go_to(340)).cloned().unwrap();

    reader.unmount();
    let second = fetch(&library, 2).await;
    let effects = reader.pages_loaded(request.generation, files(&second), second.pagination);

    assert!(effects.is_empty());
    assert_eq!(reader.total(), 350);
    assert!(reader.prefetch().is_empty());
}

#[tokio::test]
async fn test_fallback_chain_for_listed_page() {
    let library = library(sample_drive());
    let listing = library
        .pages(Some(ACCESS_TOKEN), "vol-01", PageRequest::default())
        .await
        .unwrap();

    let mut reader = ReaderState::new(
        files(&listing),
        Some("vol-01".to_string()),
        Some(listing.pagination.clone()),
        Instant::now(),
    );
    reader.mount(Instant::now());
    assert_eq!(
        reader.image_url(),
        Some("/api/proxy-image?id=vol-01-page1.jpg")
    );

    let mut attempted = Vec::new();
    while let Some(url) = reader.image_url().map(str::to_string) {
        let effects = reader.image_failed(&url);
        attempted.push(url);
        if effects.contains(&Effect::ClearImage) {
            break;
        }
    }

    assert_eq!(
        attempted,
        [
            "/api/proxy-image?id=vol-01-page1.jpg",
            "/api/proxy-image?id=vol-01-page1.jpg&format=view",
            "/api/proxy-image?id=vol-01-page1.jpg&format=download",
            "https://drive.google.com/uc?id=vol-01-page1.jpg&export=download",
        ]
    );
    assert_eq!(reader.phase(), LoadPhase::FallbackExhausted);
    assert!(reader.image_failed("anything").is_empty());
}
