//! The reader state machine.
//!
//! [`ReaderState`] holds everything the reading view needs: the ordered file
//! list, the current index, the image being loaded and its fallback position,
//! prefetch and incremental-loading bookkeeping, fullscreen and controls
//! visibility. Every input is a method; every method returns the
//! [`Effect`]s the UI layer must perform. Nothing here touches the network or
//! the clock.
//!
//! ```text
//!            go_to(i)               image_loaded
//!   Idle ──────────────▶ Loading ──────────────▶ Displayed
//!                          │  ▲
//!            image_failed  │  │ next fallback URL
//!                          ▼  │
//!                        (fallback list exhausted)
//!                          │
//!                          ▼
//!                  FallbackExhausted
//! ```

use std::time::Instant;

use tracing::debug;

use crate::library::{proxy_url, ImageFormat, PageFile, PaginationMeta};

use super::controls::{ControlsVisibility, Fullscreen, FullscreenRequest};
use super::loader::{merge_pages, PageFetch, PageLoader};
use super::prefetch::{PrefetchRequest, PrefetchWindow};

/// Horizontal click position (as a fraction of the image width) below which a
/// click goes to the previous page.
pub const PREVIOUS_ZONE: f64 = 0.4;

/// Image loading phase of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No file at the current index
    Idle,
    /// An image URL is set and its load outcome is pending
    Loading,
    /// The current URL loaded
    Displayed,
    /// Every URL for this page failed; no further attempts
    FallbackExhausted,
}

/// Keys the reader reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(Key::ArrowLeft),
            "ArrowRight" => Some(Key::ArrowRight),
            _ => None,
        }
    }
}

/// Work the UI layer performs on behalf of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Point the page image at this URL
    ShowImage(String),
    /// Remove the page image
    ClearImage,
    /// Start loading an image in the background
    Prefetch(PrefetchRequest),
    /// Request another API page of the volume
    FetchPage(PageFetch),
    RequestFullscreen,
    ExitFullscreen,
    /// Controls became visible; hide them at the given instant unless
    /// something else happens first
    ShowControls { hide_at: Option<Instant> },
    HideControls,
}

/// URLs tried after the primary one fails, in order.
pub fn fallback_urls(file: &PageFile) -> Vec<String> {
    let mut urls = vec![
        proxy_url(&file.id, ImageFormat::View),
        proxy_url(&file.id, ImageFormat::Download),
    ];
    if let Some(link) = file.source_link.as_deref().filter(|l| !l.is_empty()) {
        urls.push(link.to_string());
    }
    urls
}

/// Reader state for one mounted volume.
#[derive(Debug, Clone)]
pub struct ReaderState {
    files: Vec<PageFile>,
    index: usize,
    phase: LoadPhase,
    image_url: Option<String>,
    fallback_attempts: usize,
    prefetch: PrefetchWindow,
    loader: PageLoader,
    fullscreen: Fullscreen,
    controls: ControlsVisibility,
    generation: u64,
    mounted: bool,
}

impl ReaderState {
    /// Create a reader over `files`, the first API page of `volume_id`.
    ///
    /// Call [`ReaderState::mount`] to get the initial effects.
    pub fn new(
        files: Vec<PageFile>,
        volume_id: Option<String>,
        pagination: Option<PaginationMeta>,
        now: Instant,
    ) -> Self {
        Self {
            files,
            index: 0,
            phase: LoadPhase::Idle,
            image_url: None,
            fallback_attempts: 0,
            prefetch: PrefetchWindow::default(),
            loader: PageLoader::new(volume_id, pagination),
            fullscreen: Fullscreen::default(),
            controls: ControlsVisibility::new(now),
            generation: 0,
            mounted: false,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn files(&self) -> &[PageFile] {
        &self.files
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn current_file(&self) -> Option<&PageFile> {
        self.files.get(self.index)
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn fallback_attempts(&self) -> usize {
        self.fallback_attempts
    }

    pub fn pagination(&self) -> Option<&PaginationMeta> {
        self.loader.pagination()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_active()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    pub fn prefetch(&self) -> &PrefetchWindow {
        &self.prefetch
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start a mount: show the first page and plan around it.
    pub fn mount(&mut self, now: Instant) -> Vec<Effect> {
        self.generation += 1;
        self.mounted = true;
        self.loader.reset();
        self.controls.activity(now);

        let mut effects = vec![Effect::ShowControls {
            hide_at: self.controls.hide_at(),
        }];
        effects.extend(self.load_current());
        effects
    }

    /// Tear down the mount. Responses issued before this call are ignored.
    pub fn unmount(&mut self) {
        self.generation += 1;
        self.mounted = false;
        self.prefetch.clear();
        self.controls.cancel();
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Jump to `index`. Out-of-range or unchanged indices do nothing.
    pub fn go_to(&mut self, index: usize) -> Vec<Effect> {
        if !self.mounted || index >= self.files.len() || index == self.index {
            return Vec::new();
        }
        self.index = index;
        self.load_current()
    }

    pub fn next(&mut self) -> Vec<Effect> {
        match self.index.checked_add(1) {
            Some(i) => self.go_to(i),
            None => Vec::new(),
        }
    }

    pub fn previous(&mut self) -> Vec<Effect> {
        match self.index.checked_sub(1) {
            Some(i) => self.go_to(i),
            None => Vec::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::ArrowLeft => self.previous(),
            Key::ArrowRight => self.next(),
        }
    }

    /// Click on the page image at horizontal position `ratio` (0.0 = left edge).
    pub fn click(&mut self, ratio: f64) -> Vec<Effect> {
        if ratio < PREVIOUS_ZONE {
            self.previous()
        } else {
            self.next()
        }
    }

    // -------------------------------------------------------------------------
    // Image outcome
    // -------------------------------------------------------------------------

    /// The image at `url` finished loading.
    pub fn image_loaded(&mut self, url: &str) -> Vec<Effect> {
        if self.phase == LoadPhase::Loading && self.image_url.as_deref() == Some(url) {
            self.phase = LoadPhase::Displayed;
        }
        Vec::new()
    }

    /// The image at `url` failed to load: move to the next fallback URL.
    ///
    /// Events for a URL other than the current one are stale and ignored.
    pub fn image_failed(&mut self, url: &str) -> Vec<Effect> {
        if self.phase != LoadPhase::Loading || self.image_url.as_deref() != Some(url) {
            return Vec::new();
        }
        let Some(file) = self.files.get(self.index) else {
            return Vec::new();
        };

        let fallbacks = fallback_urls(file);
        match fallbacks.into_iter().nth(self.fallback_attempts) {
            Some(next) => {
                self.fallback_attempts += 1;
                debug!(
                    file_id = %file.id,
                    attempt = self.fallback_attempts,
                    "Retrying page image with fallback URL"
                );
                self.image_url = Some(next.clone());
                vec![Effect::ShowImage(next)]
            }
            None => {
                debug!(file_id = %file.id, "All image URLs failed");
                self.phase = LoadPhase::FallbackExhausted;
                self.image_url = None;
                vec![Effect::ClearImage]
            }
        }
    }

    // -------------------------------------------------------------------------
    // Incremental loading
    // -------------------------------------------------------------------------

    /// An API page requested through [`Effect::FetchPage`] arrived.
    ///
    /// Responses from an earlier mount are dropped.
    pub fn pages_loaded(
        &mut self,
        generation: u64,
        files: Vec<PageFile>,
        pagination: PaginationMeta,
    ) -> Vec<Effect> {
        if !self.mounted || generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale page response");
            return Vec::new();
        }

        let current_id = self.current_file().map(|f| f.id.clone());
        let added = merge_pages(&mut self.files, files);
        if let Some(id) = current_id {
            if let Some(i) = self.files.iter().position(|f| f.id == id) {
                self.index = i;
            }
        }
        self.loader.advance(pagination);
        debug!(added, total = self.files.len(), "Merged API page");

        let mut effects: Vec<Effect> = self
            .prefetch
            .plan(&self.files, self.index)
            .into_iter()
            .map(Effect::Prefetch)
            .collect();
        if let Some(fetch) = self.loader.next_fetch(self.index, self.generation) {
            effects.push(Effect::FetchPage(fetch));
        }
        effects
    }

    // -------------------------------------------------------------------------
    // Fullscreen and controls
    // -------------------------------------------------------------------------

    pub fn toggle_fullscreen(&mut self) -> Vec<Effect> {
        match self.fullscreen.toggle() {
            FullscreenRequest::Enter => vec![Effect::RequestFullscreen],
            FullscreenRequest::Exit => vec![Effect::ExitFullscreen],
        }
    }

    /// Any fullscreen change event, vendor-prefixed or not.
    pub fn fullscreen_changed(&mut self, active: bool) {
        self.fullscreen.changed(active);
    }

    /// Pointer, key or touch activity.
    pub fn activity(&mut self, now: Instant) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }
        self.controls.activity(now);
        vec![Effect::ShowControls {
            hide_at: self.controls.hide_at(),
        }]
    }

    pub fn hover_controls(&mut self, hovering: bool, now: Instant) -> Vec<Effect> {
        if !self.mounted {
            return Vec::new();
        }
        self.controls.set_hovering(hovering, now);
        vec![Effect::ShowControls {
            hide_at: self.controls.hide_at(),
        }]
    }

    /// Timer callback.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if self.mounted && self.controls.tick(now) {
            vec![Effect::HideControls]
        } else {
            Vec::new()
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn load_current(&mut self) -> Vec<Effect> {
        self.fallback_attempts = 0;
        self.image_url = None;

        let Some(file) = self.files.get(self.index) else {
            self.phase = LoadPhase::Idle;
            return vec![Effect::ClearImage];
        };

        let url = proxy_url(&file.id, ImageFormat::Default);
        self.image_url = Some(url.clone());
        self.phase = LoadPhase::Loading;

        let mut effects = vec![Effect::ShowImage(url)];
        effects.extend(
            self.prefetch
                .plan(&self.files, self.index)
                .into_iter()
                .map(Effect::Prefetch),
        );
        if let Some(fetch) = self.loader.next_fetch(self.index, self.generation) {
            effects.push(Effect::FetchPage(fetch));
        }
        effects
    }
}
