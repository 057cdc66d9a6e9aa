//! Reading-view state machine.
//!
//! The reader is plain data plus transition functions. UI events (image
//! load/error, navigation, page responses, timers, fullscreen changes) go in;
//! [`Effect`]s come out. The browser script served by the viewer page follows
//! the same rules.

mod controls;
mod loader;
mod prefetch;
mod state;

pub use controls::{ControlsVisibility, Fullscreen, FullscreenRequest, CONTROLS_HIDE_DELAY};
pub use loader::{load_threshold, merge_pages, PageFetch, PageLoader};
pub use prefetch::{PrefetchRequest, PrefetchWindow, PREFETCH_RADIUS};
pub use state::{fallback_urls, Effect, Key, LoadPhase, ReaderState, PREVIOUS_ZONE};
