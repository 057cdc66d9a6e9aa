//! Floating controls visibility and fullscreen state.

use std::time::{Duration, Instant};

/// Inactivity before the floating controls hide.
pub const CONTROLS_HIDE_DELAY: Duration = Duration::from_secs(3);

/// Auto-hiding controls driven by user activity.
///
/// Time is supplied by the caller; the UI calls [`ControlsVisibility::tick`]
/// at or after [`ControlsVisibility::hide_at`].
#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    visible: bool,
    hovering: bool,
    hide_at: Option<Instant>,
    delay: Duration,
}

impl ControlsVisibility {
    pub fn new(now: Instant) -> Self {
        Self::with_delay(now, CONTROLS_HIDE_DELAY)
    }

    pub fn with_delay(now: Instant, delay: Duration) -> Self {
        Self {
            visible: true,
            hovering: false,
            hide_at: Some(now + delay),
            delay,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// When the controls will hide if nothing else happens.
    pub fn hide_at(&self) -> Option<Instant> {
        self.hide_at
    }

    /// Pointer, key or touch activity: show and restart the timer.
    pub fn activity(&mut self, now: Instant) {
        self.visible = true;
        self.hide_at = if self.hovering {
            None
        } else {
            Some(now + self.delay)
        };
    }

    /// Pointer entered or left the controls area.
    pub fn set_hovering(&mut self, hovering: bool, now: Instant) {
        self.hovering = hovering;
        self.activity(now);
    }

    /// Hide the controls if their deadline has passed. Returns whether they
    /// were hidden by this call.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(at) if now >= at && !self.hovering => {
                self.visible = false;
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending timer.
    pub fn cancel(&mut self) {
        self.hide_at = None;
    }
}

/// Mirror of the browser's fullscreen state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fullscreen {
    active: bool,
}

/// What the UI must ask the browser to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenRequest {
    Enter,
    Exit,
}

impl Fullscreen {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The request that toggles the current state. State only changes once
    /// the browser reports it through [`Fullscreen::changed`].
    pub fn toggle(&self) -> FullscreenRequest {
        if self.active {
            FullscreenRequest::Exit
        } else {
            FullscreenRequest::Enter
        }
    }

    /// A (possibly vendor-prefixed) fullscreen change event fired.
    pub fn changed(&mut self, active: bool) {
        self.active = active;
    }
}
