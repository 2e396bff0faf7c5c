//! Reset button debounce and long-press detection.
//!
//! The pin is sampled by polling; there is no edge-interrupt assumption,
//! so the press-start time is carried across ticks. A press shorter than
//! the debounce window is treated as electrical noise.

use std::time::{Duration, Instant};

/// Minimum hold time before a press is recognized at all.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Hold time past which a release triggers a factory reset.
pub const LONG_PRESS: Duration = Duration::from_millis(3000);

/// Action derived from a completed button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Short press: open the setup portal if it is not already up.
    TogglePortal,
    /// Long press: clear storage and restart.
    FactoryReset,
}

/// Tracks one button across polling ticks.
#[derive(Debug, Default)]
pub struct ResetButton {
    pressed_since: Option<Instant>,
}

impl ResetButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current pin level. Returns an action on the release edge
    /// of a recognized press.
    pub fn poll(&mut self, pressed: bool, now: Instant) -> Option<ButtonAction> {
        match (pressed, self.pressed_since) {
            (true, None) => {
                self.pressed_since = Some(now);
                None
            }
            (true, Some(_)) => None,
            (false, Some(start)) => {
                self.pressed_since = None;
                let held = now.saturating_duration_since(start);
                if held > LONG_PRESS {
                    Some(ButtonAction::FactoryReset)
                } else if held > DEBOUNCE {
                    Some(ButtonAction::TogglePortal)
                } else {
                    // Bounce
                    None
                }
            }
            (false, None) => None,
        }
    }

    /// How long the button has been held, if it is down.
    pub fn held_for(&self, now: Instant) -> Option<Duration> {
        self.pressed_since
            .map(|start| now.saturating_duration_since(start))
    }
}
