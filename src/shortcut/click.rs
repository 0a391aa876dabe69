//! Multi-click detection
//!
//! Counts press/release edges: odd counter values mean "button down within a
//! sequence", even values "button up". `2 * click_count` edges complete the
//! sequence.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::ShortcutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickSettings {
    pub click_count: u32,
    pub maximum_click_interval_ms: u64,
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self {
            click_count: 2,
            maximum_click_interval_ms: 200,
        }
    }
}

impl ClickSettings {
    pub fn validate(&self) -> Result<(), ShortcutError> {
        if self.click_count == 0 {
            return Err(ShortcutError::InvalidSettings(
                "click_count must be at least 1".to_string(),
            ));
        }
        if self.maximum_click_interval_ms == 0 {
            return Err(ShortcutError::InvalidSettings(
                "maximum_click_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.maximum_click_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickState {
    pub counter: u32,
    pub last_click: Option<Instant>,
}

impl ClickState {
    /// Advances the state by one edge. Returns the next state and whether the
    /// sequence completed.
    pub fn advance(self, pressed: bool, now: Instant, settings: &ClickSettings) -> (Self, bool) {
        let mut next = self;

        if pressed {
            if next.counter == 0 {
                next.counter = 1;
            } else if next.counter % 2 == 1 {
                return (self, false);
            } else {
                next.counter += 1;
                let elapsed = next
                    .last_click
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                if elapsed > settings.interval() {
                    debug!("Click sequence timed out after {}ms", elapsed.as_millis());
                    next.counter = 0;
                    return (next, false);
                }
            }
        } else {
            if next.counter == 0 || next.counter % 2 == 0 {
                return (self, false);
            }
            next.counter += 1;
            next.last_click = Some(now);
        }

        if next.counter >= settings.click_count.saturating_mul(2) {
            next.counter = 0;
            return (next, true);
        }

        (next, false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClickShortcut {
    pub settings: ClickSettings,
    state: ClickState,
}

impl ClickShortcut {
    pub fn new(settings: ClickSettings) -> Self {
        Self {
            settings,
            state: ClickState::default(),
        }
    }

    pub fn handle(&mut self, pressed: bool, now: Instant) -> bool {
        let (state, fired) = self.state.advance(pressed, now, &self.settings);
        self.state = state;
        fired
    }

    pub fn state(&self) -> &ClickState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = ClickState::default();
    }
}
