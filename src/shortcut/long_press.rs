use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::ShortcutError;

/// Hold window for a long press. A `maximum_hold_ms` not greater than the
/// minimum means "no upper bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPressSettings {
    pub minimum_hold_ms: u64,
    pub maximum_hold_ms: u64,
}

impl Default for LongPressSettings {
    fn default() -> Self {
        Self {
            minimum_hold_ms: 500,
            maximum_hold_ms: 0,
        }
    }
}

impl LongPressSettings {
    pub fn validate(&self) -> Result<(), ShortcutError> {
        Ok(())
    }

    pub fn accepts(&self, held: Duration) -> bool {
        let held_ms = held.as_millis();
        let minimum = self.minimum_hold_ms as u128;
        let maximum = self.maximum_hold_ms as u128;
        held_ms >= minimum && (maximum <= minimum || held_ms <= maximum)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LongPressState {
    pub press_time: Option<Instant>,
}

impl LongPressState {
    pub fn advance(
        self,
        pressed: bool,
        now: Instant,
        settings: &LongPressSettings,
    ) -> (Self, bool) {
        match (pressed, self.press_time) {
            (true, None) => (
                Self {
                    press_time: Some(now),
                },
                false,
            ),
            (false, Some(start)) => {
                let held = now.saturating_duration_since(start);
                let fired = settings.accepts(held);
                debug!("Long press held for {}ms (fired: {})", held.as_millis(), fired);
                (Self::default(), fired)
            }
            _ => (self, false),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LongPressShortcut {
    pub settings: LongPressSettings,
    state: LongPressState,
}

impl LongPressShortcut {
    pub fn new(settings: LongPressSettings) -> Self {
        Self {
            settings,
            state: LongPressState::default(),
        }
    }

    pub fn handle(&mut self, pressed: bool, now: Instant) -> bool {
        let (state, fired) = self.state.advance(pressed, now, &self.settings);
        self.state = state;
        fired
    }

    pub fn state(&self) -> &LongPressState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = LongPressState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(settings: LongPressSettings, held_ms: u64) -> bool {
        let mut shortcut = LongPressShortcut::new(settings);
        let t0 = Instant::now();
        assert!(!shortcut.handle(true, t0));
        let fired = shortcut.handle(false, t0 + Duration::from_millis(held_ms));
        assert_eq!(shortcut.state().press_time, None);
        fired
    }

    #[test]
    fn fires_only_inside_hold_window() {
        let bounded = LongPressSettings {
            minimum_hold_ms: 500,
            maximum_hold_ms: 1000,
        };
        assert!(!hold(bounded, 499));
        assert!(hold(bounded, 500));
        assert!(hold(bounded, 1000));
        assert!(!hold(bounded, 1001));
    }

    #[test]
    fn maximum_at_or_below_minimum_is_unbounded() {
        for maximum_hold_ms in [0, 200, 500] {
            let settings = LongPressSettings {
                minimum_hold_ms: 500,
                maximum_hold_ms,
            };
            assert!(hold(settings, 10_000));
            assert!(!hold(settings, 100));
        }
    }

    #[test]
    fn repeated_press_keeps_first_start() {
        let mut shortcut = LongPressShortcut::new(LongPressSettings::default());
        let t0 = Instant::now();
        shortcut.handle(true, t0);
        shortcut.handle(true, t0 + Duration::from_millis(400));
        assert_eq!(shortcut.state().press_time, Some(t0));
        assert!(shortcut.handle(false, t0 + Duration::from_millis(600)));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut shortcut = LongPressShortcut::new(LongPressSettings::default());
        assert!(!shortcut.handle(false, Instant::now()));
    }
}
