//! Press and release edge shortcuts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSettings {
    /// Fire on every matching gesture instead of only on the transition
    pub handle_repeating: bool,
}

/// Last observed button state of one binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeState {
    pub pressed: bool,
}

impl EdgeState {
    /// Fires on `target` gestures: only on the transition into `target`
    /// unless repeating is enabled.
    pub fn advance(self, pressed: bool, target: bool, settings: &EdgeSettings) -> (Self, bool) {
        let fired = pressed == target && (settings.handle_repeating || self.pressed != target);
        (Self { pressed }, fired)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PressShortcut {
    pub settings: EdgeSettings,
    state: EdgeState,
}

impl PressShortcut {
    pub fn new(settings: EdgeSettings) -> Self {
        Self {
            settings,
            state: EdgeState::default(),
        }
    }

    pub fn handle(&mut self, pressed: bool) -> bool {
        let (state, fired) = self.state.advance(pressed, true, &self.settings);
        self.state = state;
        fired
    }

    pub fn reset(&mut self) {
        self.state = EdgeState::default();
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseShortcut {
    pub settings: EdgeSettings,
    state: EdgeState,
}

impl ReleaseShortcut {
    pub fn new(settings: EdgeSettings) -> Self {
        Self {
            settings,
            state: EdgeState::default(),
        }
    }

    pub fn handle(&mut self, pressed: bool) -> bool {
        let (state, fired) = self.state.advance(pressed, false, &self.settings);
        self.state = state;
        fired
    }

    pub fn reset(&mut self) {
        self.state = EdgeState::default();
    }
}
