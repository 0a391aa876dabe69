//! Shortcut state machines
//!
//! One [`Shortcut`] exists per user binding and turns the gestures of its
//! descriptor into zero or one output per gesture:
//!
//! ```text
//! Simple ──► Click | LongPress | Press | Release ──► Fired
//! Axis   ──► Drive                              ──► Value(f64)
//! ```
//!
//! Each variant keeps an explicit state struct advanced by a pure
//! `advance` function, so sequences can be replayed in unit tests with
//! synthetic [`Instant`]s.

pub mod click;
pub mod drive;
pub mod edge;
pub mod long_press;

pub use click::{ClickSettings, ClickShortcut, ClickState};
pub use drive::{DriveMode, DriveSettings, DriveShortcut};
pub use edge::{EdgeSettings, EdgeState, PressShortcut, ReleaseShortcut};
pub use long_press::{LongPressSettings, LongPressShortcut, LongPressState};

use crate::gesture::{Gesture, GestureDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    #[error("Invalid shortcut settings: {0}")]
    InvalidSettings(String),

    #[error("{shortcut} shortcut cannot handle {gesture} gesture from {descriptor}")]
    UnsupportedGesture {
        shortcut: ShortcutKind,
        gesture: &'static str,
        descriptor: GestureDescriptor,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutKind {
    Click,
    LongPress,
    Press,
    Release,
    Drive,
}

impl fmt::Display for ShortcutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutKind::Click => write!(f, "Click"),
            ShortcutKind::LongPress => write!(f, "LongPress"),
            ShortcutKind::Press => write!(f, "Press"),
            ShortcutKind::Release => write!(f, "Release"),
            ShortcutKind::Drive => write!(f, "Drive"),
        }
    }
}

/// Flat parameter record of a shortcut, tagged by `kind`.
///
/// ```toml
/// shortcut = { kind = "long_press", minimum_hold_ms = 800 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShortcutSettings {
    Click(ClickSettings),
    LongPress(LongPressSettings),
    Press(EdgeSettings),
    Release(EdgeSettings),
    Drive(DriveSettings),
}

impl ShortcutSettings {
    pub fn kind(&self) -> ShortcutKind {
        match self {
            ShortcutSettings::Click(_) => ShortcutKind::Click,
            ShortcutSettings::LongPress(_) => ShortcutKind::LongPress,
            ShortcutSettings::Press(_) => ShortcutKind::Press,
            ShortcutSettings::Release(_) => ShortcutKind::Release,
            ShortcutSettings::Drive(_) => ShortcutKind::Drive,
        }
    }

    pub fn validate(&self) -> Result<(), ShortcutError> {
        match self {
            ShortcutSettings::Click(s) => s.validate(),
            ShortcutSettings::LongPress(s) => s.validate(),
            _ => Ok(()),
        }
    }

    /// Whether gestures from `descriptor` are meaningful input for this shortcut.
    pub fn accepts(&self, descriptor: &GestureDescriptor) -> bool {
        match self {
            ShortcutSettings::Drive(_) => descriptor.is_axis(),
            _ => descriptor.is_button(),
        }
    }

    pub fn build(&self) -> Result<Shortcut, ShortcutError> {
        self.validate()?;
        Ok(match *self {
            ShortcutSettings::Click(s) => Shortcut::Click(ClickShortcut::new(s)),
            ShortcutSettings::LongPress(s) => Shortcut::LongPress(LongPressShortcut::new(s)),
            ShortcutSettings::Press(s) => Shortcut::Press(PressShortcut::new(s)),
            ShortcutSettings::Release(s) => Shortcut::Release(ReleaseShortcut::new(s)),
            ShortcutSettings::Drive(s) => Shortcut::Drive(DriveShortcut::new(s)),
        })
    }
}

/// What a shortcut produced for one gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortcutOutput {
    /// A button shortcut completed
    Fired,
    /// A drive shortcut forwarded a value
    Value(f64),
}

#[derive(Debug, Clone)]
pub enum Shortcut {
    Click(ClickShortcut),
    LongPress(LongPressShortcut),
    Press(PressShortcut),
    Release(ReleaseShortcut),
    Drive(DriveShortcut),
}

impl Shortcut {
    pub fn kind(&self) -> ShortcutKind {
        match self {
            Shortcut::Click(_) => ShortcutKind::Click,
            Shortcut::LongPress(_) => ShortcutKind::LongPress,
            Shortcut::Press(_) => ShortcutKind::Press,
            Shortcut::Release(_) => ShortcutKind::Release,
            Shortcut::Drive(_) => ShortcutKind::Drive,
        }
    }

    pub fn settings(&self) -> ShortcutSettings {
        match self {
            Shortcut::Click(s) => ShortcutSettings::Click(s.settings),
            Shortcut::LongPress(s) => ShortcutSettings::LongPress(s.settings),
            Shortcut::Press(s) => ShortcutSettings::Press(s.settings),
            Shortcut::Release(s) => ShortcutSettings::Release(s.settings),
            Shortcut::Drive(s) => ShortcutSettings::Drive(s.settings),
        }
    }

    /// Evaluates one gesture already filtered to this shortcut's descriptor.
    pub fn handle(
        &mut self,
        gesture: &Gesture,
        now: Instant,
    ) -> Result<Option<ShortcutOutput>, ShortcutError> {
        let fired = match (self, gesture) {
            (Shortcut::Click(s), Gesture::Simple(g)) => s.handle(g.state, now),
            (Shortcut::LongPress(s), Gesture::Simple(g)) => s.handle(g.state, now),
            (Shortcut::Press(s), Gesture::Simple(g)) => s.handle(g.state),
            (Shortcut::Release(s), Gesture::Simple(g)) => s.handle(g.state),
            (Shortcut::Drive(s), Gesture::Axis(g)) => {
                return Ok(s.handle(g).map(ShortcutOutput::Value));
            }
            (shortcut, gesture) => {
                return Err(ShortcutError::UnsupportedGesture {
                    shortcut: shortcut.kind(),
                    gesture: gesture.kind(),
                    descriptor: gesture.descriptor().clone(),
                });
            }
        };

        Ok(fired.then_some(ShortcutOutput::Fired))
    }

    /// Clears all private state, keeping the settings.
    pub fn reset(&mut self) {
        match self {
            Shortcut::Click(s) => s.reset(),
            Shortcut::LongPress(s) => s.reset(),
            Shortcut::Press(s) => s.reset(),
            Shortcut::Release(s) => s.reset(),
            Shortcut::Drive(_) => {}
        }
    }
}
