use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::gesture::{Gesture, GestureDescriptor};
use crate::shortcut::{Shortcut, ShortcutError, ShortcutOutput, ShortcutSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn default_enabled() -> bool {
    true
}

/// Persistable description of one binding.
///
/// ```toml
/// [[bindings]]
/// action = "seek"
/// descriptor = { kind = "gamepad_axis", user_index = 0, axis = "left_thumb_x" }
/// shortcut = { kind = "drive", mode = "relative_joystick", invert = false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Name handed to the action executor; never interpreted here
    pub action: String,
    pub descriptor: GestureDescriptor,
    pub shortcut: ShortcutSettings,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BindingConfig {
    pub fn new(
        action: impl Into<String>,
        descriptor: GestureDescriptor,
        shortcut: ShortcutSettings,
    ) -> Self {
        Self {
            action: action.into(),
            descriptor,
            shortcut,
            enabled: true,
        }
    }
}

/// Output of a binding whose shortcut completed.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAction {
    pub binding: BindingId,
    pub action: String,
    pub descriptor: GestureDescriptor,
    /// Snapshot of the gesture that completed the shortcut
    pub gesture: Gesture,
    pub output: ShortcutOutput,
    pub triggered_at: Instant,
    /// Wall-clock time for display; timing decisions use `triggered_at`
    pub timestamp: DateTime<Local>,
}

/// A live binding: configuration plus its own shortcut state.
#[derive(Debug, Clone)]
pub struct ShortcutBinding {
    id: BindingId,
    action: String,
    descriptor: GestureDescriptor,
    shortcut: Shortcut,
    enabled: bool,
    #[cfg(test)]
    panic_next: bool,
}

impl ShortcutBinding {
    pub fn new(id: BindingId, config: &BindingConfig) -> Result<Self, ShortcutError> {
        Ok(Self {
            id,
            action: config.action.clone(),
            descriptor: config.descriptor.clone(),
            shortcut: config.shortcut.build()?,
            enabled: config.enabled,
            #[cfg(test)]
            panic_next: false,
        })
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn descriptor(&self) -> &GestureDescriptor {
        &self.descriptor
    }

    pub fn shortcut(&self) -> &Shortcut {
        &self.shortcut
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.shortcut.reset();
        }
        self.enabled = enabled;
    }

    /// Swaps the shortcut parameters. State starts over.
    pub fn update(&mut self, settings: ShortcutSettings) -> Result<(), ShortcutError> {
        self.shortcut = settings.build()?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.shortcut.reset();
    }

    /// Makes the next `evaluate` call panic.
    #[cfg(test)]
    pub(crate) fn panic_on_next_gesture(&mut self) {
        self.panic_next = true;
    }

    pub fn config(&self) -> BindingConfig {
        BindingConfig {
            action: self.action.clone(),
            descriptor: self.descriptor.clone(),
            shortcut: self.shortcut.settings(),
            enabled: self.enabled,
        }
    }

    pub fn evaluate(
        &mut self,
        gesture: &Gesture,
        now: Instant,
    ) -> Result<Option<TriggeredAction>, ShortcutError> {
        #[cfg(test)]
        if std::mem::take(&mut self.panic_next) {
            panic!("binding {} panicked on request", self.id);
        }

        let Some(output) = self.shortcut.handle(gesture, now)? else {
            return Ok(None);
        };

        Ok(Some(TriggeredAction {
            binding: self.id,
            action: self.action.clone(),
            descriptor: self.descriptor.clone(),
            gesture: gesture.clone(),
            output,
            triggered_at: now,
            timestamp: Local::now(),
        }))
    }
}
