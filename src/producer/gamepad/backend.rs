use crate::gesture::{GamepadAxis, GamepadButton};

/// Raw controller packet of one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadState {
    /// Changes whenever the hardware reports new input
    pub packet_number: u32,
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl GamepadState {
    /// Raw reading of an analog control, widened to `i32`.
    pub fn axis(&self, axis: GamepadAxis) -> i32 {
        match axis {
            GamepadAxis::LeftThumbX => self.thumb_lx as i32,
            GamepadAxis::LeftThumbY => self.thumb_ly as i32,
            GamepadAxis::RightThumbX => self.thumb_rx as i32,
            GamepadAxis::RightThumbY => self.thumb_ry as i32,
            GamepadAxis::LeftTrigger => self.left_trigger as i32,
            GamepadAxis::RightTrigger => self.right_trigger as i32,
        }
    }

    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buttons & button.mask() != 0
    }
}

/// One queued digital transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    pub button: GamepadButton,
    pub key_up: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Slot {0} is out of range")]
    SlotOutOfRange(u8),

    #[error("Failed to read slot {slot}: {reason}")]
    ReadFailed { slot: u8, reason: String },
}

/// Hardware capability the gamepad producer polls.
///
/// Implementations live on the polling thread and need not be `Send`.
pub trait GamepadBackend {
    /// Called once at the start of every tick, before any slot is read.
    fn begin_tick(&mut self) {}

    /// Current packet of `slot`, or `None` when nothing is connected there.
    fn state(&mut self, slot: u8) -> Result<Option<GamepadState>, BackendError>;

    /// Next queued keystroke of `slot`, if any.
    fn next_keystroke(&mut self, slot: u8) -> Result<Option<Keystroke>, BackendError>;

    /// Human readable name of the backend, for logs.
    fn name(&self) -> &str;
}
