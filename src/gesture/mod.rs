//! Gesture model shared by producers, shortcuts and the dispatcher
//!
//! A [`GestureDescriptor`] names a physical input source and is the key users
//! attach bindings to. A [`Gesture`] is one observation of such a source:
//!
//! ```text
//! Simple ── descriptor + pressed/released
//! Axis   ── descriptor + value [0,1] + signed delta + elapsed time
//! ```
//!
//! These types carry no behavior beyond identity and formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Digital gamepad buttons, with the bit each one occupies in the hardware
/// button mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamepadButton {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Start,
    Back,
    LeftThumb,
    RightThumb,
    LeftShoulder,
    RightShoulder,
    Guide,
    A,
    B,
    X,
    Y,
}

impl GamepadButton {
    pub const ALL: [GamepadButton; 15] = [
        GamepadButton::DPadUp,
        GamepadButton::DPadDown,
        GamepadButton::DPadLeft,
        GamepadButton::DPadRight,
        GamepadButton::Start,
        GamepadButton::Back,
        GamepadButton::LeftThumb,
        GamepadButton::RightThumb,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::Guide,
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
    ];

    /// Bit of this button in [`GamepadState::buttons`](crate::producer::gamepad::GamepadState).
    pub const fn mask(self) -> u16 {
        match self {
            GamepadButton::DPadUp => 0x0001,
            GamepadButton::DPadDown => 0x0002,
            GamepadButton::DPadLeft => 0x0004,
            GamepadButton::DPadRight => 0x0008,
            GamepadButton::Start => 0x0010,
            GamepadButton::Back => 0x0020,
            GamepadButton::LeftThumb => 0x0040,
            GamepadButton::RightThumb => 0x0080,
            GamepadButton::LeftShoulder => 0x0100,
            GamepadButton::RightShoulder => 0x0200,
            GamepadButton::Guide => 0x0400,
            GamepadButton::A => 0x1000,
            GamepadButton::B => 0x2000,
            GamepadButton::X => 0x4000,
            GamepadButton::Y => 0x8000,
        }
    }
}

/// Analog gamepad controls. Sticks report signed 16-bit values, triggers
/// unsigned 8-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamepadAxis {
    LeftThumbX,
    LeftThumbY,
    RightThumbX,
    RightThumbY,
    LeftTrigger,
    RightTrigger,
}

impl GamepadAxis {
    pub const ALL: [GamepadAxis; 6] = [
        GamepadAxis::LeftThumbX,
        GamepadAxis::LeftThumbY,
        GamepadAxis::RightThumbX,
        GamepadAxis::RightThumbY,
        GamepadAxis::LeftTrigger,
        GamepadAxis::RightTrigger,
    ];

    /// Declared raw range `(min, max)` of the control.
    pub const fn raw_range(self) -> (i32, i32) {
        match self {
            GamepadAxis::LeftTrigger | GamepadAxis::RightTrigger => {
                (u8::MIN as i32, u8::MAX as i32)
            }
            _ => (i16::MIN as i32, i16::MAX as i32),
        }
    }

    /// Maps a raw reading linearly into `[0, 1]`.
    pub fn normalize(self, raw: i32) -> f64 {
        let (min, max) = self.raw_range();
        (raw.clamp(min, max) - min) as f64 / (max - min) as f64
    }

    /// Raw change expressed on the normalized scale.
    pub fn normalize_delta(self, previous: i32, current: i32) -> f64 {
        let (min, max) = self.raw_range();
        (current - previous) as f64 / (max - min) as f64
    }
}

/// Immutable identity of a physical input source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureDescriptor {
    GamepadButton { user_index: u8, button: GamepadButton },
    GamepadAxis { user_index: u8, axis: GamepadAxis },
    DeviceButton { name: String },
    DeviceAxis { name: String },
}

impl GestureDescriptor {
    pub fn gamepad_button(user_index: u8, button: GamepadButton) -> Self {
        GestureDescriptor::GamepadButton { user_index, button }
    }

    pub fn gamepad_axis(user_index: u8, axis: GamepadAxis) -> Self {
        GestureDescriptor::GamepadAxis { user_index, axis }
    }

    pub fn device_button(name: impl Into<String>) -> Self {
        GestureDescriptor::DeviceButton { name: name.into() }
    }

    pub fn device_axis(name: impl Into<String>) -> Self {
        GestureDescriptor::DeviceAxis { name: name.into() }
    }

    /// Whether this source produces [`Gesture::Simple`] values.
    pub fn is_button(&self) -> bool {
        matches!(
            self,
            GestureDescriptor::GamepadButton { .. } | GestureDescriptor::DeviceButton { .. }
        )
    }

    /// Whether this source produces [`Gesture::Axis`] values.
    pub fn is_axis(&self) -> bool {
        !self.is_button()
    }
}

impl fmt::Display for GestureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureDescriptor::GamepadButton { user_index, button } => {
                write!(f, "Gamepad{} {:?}", user_index, button)
            }
            GestureDescriptor::GamepadAxis { user_index, axis } => {
                write!(f, "Gamepad{} {:?}", user_index, axis)
            }
            GestureDescriptor::DeviceButton { name } => write!(f, "Device button '{}'", name),
            GestureDescriptor::DeviceAxis { name } => write!(f, "Device axis '{}'", name),
        }
    }
}

/// Pressed/released observation of a button-like source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleGesture {
    pub descriptor: GestureDescriptor,
    pub state: bool,
}

/// Position observation of an axis-like source.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisGesture {
    pub descriptor: GestureDescriptor,
    /// Current position, in `[0, 1]`
    pub value: f64,
    /// Signed change since the previous sample, same scale as `value`
    pub delta: f64,
    /// Time elapsed since the previous sample
    pub delta_time: Duration,
}

/// One discrete input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Simple(SimpleGesture),
    Axis(AxisGesture),
}

impl Gesture {
    pub fn simple(descriptor: GestureDescriptor, state: bool) -> Self {
        Gesture::Simple(SimpleGesture { descriptor, state })
    }

    /// A completed button press as seen by the shortcut machines: the
    /// pressed gesture immediately followed by the released one.
    pub fn activation(descriptor: GestureDescriptor) -> [Self; 2] {
        [
            Gesture::simple(descriptor.clone(), true),
            Gesture::simple(descriptor, false),
        ]
    }

    pub fn axis(
        descriptor: GestureDescriptor,
        value: f64,
        delta: f64,
        delta_time: Duration,
    ) -> Self {
        Gesture::Axis(AxisGesture {
            descriptor,
            value,
            delta,
            delta_time,
        })
    }

    pub fn descriptor(&self) -> &GestureDescriptor {
        match self {
            Gesture::Simple(g) => &g.descriptor,
            Gesture::Axis(g) => &g.descriptor,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Gesture::Simple(_) => "simple",
            Gesture::Axis(_) => "axis",
        }
    }
}
