use serde::{Deserialize, Serialize};

use crate::gesture::AxisGesture;

/// Policy for turning an axis gesture into a forwarded value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Forward the absolute position
    Absolute,
    /// Forward the change since the previous sample
    #[default]
    Relative,
    RelativePositiveOnly,
    RelativeNegativeOnly,
    /// Forward the change only while it moves away from the rest position
    RelativeJoystick,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    pub mode: DriveMode,
    pub invert: bool,
}

impl DriveSettings {
    pub fn evaluate(&self, gesture: &AxisGesture) -> Option<f64> {
        let (value, delta) = (gesture.value, gesture.delta);
        let forwarded = match self.mode {
            DriveMode::Absolute => value,
            DriveMode::Relative => delta,
            DriveMode::RelativePositiveOnly => {
                if delta <= 0.0 {
                    return None;
                }
                delta
            }
            DriveMode::RelativeNegativeOnly => {
                if delta >= 0.0 {
                    return None;
                }
                delta
            }
            DriveMode::RelativeJoystick => {
                if (value > 0.5 && delta < 0.0) || (value < 0.5 && delta > 0.0) {
                    return None;
                }
                delta
            }
        };

        Some(if self.invert { -forwarded } else { forwarded })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriveShortcut {
    pub settings: DriveSettings,
}

impl DriveShortcut {
    pub fn new(settings: DriveSettings) -> Self {
        Self { settings }
    }

    pub fn handle(&self, gesture: &AxisGesture) -> Option<f64> {
        self.settings.evaluate(gesture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureDescriptor;
    use std::time::Duration;

    fn axis(value: f64, delta: f64) -> AxisGesture {
        AxisGesture {
            descriptor: GestureDescriptor::device_axis("L0"),
            value,
            delta,
            delta_time: Duration::from_millis(33),
        }
    }

    fn drive(mode: DriveMode, invert: bool) -> DriveShortcut {
        DriveShortcut::new(DriveSettings { mode, invert })
    }

    #[test]
    fn absolute_and_relative_forwarding() {
        assert_eq!(drive(DriveMode::Absolute, false).handle(&axis(0.8, -0.1)), Some(0.8));
        assert_eq!(drive(DriveMode::Absolute, true).handle(&axis(0.8, -0.1)), Some(-0.8));
        assert_eq!(drive(DriveMode::Relative, false).handle(&axis(0.8, -0.1)), Some(-0.1));
        assert_eq!(drive(DriveMode::Relative, true).handle(&axis(0.8, -0.1)), Some(0.1));
    }

    #[test]
    fn signed_relative_modes_filter_on_raw_delta() {
        let positive = drive(DriveMode::RelativePositiveOnly, true);
        assert_eq!(positive.handle(&axis(0.5, 0.2)), Some(-0.2));
        assert_eq!(positive.handle(&axis(0.5, -0.2)), None);
        assert_eq!(positive.handle(&axis(0.5, 0.0)), None);

        let negative = drive(DriveMode::RelativeNegativeOnly, false);
        assert_eq!(negative.handle(&axis(0.5, -0.2)), Some(-0.2));
        assert_eq!(negative.handle(&axis(0.5, 0.2)), None);
    }

    #[test]
    fn joystick_mode_never_forwards_return_motion() {
        let joystick = drive(DriveMode::RelativeJoystick, false);
        let samples = [0.0, 0.1, 0.3, 0.49, 0.5, 0.51, 0.7, 0.9, 1.0];
        let deltas = [-0.3, -0.01, 0.0, 0.01, 0.3];

        for &value in &samples {
            for &delta in &deltas {
                if let Some(forwarded) = joystick.handle(&axis(value, delta)) {
                    assert!(!(value > 0.5 && forwarded < 0.0));
                    assert!(!(value < 0.5 && forwarded > 0.0));
                }
            }
        }

        assert_eq!(joystick.handle(&axis(0.9, 0.05)), Some(0.05));
        assert_eq!(joystick.handle(&axis(0.1, -0.05)), Some(-0.05));
        assert_eq!(joystick.handle(&axis(0.5, 0.05)), Some(0.05));
    }
}
