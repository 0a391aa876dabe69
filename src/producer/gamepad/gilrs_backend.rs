//! gilrs-backed gamepad hardware
//!
//! gilrs delivers an event stream rather than polled packets. This backend
//! folds that stream into per-slot [`GamepadState`] packets (the packet
//! number advances on every input event) and a per-slot keystroke queue, so
//! the poller sees the same capability on every platform.

use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use super::backend::{BackendError, GamepadBackend, GamepadState, Keystroke};
use super::MAX_SLOTS;
use crate::gesture::GamepadButton;
use crate::producer::ProducerError;

// Keystrokes queued beyond this are dropped until the poller catches up
const KEYSTROKE_QUEUE_LIMIT: usize = 64;

#[derive(Default)]
struct Slot {
    id: Option<GamepadId>,
    state: GamepadState,
    keystrokes: VecDeque<Keystroke>,
}

pub struct GilrsBackend {
    gilrs: Gilrs,
    slots: Vec<Slot>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, ProducerError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(ProducerError::DeviceUnavailable(e.to_string()));
            }
        };

        let mut backend = Self {
            gilrs,
            slots: (0..MAX_SLOTS).map(|_| Slot::default()).collect(),
        };

        let connected: Vec<GamepadId> = backend.gilrs.gamepads().map(|(id, _)| id).collect();
        if connected.is_empty() {
            warn!("No gamepad connected, waiting for connections");
        }
        for id in connected {
            backend.assign(id);
        }

        Ok(backend)
    }

    fn assign(&mut self, id: GamepadId) {
        if self.slot_of(id).is_some() {
            return;
        }
        let name = self.gilrs.gamepad(id).name().to_string();
        match self.slots.iter_mut().enumerate().find(|(_, s)| s.id.is_none()) {
            Some((index, slot)) => {
                *slot = Slot {
                    id: Some(id),
                    ..Slot::default()
                };
                info!("Assigned gamepad '{}' ({}) to slot {}", name, id, index);
            }
            None => warn!("No free slot for gamepad '{}' ({})", name, id),
        }
    }

    fn slot_of(&self, id: GamepadId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == Some(id))
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType) {
        match event {
            EventType::Connected => {
                self.assign(id);
                return;
            }
            EventType::Disconnected => {
                if let Some(index) = self.slot_of(id) {
                    info!("Gamepad {} left slot {}", id, index);
                    self.slots[index] = Slot::default();
                }
                return;
            }
            _ => {}
        }

        let Some(index) = self.slot_of(id) else {
            debug!("Ignoring event from unassigned gamepad {}", id);
            return;
        };
        let slot = &mut self.slots[index];

        let changed = match event {
            EventType::ButtonPressed(button, _) => apply_button(slot, button, true),
            EventType::ButtonReleased(button, _) => apply_button(slot, button, false),
            EventType::ButtonChanged(Button::LeftTrigger2, value, _) => {
                slot.state.left_trigger = trigger_raw(value);
                true
            }
            EventType::ButtonChanged(Button::RightTrigger2, value, _) => {
                slot.state.right_trigger = trigger_raw(value);
                true
            }
            EventType::AxisChanged(axis, value, _) => apply_axis(&mut slot.state, axis, value),
            _ => false,
        };

        if changed {
            slot.state.packet_number = slot.state.packet_number.wrapping_add(1);
        }
    }
}

impl GamepadBackend for GilrsBackend {
    fn begin_tick(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            self.handle_event(id, event);
        }
    }

    fn state(&mut self, slot: u8) -> Result<Option<GamepadState>, BackendError> {
        let slot_ref = self
            .slots
            .get(slot as usize)
            .ok_or(BackendError::SlotOutOfRange(slot))?;
        Ok(slot_ref.id.map(|_| slot_ref.state))
    }

    fn next_keystroke(&mut self, slot: u8) -> Result<Option<Keystroke>, BackendError> {
        let slot_ref = self
            .slots
            .get_mut(slot as usize)
            .ok_or(BackendError::SlotOutOfRange(slot))?;
        Ok(slot_ref.keystrokes.pop_front())
    }

    fn name(&self) -> &str {
        "gilrs"
    }
}

fn apply_button(slot: &mut Slot, button: Button, pressed: bool) -> bool {
    let Some(mapped) = map_button(button) else {
        debug!("Ignoring unsupported button: {:?}", button);
        return false;
    };

    if pressed {
        slot.state.buttons |= mapped.mask();
    } else {
        slot.state.buttons &= !mapped.mask();
    }

    if slot.keystrokes.len() < KEYSTROKE_QUEUE_LIMIT {
        slot.keystrokes.push_back(Keystroke {
            button: mapped,
            key_up: !pressed,
        });
    } else {
        warn!("Keystroke queue full, dropping {:?}", mapped);
    }
    true
}

fn apply_axis(state: &mut GamepadState, axis: Axis, value: f32) -> bool {
    match axis {
        Axis::LeftStickX => state.thumb_lx = stick_raw(value),
        Axis::LeftStickY => state.thumb_ly = stick_raw(value),
        Axis::RightStickX => state.thumb_rx = stick_raw(value),
        Axis::RightStickY => state.thumb_ry = stick_raw(value),
        Axis::LeftZ => state.left_trigger = trigger_raw(value),
        Axis::RightZ => state.right_trigger = trigger_raw(value),
        _ => {
            debug!("Ignoring unsupported axis: {:?}", axis);
            return false;
        }
    }
    true
}

fn stick_raw(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn trigger_raw(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * u8::MAX as f32).round() as u8
}

fn map_button(button: Button) -> Option<GamepadButton> {
    match button {
        Button::South => Some(GamepadButton::A),
        Button::East => Some(GamepadButton::B),
        Button::West => Some(GamepadButton::X),
        Button::North => Some(GamepadButton::Y),
        Button::Start => Some(GamepadButton::Start),
        Button::Select => Some(GamepadButton::Back),
        Button::LeftTrigger => Some(GamepadButton::LeftShoulder),
        Button::RightTrigger => Some(GamepadButton::RightShoulder),
        Button::LeftThumb => Some(GamepadButton::LeftThumb),
        Button::RightThumb => Some(GamepadButton::RightThumb),
        Button::DPadUp => Some(GamepadButton::DPadUp),
        Button::DPadDown => Some(GamepadButton::DPadDown),
        Button::DPadLeft => Some(GamepadButton::DPadLeft),
        Button::DPadRight => Some(GamepadButton::DPadRight),
        Button::Mode => Some(GamepadButton::Guide),
        _ => None,
    }
}
