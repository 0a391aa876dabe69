use gesture_dispatch::gesture::{GamepadAxis, GamepadButton};
use gesture_dispatch::producer::gamepad::{
    BackendError, GamepadBackend, GamepadSettings, GamepadState, Keystroke,
};
use gesture_dispatch::producer::ProducerError;
use gesture_dispatch::shortcut::{
    ClickSettings, DriveMode, DriveSettings, EdgeSettings, LongPressSettings,
};
use gesture_dispatch::{
    BindingConfig, Engine, EngineConfig, EngineError, GestureDescriptor, ShortcutOutput,
    ShortcutSettings, TriggeredAction,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Replays a fixed list of packets on slot 0, then repeats the last one.
struct ScriptedPad {
    packets: VecDeque<GamepadState>,
    last: Option<GamepadState>,
    keystrokes: VecDeque<Keystroke>,
}

impl GamepadBackend for ScriptedPad {
    fn state(&mut self, slot: u8) -> Result<Option<GamepadState>, BackendError> {
        if slot != 0 {
            return Ok(None);
        }
        if let Some(packet) = self.packets.pop_front() {
            self.last = Some(packet);
        }
        Ok(self.last)
    }

    fn next_keystroke(&mut self, slot: u8) -> Result<Option<Keystroke>, BackendError> {
        if slot != 0 {
            return Ok(None);
        }
        Ok(self.keystrokes.pop_front())
    }

    fn name(&self) -> &str {
        "scripted-pad"
    }
}

fn scripted_pad() -> Result<ScriptedPad, ProducerError> {
    let baseline = GamepadState {
        packet_number: 1,
        ..Default::default()
    };
    let pulled = GamepadState {
        packet_number: 2,
        right_trigger: 255,
        ..Default::default()
    };
    Ok(ScriptedPad {
        packets: VecDeque::from([baseline, pulled]),
        last: None,
        keystrokes: VecDeque::from([
            Keystroke {
                button: GamepadButton::A,
                key_up: false,
            },
            Keystroke {
                button: GamepadButton::A,
                key_up: true,
            },
        ]),
    })
}

/// Two quick taps of B on slot 0.
fn tapping_pad() -> Result<ScriptedPad, ProducerError> {
    let tap = |key_up| Keystroke {
        button: GamepadButton::B,
        key_up,
    };
    Ok(ScriptedPad {
        packets: VecDeque::from([GamepadState {
            packet_number: 1,
            ..Default::default()
        }]),
        last: None,
        keystrokes: VecDeque::from([tap(false), tap(true), tap(false), tap(true)]),
    })
}

fn no_pad() -> Result<ScriptedPad, ProducerError> {
    Err(ProducerError::DeviceUnavailable("no pad attached".to_string()))
}

fn press() -> ShortcutSettings {
    ShortcutSettings::Press(EdgeSettings {
        handle_repeating: true,
    })
}

async fn collect(rx: &mut mpsc::Receiver<TriggeredAction>, n: usize) -> Vec<TriggeredAction> {
    let mut actions = Vec::new();
    while actions.len() < n {
        let action = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for action")
            .expect("action channel closed");
        actions.push(action);
    }
    actions
}

#[tokio::test]
async fn gamepad_gestures_reach_bindings() {
    let config = EngineConfig {
        gamepad: GamepadSettings {
            poll_interval_ms: 5,
            slots: 1,
            ..Default::default()
        },
        bindings: vec![
            BindingConfig::new(
                "confirm",
                GestureDescriptor::gamepad_button(0, GamepadButton::A),
                press(),
            ),
            BindingConfig::new(
                "throttle",
                GestureDescriptor::gamepad_axis(0, GamepadAxis::RightTrigger),
                ShortcutSettings::Drive(DriveSettings {
                    mode: DriveMode::Absolute,
                    invert: false,
                }),
            ),
        ],
        ..Default::default()
    };

    let (action_tx, mut action_rx) = mpsc::channel(16);
    let engine = Engine::start(config, scripted_pad, action_tx).await.unwrap();
    assert!(engine.gamepad_running());
    assert_eq!(engine.registry().len().await, 2);

    let mut actions = collect(&mut action_rx, 2).await;
    actions.sort_by(|a, b| a.action.cmp(&b.action));
    assert_eq!(actions[0].action, "confirm");
    assert_eq!(actions[0].output, ShortcutOutput::Fired);
    assert_eq!(actions[1].action, "throttle");
    assert_eq!(actions[1].output, ShortcutOutput::Value(1.0));

    let stats = engine.shutdown().await.unwrap();
    assert_eq!(stats.actions, 2);
}

#[tokio::test]
async fn device_protocol_feeds_engine() {
    let mut config = EngineConfig::default();
    config.gamepad.enabled = false;
    config.bindings.push(BindingConfig::new(
        "record",
        GestureDescriptor::device_button("b2"),
        press(),
    ));

    let (action_tx, mut action_rx) = mpsc::channel(16);
    let engine = Engine::start(config, no_pad, action_tx).await.unwrap();
    assert!(!engine.gamepad_running());

    let mut device = engine.device_protocol();
    assert_eq!(device.parse("#b2:1\n#b2:0\n#b3:1\n"), 1);

    let actions = collect(&mut action_rx, 1).await;
    assert_eq!(actions[0].action, "record");
    assert_eq!(actions[0].descriptor, GestureDescriptor::device_button("b2"));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_bindings_are_skipped() {
    let mut config = EngineConfig::default();
    config.gamepad.enabled = false;
    config.bindings.push(BindingConfig::new(
        "bad",
        GestureDescriptor::device_button("b0"),
        ShortcutSettings::Drive(DriveSettings::default()),
    ));
    config.bindings.push(BindingConfig::new(
        "good",
        GestureDescriptor::device_button("b0"),
        press(),
    ));

    let (action_tx, _action_rx) = mpsc::channel(16);
    let engine = Engine::start(config, no_pad, action_tx).await.unwrap();

    let bindings = engine.registry().bindings().await;
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].1.action, "good");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn unavailable_gamepad_fails_start() {
    let (action_tx, _action_rx) = mpsc::channel(16);
    let result = Engine::start(EngineConfig::default(), no_pad, action_tx).await;
    assert!(matches!(
        result,
        Err(EngineError::Producer(ProducerError::DeviceUnavailable(_)))
    ));
}

#[tokio::test]
async fn gamepad_taps_drive_every_button_shortcut() {
    let b = GestureDescriptor::gamepad_button(0, GamepadButton::B);
    let config = EngineConfig {
        gamepad: GamepadSettings {
            poll_interval_ms: 5,
            slots: 1,
            ..Default::default()
        },
        bindings: vec![
            BindingConfig::new(
                "double_tap",
                b.clone(),
                ShortcutSettings::Click(ClickSettings {
                    click_count: 2,
                    maximum_click_interval_ms: 5_000,
                }),
            ),
            BindingConfig::new(
                "pressed",
                b.clone(),
                ShortcutSettings::Press(EdgeSettings::default()),
            ),
            BindingConfig::new(
                "released",
                b.clone(),
                ShortcutSettings::Release(EdgeSettings::default()),
            ),
            BindingConfig::new(
                "held",
                b,
                ShortcutSettings::LongPress(LongPressSettings {
                    minimum_hold_ms: 0,
                    maximum_hold_ms: 0,
                }),
            ),
        ],
        ..Default::default()
    };

    let (action_tx, mut action_rx) = mpsc::channel(16);
    let engine = Engine::start(config, tapping_pad, action_tx).await.unwrap();

    let actions = collect(&mut action_rx, 7).await;
    let count = |name: &str| actions.iter().filter(|a| a.action == name).count();
    assert_eq!(count("double_tap"), 1);
    assert_eq!(count("pressed"), 2);
    assert_eq!(count("released"), 2);
    assert_eq!(count("held"), 2);

    let stats = engine.shutdown().await.unwrap();
    assert_eq!(stats.actions, 7);
}
