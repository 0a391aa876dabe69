use gesture_dispatch::dispatch::{DispatcherHandle, DispatcherSettings};
use gesture_dispatch::gesture::{GamepadAxis, GamepadButton};
use gesture_dispatch::producer::{DeviceProtocolProducer, GestureSink};
use gesture_dispatch::shortcut::{
    ClickSettings, DriveMode, DriveSettings, EdgeSettings, LongPressSettings,
};
use gesture_dispatch::{
    BindingConfig, BindingRegistry, Gesture, GestureDescriptor, ShortcutOutput, ShortcutSettings,
    TriggeredAction,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn next_action(rx: &mut mpsc::Receiver<TriggeredAction>) -> TriggeredAction {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for action")
        .expect("action channel closed")
}

async fn assert_no_action(rx: &mut mpsc::Receiver<TriggeredAction>) {
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
}

fn click(count: u32) -> ShortcutSettings {
    ShortcutSettings::Click(ClickSettings {
        click_count: count,
        maximum_click_interval_ms: 5_000,
    })
}

fn spawn(registry: BindingRegistry) -> (DispatcherHandle, mpsc::Receiver<TriggeredAction>) {
    let (action_tx, action_rx) = mpsc::channel(64);
    let handle = DispatcherHandle::spawn(registry, action_tx, DispatcherSettings::default())
        .expect("dispatcher should spawn");
    (handle, action_rx)
}

#[tokio::test]
async fn routes_to_matching_binding_only() {
    let registry = BindingRegistry::new();
    let a = GestureDescriptor::gamepad_button(0, GamepadButton::A);
    let b = GestureDescriptor::gamepad_button(0, GamepadButton::B);
    registry
        .add(BindingConfig::new(
            "jump",
            a.clone(),
            ShortcutSettings::Press(EdgeSettings::default()),
        ))
        .await
        .unwrap();

    let (mut handle, mut rx) = spawn(registry);
    let sink = handle.sink().unwrap();

    assert!(sink.emit(Gesture::simple(b, true)));
    assert_no_action(&mut rx).await;

    assert!(sink.emit(Gesture::simple(a.clone(), true)));
    let action = next_action(&mut rx).await;
    assert_eq!(action.action, "jump");
    assert_eq!(action.descriptor, a);
    assert_eq!(action.output, ShortcutOutput::Fired);

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.gestures, 2);
    assert_eq!(stats.actions, 1);
}

#[tokio::test]
async fn interleaved_descriptors_keep_separate_counters() {
    let registry = BindingRegistry::new();
    let a = GestureDescriptor::gamepad_button(0, GamepadButton::A);
    let x = GestureDescriptor::device_button("b1");
    registry.add(BindingConfig::new("double_a", a.clone(), click(2))).await.unwrap();
    registry.add(BindingConfig::new("double_x", x.clone(), click(2))).await.unwrap();

    let (mut handle, mut rx) = spawn(registry);
    let sink = handle.sink().unwrap();

    // a down, x down, a up, x up, a down, a up -> only a completes
    for (descriptor, state) in [
        (&a, true),
        (&x, true),
        (&a, false),
        (&x, false),
        (&a, true),
        (&a, false),
    ] {
        assert!(sink.emit(Gesture::simple(descriptor.clone(), state)));
    }

    let action = next_action(&mut rx).await;
    assert_eq!(action.action, "double_a");
    assert_no_action(&mut rx).await;

    sink.emit(Gesture::simple(x.clone(), true));
    sink.emit(Gesture::simple(x, false));
    assert_eq!(next_action(&mut rx).await.action, "double_x");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn bindings_can_change_while_running() {
    let registry = BindingRegistry::new();
    let (mut handle, mut rx) = spawn(registry.clone());
    let sink = handle.sink().unwrap();
    let a = GestureDescriptor::gamepad_button(1, GamepadButton::A);

    sink.emit(Gesture::simple(a.clone(), true));
    assert_no_action(&mut rx).await;

    let id = registry
        .add(BindingConfig::new(
            "fire",
            a.clone(),
            ShortcutSettings::Press(EdgeSettings {
                handle_repeating: true,
            }),
        ))
        .await
        .unwrap();
    sink.emit(Gesture::simple(a.clone(), true));
    assert_eq!(next_action(&mut rx).await.binding, id);

    registry.set_enabled(id, false).await.unwrap();
    sink.emit(Gesture::simple(a.clone(), true));
    assert_no_action(&mut rx).await;

    registry.set_enabled(id, true).await.unwrap();
    sink.emit(Gesture::simple(a.clone(), true));
    assert_eq!(next_action(&mut rx).await.action, "fire");

    assert!(registry.remove(id).await.is_some());
    sink.emit(Gesture::simple(a, true));
    assert_no_action(&mut rx).await;

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn drive_binding_forwards_axis_values() {
    let registry = BindingRegistry::new();
    let stick = GestureDescriptor::gamepad_axis(0, GamepadAxis::LeftThumbX);
    registry
        .add(BindingConfig::new(
            "steer",
            stick.clone(),
            ShortcutSettings::Drive(DriveSettings {
                mode: DriveMode::RelativeJoystick,
                invert: false,
            }),
        ))
        .await
        .unwrap();

    let (mut handle, mut rx) = spawn(registry);
    let sink = handle.sink().unwrap();

    // moving back towards center above 0.5 is dropped
    sink.emit(Gesture::axis(stick.clone(), 0.8, -0.1, Duration::from_millis(33)));
    sink.emit(Gesture::axis(stick, 0.8, 0.2, Duration::from_millis(33)));

    let action = next_action(&mut rx).await;
    assert_eq!(action.output, ShortcutOutput::Value(0.2));
    assert_no_action(&mut rx).await;

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn closed_action_sink_counts_undelivered() {
    let registry = BindingRegistry::new();
    let a = GestureDescriptor::device_button("b0");
    registry
        .add(BindingConfig::new(
            "go",
            a.clone(),
            ShortcutSettings::Press(EdgeSettings {
                handle_repeating: true,
            }),
        ))
        .await
        .unwrap();

    let (mut handle, rx) = spawn(registry);
    drop(rx);

    let sink = handle.sink().unwrap();
    sink.emit(Gesture::simple(a.clone(), true));
    sink.emit(Gesture::simple(a, true));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.actions, 0);
    assert_eq!(stats.undelivered, 2);
    assert!(handle.shutdown().await.is_ok());
}

#[tokio::test]
async fn device_activations_complete_every_button_shortcut() {
    let registry = BindingRegistry::new();
    let b = GestureDescriptor::device_button("b");
    let bindings = [
        ("press", ShortcutSettings::Press(EdgeSettings::default())),
        ("click", click(1)),
        (
            "long_press",
            ShortcutSettings::LongPress(LongPressSettings {
                minimum_hold_ms: 0,
                maximum_hold_ms: 0,
            }),
        ),
        ("release", ShortcutSettings::Release(EdgeSettings::default())),
    ];
    for (action, shortcut) in bindings {
        registry
            .add(BindingConfig::new(action, b.clone(), shortcut))
            .await
            .unwrap();
    }

    let (sink, mut rx) = GestureSink::channel(16);
    let mut device = DeviceProtocolProducer::new(sink);
    let now = Instant::now();

    for _ in 0..3 {
        assert_eq!(device.parse("#b:1\n#b:0\n"), 1);
        let mut fired = Vec::new();
        while let Ok(gesture) = rx.try_recv() {
            for action in registry.dispatch(&gesture, now).await {
                fired.push(action.action);
            }
        }
        fired.sort();
        assert_eq!(fired, vec!["click", "long_press", "press", "release"]);
    }
}
