//! Gesture recognition and shortcut dispatch for gamepads and serial button
//! devices.
//!
//! Producers turn raw input into [`gesture::Gesture`]s, the dispatcher routes
//! each one to the bindings registered for its descriptor, and every binding
//! runs its own [`shortcut::Shortcut`] state machine. Completed shortcuts are
//! handed to the caller as [`dispatch::TriggeredAction`]s.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod gesture;
pub mod producer;
pub mod shortcut;

pub use config::{ConfigError, EngineConfig};
pub use dispatch::{BindingConfig, BindingId, BindingRegistry, TriggeredAction};
pub use engine::{Engine, EngineError};
pub use gesture::{Gesture, GestureDescriptor};
pub use shortcut::{ShortcutOutput, ShortcutSettings};
