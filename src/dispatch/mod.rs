//! Gesture dispatch
//!
//! Routes every gesture to the bindings attached to its descriptor:
//!
//! 1. [`registry`] - descriptor-keyed binding set, safe to edit while running
//! 2. [`dispatcher`] - the single task that drains producers and fans out
//! 3. [`binding`] - binding records and the [`TriggeredAction`] they emit
//!
//! ```text
//! GestureSink ──► Dispatcher ──► BindingRegistry ──► ShortcutBinding(s)
//!                     │                                     │
//!                     └──────────── TriggeredAction ◄───────┘
//! ```

pub mod binding;
pub mod dispatcher;
pub mod registry;

pub use binding::{BindingConfig, BindingId, ShortcutBinding, TriggeredAction};
pub use dispatcher::{DispatchStats, Dispatcher, DispatcherHandle, DispatcherSettings};
pub use registry::BindingRegistry;

use crate::gesture::GestureDescriptor;
use crate::shortcut::{ShortcutError, ShortcutKind};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown binding {0}")]
    UnknownBinding(BindingId),

    #[error("{shortcut} shortcut cannot be bound to {descriptor}")]
    IncompatibleDescriptor {
        shortcut: ShortcutKind,
        descriptor: GestureDescriptor,
    },

    #[error(transparent)]
    InvalidSettings(#[from] ShortcutError),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to initialize dispatcher: {0}")]
    InitializationError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),
}
