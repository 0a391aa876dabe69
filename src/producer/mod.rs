//! Gesture producers
//!
//! Independent sources that observe a hardware or wire channel and emit
//! [`Gesture`] values into a [`GestureSink`]:
//!
//! 1. [`gamepad`] - fixed-rate polling of up to four controller slots
//! 2. [`device_protocol`] - `#<name>:<0|1>` button tokens from a text stream
//!
//! ```text
//! Hardware ──► GamepadProducer ─────┐
//!                                   ├──► GestureSink ──► Dispatcher
//! Transport ─► DeviceProtocol ──────┘
//! ```
//!
//! Emission is fire-and-forget: a producer never waits on the dispatcher.

pub mod device_protocol;
pub mod gamepad;

pub use device_protocol::DeviceProtocolProducer;
pub use gamepad::{GamepadProducer, GamepadSettings};

use crate::gesture::{Gesture, GestureDescriptor};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("Failed to initialize producer: {0}")]
    InitializationError(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error("Failed to read input: {0}")]
    ReadError(#[from] std::io::Error),
}

/// Non-blocking handle producers push gestures into.
///
/// Cloning subscribes another producer; dropping the last clone lets the
/// dispatcher wind down.
#[derive(Debug, Clone)]
pub struct GestureSink {
    sender: mpsc::Sender<Gesture>,
}

impl GestureSink {
    pub fn new(sender: mpsc::Sender<Gesture>) -> Self {
        Self { sender }
    }

    /// Creates a sink together with the receiving end, for consumers that
    /// read gestures directly.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Gesture>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }

    /// Queues a gesture. Returns `false` if it had to be dropped.
    pub fn emit(&self, gesture: Gesture) -> bool {
        match self.sender.try_send(gesture) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(gesture)) => {
                warn!(
                    "Gesture queue full, dropping {} gesture from {}",
                    gesture.kind(),
                    gesture.descriptor()
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(gesture)) => {
                debug!(
                    "Gesture queue closed, dropping gesture from {}",
                    gesture.descriptor()
                );
                false
            }
        }
    }

    /// Queues both halves of an activation pulse, or neither. Returns `false`
    /// if the pulse had to be dropped.
    pub fn emit_activation(&self, descriptor: GestureDescriptor) -> bool {
        match self.sender.try_reserve_many(2) {
            Ok(permits) => {
                for (permit, gesture) in permits.zip(Gesture::activation(descriptor)) {
                    permit.send(gesture);
                }
                true
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                warn!("Gesture queue full, dropping activation from {}", descriptor);
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("Gesture queue closed, dropping activation from {}", descriptor);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
