//! Gamepad producer
//!
//! Polls up to [`MAX_SLOTS`] controller slots on a dedicated thread:
//!
//! ```text
//! GamepadBackend ──► GamepadPoller ──► GestureSink
//!  (packets +        (diff per slot,
//!   keystrokes)       activations)
//! ```
//!
//! Analog controls are diffed between packets and emitted as axis gestures.
//! Digital buttons come only from the backend's keystroke queue: a key-up
//! keystroke emits one activation gesture, so fast presses between two ticks
//! are never lost.

pub mod backend;
pub mod gilrs_backend;
pub mod poller;

pub use backend::{BackendError, GamepadBackend, GamepadState, Keystroke};
pub use gilrs_backend::GilrsBackend;
pub use poller::{GamepadPoller, PollerState};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{GestureSink, ProducerError};

pub const MAX_SLOTS: u8 = 4;

/// ~30 Hz
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 33;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSettings {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// Number of slots polled, starting at slot 0
    pub slots: u8,
    pub stats_interval_secs: u64,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            slots: MAX_SLOTS,
            stats_interval_secs: 30,
        }
    }
}

impl GamepadSettings {
    pub fn validate(&self) -> Result<(), ProducerError> {
        if self.slots == 0 || self.slots > MAX_SLOTS {
            return Err(ProducerError::InitializationError(format!(
                "slots must be between 1 and {}, got {}",
                MAX_SLOTS, self.slots
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ProducerError::InitializationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.stats_interval_secs == 0 {
            return Err(ProducerError::InitializationError(
                "stats_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Running gamepad polling thread.
///
/// The backend is created on the polling thread itself, so it does not need
/// to be `Send`. Dropping the producer requests cancellation; [`stop`](Self::stop)
/// also waits for the thread to exit.
#[derive(Debug)]
pub struct GamepadProducer {
    cancel: CancellationToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl GamepadProducer {
    /// Spawns the polling thread and waits until the backend is up.
    ///
    /// # Errors
    ///
    /// * [`ProducerError::InitializationError`] - invalid settings
    /// * any error returned by `factory`, e.g. [`ProducerError::DeviceUnavailable`]
    /// * [`ProducerError::ThreadError`] - the thread could not be spawned or died during startup
    pub async fn start<F, B>(
        factory: F,
        settings: GamepadSettings,
        sink: GestureSink,
    ) -> Result<Self, ProducerError>
    where
        F: FnOnce() -> Result<B, ProducerError> + Send + 'static,
        B: GamepadBackend + 'static,
    {
        settings.validate()?;
        info!("Starting gamepad producer with settings: {:?}", settings);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), ProducerError>>();

        let thread = std::thread::Builder::new()
            .name("gamepad-poll".to_string())
            .spawn(move || {
                let backend = match factory() {
                    Ok(backend) => backend,
                    Err(e) => {
                        error!("Failed to create gamepad backend: {}", e);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut poller = GamepadPoller::create(Box::new(backend), settings).initialize();
                if ready_tx.send(Ok(())).is_err() {
                    warn!("Gamepad producer start was abandoned");
                    return;
                }
                poller.run_polling_loop(&sink, &token);
                debug!("Gamepad polling thread exiting");
            })
            .map_err(|e| ProducerError::ThreadError(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Gamepad producer started");
                Ok(Self {
                    cancel,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProducerError::ThreadError(
                "polling thread exited during startup".to_string(),
            )),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signals the polling loop and waits for the thread to exit.
    pub async fn stop(mut self) -> Result<(), ProducerError> {
        info!("Stopping gamepad producer");
        self.cancel.cancel();

        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {
                info!("Gamepad producer stopped");
                Ok(())
            }
            Ok(Err(_)) => {
                error!("Gamepad polling thread panicked");
                Err(ProducerError::ThreadError(
                    "polling thread panicked".to_string(),
                ))
            }
            Err(e) => Err(ProducerError::ThreadError(e.to_string())),
        }
    }
}

impl Drop for GamepadProducer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
