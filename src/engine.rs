//! Engine wiring
//!
//! ```text
//! GamepadProducer ─────────┐
//!                          ├──► DispatcherHandle ──► action_tx
//! DeviceProtocolProducer ──┘          │
//!                               BindingRegistry
//! ```

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::{
    BindingRegistry, DispatchError, DispatchStats, DispatcherHandle, RegistryError,
    TriggeredAction,
};
use crate::producer::gamepad::GamepadBackend;
use crate::producer::{DeviceProtocolProducer, GamepadProducer, GestureSink, ProducerError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Producer error: {0}")]
    Producer(#[from] ProducerError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub struct Engine {
    dispatcher: DispatcherHandle,
    sink: GestureSink,
    gamepad: Option<GamepadProducer>,
}

impl Engine {
    /// Loads the configured bindings and starts every producer.
    ///
    /// Bindings that fail to register are logged and skipped. `backend_factory`
    /// runs on the polling thread and is not called when the gamepad is
    /// disabled.
    pub async fn start<F, B>(
        config: EngineConfig,
        backend_factory: F,
        action_tx: mpsc::Sender<TriggeredAction>,
    ) -> Result<Self, EngineError>
    where
        F: FnOnce() -> Result<B, ProducerError> + Send + 'static,
        B: GamepadBackend + 'static,
    {
        config.validate()?;

        let registry = BindingRegistry::new();
        let total = config.bindings.len();
        let mut loaded = 0;
        for binding in config.bindings {
            let action = binding.action.clone();
            match registry.add(binding).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!("Skipping binding '{}': {}", action, e),
            }
        }
        info!("Loaded {}/{} bindings", loaded, total);

        let mut dispatcher = DispatcherHandle::spawn(registry, action_tx, config.dispatcher)?;
        let sink = dispatcher.sink().ok_or_else(|| {
            DispatchError::InitializationError("dispatcher input already closed".to_string())
        })?;

        let gamepad = if config.gamepad.enabled {
            match GamepadProducer::start(backend_factory, config.gamepad, sink.clone()).await {
                Ok(producer) => Some(producer),
                Err(e) => {
                    error!("Failed to start gamepad producer: {}", e);
                    if let Err(e) = dispatcher.shutdown().await {
                        error!("Dispatcher shutdown failed: {}", e);
                    }
                    return Err(e.into());
                }
            }
        } else {
            info!("Gamepad producer disabled");
            None
        };

        info!("Engine started");
        Ok(Self {
            dispatcher,
            sink,
            gamepad,
        })
    }

    pub fn registry(&self) -> &BindingRegistry {
        self.dispatcher.registry()
    }

    pub fn gesture_sink(&self) -> GestureSink {
        self.sink.clone()
    }

    /// New device-protocol producer feeding this engine.
    pub fn device_protocol(&self) -> DeviceProtocolProducer {
        DeviceProtocolProducer::new(self.gesture_sink())
    }

    pub fn gamepad_running(&self) -> bool {
        self.gamepad.as_ref().is_some_and(GamepadProducer::is_running)
    }

    /// Stops the gamepad producer, then the dispatcher.
    pub async fn shutdown(mut self) -> Result<DispatchStats, EngineError> {
        info!("Shutting down engine");
        if let Some(gamepad) = self.gamepad.take() {
            if let Err(e) = gamepad.stop().await {
                error!("Gamepad producer did not stop cleanly: {}", e);
            }
        }
        Ok(self.dispatcher.shutdown().await?)
    }
}
