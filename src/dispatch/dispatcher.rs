//! Dispatcher task with statum lifecycle
//!
//! ```text
//! Configured ──► Active ──► Stopped
//!                  │
//!          run_until_shutdown
//! ```
//!
//! One task drains the gesture channel in arrival order and fans each
//! gesture out through the [`BindingRegistry`]. Triggered actions go to the
//! action sink supplied by the caller.

use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::binding::TriggeredAction;
use super::registry::BindingRegistry;
use super::DispatchError;
use crate::gesture::Gesture;
use crate::producer::GestureSink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// Capacity of the gesture queue shared by all producers
    pub channel_capacity: usize,
    /// Suggested capacity for the caller's action channel
    pub action_capacity: usize,
    pub stats_interval_secs: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            action_capacity: 256,
            stats_interval_secs: 30,
        }
    }
}

impl DispatcherSettings {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.channel_capacity == 0 || self.action_capacity == 0 {
            return Err(DispatchError::InitializationError(
                "channel capacities must be greater than 0".to_string(),
            ));
        }
        if self.stats_interval_secs == 0 {
            return Err(DispatchError::InitializationError(
                "stats_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters kept over the lifetime of one dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub gestures: u64,
    pub actions: u64,
    pub undelivered: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum DispatcherState {
    Configured,
    Active,
    Stopped,
}

#[machine]
pub struct Dispatcher<S: DispatcherState> {
    gesture_rx: mpsc::Receiver<Gesture>,
    action_tx: mpsc::Sender<TriggeredAction>,
    registry: BindingRegistry,
    settings: DispatcherSettings,
    stats: DispatchStats,
}

impl<S: DispatcherState> Dispatcher<S> {
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

impl Dispatcher<Configured> {
    pub fn create(
        gesture_rx: mpsc::Receiver<Gesture>,
        action_tx: mpsc::Sender<TriggeredAction>,
        registry: BindingRegistry,
        settings: DispatcherSettings,
    ) -> Self {
        debug!("Creating dispatcher with settings: {:?}", settings);
        Self::new(
            gesture_rx,
            action_tx,
            registry,
            settings,
            DispatchStats::default(),
        )
    }

    pub fn activate(self) -> Dispatcher<Active> {
        info!("Activating dispatcher");
        self.transition()
    }
}

impl Dispatcher<Active> {
    /// Routes one gesture and forwards whatever it triggered.
    pub async fn handle_gesture(&mut self, gesture: Gesture) {
        self.stats.gestures += 1;

        let actions = self.registry.dispatch(&gesture, Instant::now()).await;
        for action in actions {
            debug!(
                "Forwarding '{}' from binding {} ({:?})",
                action.action, action.binding, action.output
            );
            match self.action_tx.send(action).await {
                Ok(_) => self.stats.actions += 1,
                Err(e) => {
                    self.stats.undelivered += 1;
                    warn!("Action sink closed, dropping '{}'", e.0.action);
                }
            }
        }
    }

    /// Processes gestures until cancelled or until every producer is gone.
    pub async fn run_until_shutdown(mut self, cancel: CancellationToken) -> Dispatcher<Stopped> {
        info!("Starting dispatch loop");

        let stats_period = Duration::from_secs(self.settings.stats_interval_secs);
        let mut stats_timer = tokio::time::interval(stats_period);
        stats_timer.tick().await;
        let mut last_reported = self.stats;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received for dispatcher");
                    break;
                }

                gesture = self.gesture_rx.recv() => {
                    match gesture {
                        Some(gesture) => self.handle_gesture(gesture).await,
                        None => {
                            info!("All gesture producers disconnected");
                            break;
                        }
                    }
                }

                _ = stats_timer.tick() => {
                    info!(
                        "Dispatcher stats: {} gestures, {} actions in last {} seconds",
                        self.stats.gestures - last_reported.gestures,
                        self.stats.actions - last_reported.actions,
                        stats_period.as_secs()
                    );
                    last_reported = self.stats;
                }
            }
        }

        info!("Dispatcher stopping after {} gestures", self.stats.gestures);
        self.transition()
    }
}

/// Owns the running dispatcher task.
#[derive(Debug)]
pub struct DispatcherHandle {
    // Released by `close`, after which the loop ends with the last producer
    sink: Option<GestureSink>,
    registry: BindingRegistry,
    cancel: CancellationToken,
    task: Option<JoinHandle<DispatchStats>>,
}

impl DispatcherHandle {
    /// Spawns the dispatch loop on the current tokio runtime.
    pub fn spawn(
        registry: BindingRegistry,
        action_tx: mpsc::Sender<TriggeredAction>,
        settings: DispatcherSettings,
    ) -> Result<Self, DispatchError> {
        settings.validate()?;

        let (sink, gesture_rx) = GestureSink::channel(settings.channel_capacity);
        debug!(
            "Created gesture channel with capacity {}",
            settings.channel_capacity
        );

        let dispatcher =
            Dispatcher::create(gesture_rx, action_tx, registry.clone(), settings).activate();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let stopped = dispatcher.run_until_shutdown(token).await;
            stopped.stats()
        });

        info!("Dispatcher spawned");
        Ok(Self {
            sink: Some(sink),
            registry,
            cancel,
            task: Some(task),
        })
    }

    /// Sink producers emit into. Each clone is an independent subscription.
    /// `None` once the handle was closed.
    pub fn sink(&self) -> Option<GestureSink> {
        self.sink.clone()
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Cancels the loop and waits for it to finish.
    pub async fn shutdown(&mut self) -> Result<DispatchStats, DispatchError> {
        debug!("Sending shutdown signal to dispatcher");
        self.cancel.cancel();
        self.join().await
    }

    /// Drops the handle's own sender and waits until every producer has let
    /// go of its sink. Gestures still queued are dispatched first.
    pub async fn close(&mut self) -> Result<DispatchStats, DispatchError> {
        debug!("Closing dispatcher input");
        self.sink = None;
        self.join().await
    }

    async fn join(&mut self) -> Result<DispatchStats, DispatchError> {
        let Some(task) = self.task.take() else {
            debug!("Dispatcher already shut down");
            return Ok(DispatchStats::default());
        };

        match task.await {
            Ok(stats) => {
                info!("Dispatcher shut down: {:?}", stats);
                Ok(stats)
            }
            Err(e) => {
                error!("Dispatcher task panicked: {}", e);
                Err(DispatchError::ThreadError(format!(
                    "dispatcher task panicked: {}",
                    e
                )))
            }
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BindingConfig;
    use crate::gesture::GestureDescriptor;
    use crate::shortcut::{EdgeSettings, ShortcutSettings};

    #[tokio::test]
    async fn close_drains_queue_and_ends_with_last_producer() {
        let registry = BindingRegistry::new();
        let b = GestureDescriptor::device_button("b");
        registry
            .add(BindingConfig::new(
                "go",
                b.clone(),
                ShortcutSettings::Press(EdgeSettings::default()),
            ))
            .await
            .unwrap();

        let (action_tx, mut action_rx) = mpsc::channel(16);
        let mut handle =
            DispatcherHandle::spawn(registry, action_tx, DispatcherSettings::default()).unwrap();
        let producer = handle.sink().unwrap();
        for _ in 0..3 {
            assert!(producer.emit_activation(b.clone()));
        }
        drop(producer);

        let stats = handle.close().await.unwrap();
        assert_eq!(stats.gestures, 6);
        assert_eq!(stats.actions, 3);
        assert!(handle.sink().is_none());

        let mut fired = 0;
        while action_rx.recv().await.is_some() {
            fired += 1;
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn zero_capacity_or_interval_is_rejected() {
        let settings = DispatcherSettings {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        let settings = DispatcherSettings {
            stats_interval_secs: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        assert!(DispatcherSettings::default().validate().is_ok());
    }
}
