use statum::{machine, state};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::{GamepadBackend, GamepadState};
use super::GamepadSettings;
use crate::gesture::{GamepadAxis, Gesture, GestureDescriptor};
use crate::producer::GestureSink;

#[derive(Debug, Clone, Copy)]
struct Sample {
    state: GamepadState,
    at: Instant,
}

/// Observation made in one tick, in slot order.
#[derive(Debug, Clone, PartialEq)]
enum Observation {
    Axis(Gesture),
    Activation(GestureDescriptor),
}

#[state]
#[derive(Debug, Clone)]
pub enum PollerState {
    Initializing,
    Polling,
}

#[machine]
pub struct GamepadPoller<S: PollerState> {
    backend: Box<dyn GamepadBackend>,

    settings: GamepadSettings,

    // Last stored packet per slot; `None` until the slot delivers a baseline
    samples: Vec<Option<Sample>>,
}

impl<S: PollerState> GamepadPoller<S> {
    pub fn settings(&self) -> &GamepadSettings {
        &self.settings
    }
}

impl GamepadPoller<Initializing> {
    pub fn create(backend: Box<dyn GamepadBackend>, settings: GamepadSettings) -> Self {
        debug!(
            "Creating gamepad poller on backend '{}' with settings: {:?}",
            backend.name(),
            settings
        );
        let samples = vec![None; settings.slots as usize];
        Self::new(backend, settings, samples)
    }

    pub fn initialize(self) -> GamepadPoller<Polling> {
        info!(
            "Gamepad poller ready: {} slots every {}ms on '{}'",
            self.settings.slots,
            self.settings.poll_interval_ms,
            self.backend.name()
        );
        self.transition()
    }
}

impl GamepadPoller<Polling> {
    /// Reads every slot once and returns the gestures observed in this tick.
    /// Each activation appears as its pressed/released pulse.
    pub fn tick(&mut self, now: Instant) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        for observation in self.observe(now) {
            match observation {
                Observation::Axis(gesture) => gestures.push(gesture),
                Observation::Activation(descriptor) => {
                    gestures.extend(Gesture::activation(descriptor));
                }
            }
        }
        gestures
    }

    fn observe(&mut self, now: Instant) -> Vec<Observation> {
        self.backend.begin_tick();

        let mut observations = Vec::new();
        for slot in 0..self.settings.slots {
            match self.backend.state(slot) {
                Ok(Some(state)) => self.diff_slot(slot, state, now, &mut observations),
                Ok(None) => {
                    if self.samples[slot as usize].take().is_some() {
                        info!("Gamepad {} disconnected", slot);
                    }
                }
                Err(e) => {
                    debug!("Skipping gamepad slot {} this tick: {}", slot, e);
                    continue;
                }
            }

            match self.backend.next_keystroke(slot) {
                Ok(Some(keystroke)) if keystroke.key_up => {
                    debug!("Gamepad {} {:?} activated", slot, keystroke.button);
                    observations.push(Observation::Activation(
                        GestureDescriptor::gamepad_button(slot, keystroke.button),
                    ));
                }
                Ok(_) => {}
                Err(e) => debug!("Failed to read keystroke of slot {}: {}", slot, e),
            }
        }

        observations
    }

    fn diff_slot(
        &mut self,
        slot: u8,
        state: GamepadState,
        now: Instant,
        out: &mut Vec<Observation>,
    ) {
        let entry = &mut self.samples[slot as usize];

        let Some(previous) = *entry else {
            info!("Gamepad {} connected (packet {})", slot, state.packet_number);
            *entry = Some(Sample { state, at: now });
            return;
        };
        if previous.state.packet_number == state.packet_number {
            return;
        }

        let delta_time = now.saturating_duration_since(previous.at);
        for axis in GamepadAxis::ALL {
            let (old, new) = (previous.state.axis(axis), state.axis(axis));
            if old == new {
                continue;
            }
            out.push(Observation::Axis(Gesture::axis(
                GestureDescriptor::gamepad_axis(slot, axis),
                axis.normalize(new),
                axis.normalize_delta(old, new),
                delta_time,
            )));
        }

        *entry = Some(Sample { state, at: now });
    }

    /// Polls at the configured cadence until `cancel` fires.
    pub fn run_polling_loop(&mut self, sink: &GestureSink, cancel: &CancellationToken) {
        let interval = Duration::from_millis(self.settings.poll_interval_ms);
        let stats_interval = Duration::from_secs(self.settings.stats_interval_secs);
        info!("Starting gamepad polling loop ({}ms interval)", interval.as_millis());

        let mut ticks = 0u64;
        let mut emitted = 0u64;
        let mut last_stats = Instant::now();

        while !cancel.is_cancelled() {
            let started = Instant::now();

            for observation in self.observe(started) {
                // Nothing may leave the producer once stop was requested
                if cancel.is_cancelled() {
                    break;
                }
                let queued = match observation {
                    Observation::Axis(gesture) => sink.emit(gesture),
                    Observation::Activation(descriptor) => sink.emit_activation(descriptor),
                };
                if queued {
                    emitted += 1;
                }
            }
            ticks += 1;

            if last_stats.elapsed() > stats_interval {
                info!(
                    "Gamepad poller stats: {} ticks, {} gestures in last {} seconds",
                    ticks,
                    emitted,
                    stats_interval.as_secs()
                );
                ticks = 0;
                emitted = 0;
                last_stats = Instant::now();
            }

            std::thread::sleep(interval.saturating_sub(started.elapsed()));
        }

        info!("Gamepad polling loop stopped");
    }
}
