//! Device protocol producer
//!
//! Parses button tokens of the form `#<name>:<0|1>`, one per line, and emits
//! an activation when a button goes from pressed to released. A release
//! completes the activation; presses alone never emit. The activation reaches
//! the dispatcher as a pressed/released pulse, see [`Gesture::activation`].
//!
//! [`Gesture::activation`]: crate::gesture::Gesture::activation

use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::{GestureSink, ProducerError};
use crate::gesture::GestureDescriptor;

/// Parses one line into `(name, pressed)`. `None` for anything that is not a
/// well-formed button token.
pub fn parse_token(line: &str) -> Option<(&str, bool)> {
    let body = line.trim().strip_prefix('#')?;
    let (name, state) = body.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    match state {
        "0" => Some((name, false)),
        "1" => Some((name, true)),
        _ => None,
    }
}

pub struct DeviceProtocolProducer {
    sink: GestureSink,
    states: HashMap<String, bool>,
}

impl DeviceProtocolProducer {
    pub fn new(sink: GestureSink) -> Self {
        Self {
            sink,
            states: HashMap::new(),
        }
    }

    /// Handles every line of `input` and returns how many activations were
    /// emitted. Lines that do not parse are skipped.
    pub fn parse(&mut self, input: &str) -> usize {
        input
            .split('\n')
            .filter(|line| self.handle_line(line))
            .count()
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let Some((name, pressed)) = parse_token(line) else {
            if !line.trim().is_empty() {
                trace!("Ignoring unrecognized protocol line: {:?}", line);
            }
            return false;
        };

        let previous = self.states.get(name).copied().unwrap_or(false);
        let falling_edge = previous && !pressed;

        let emitted = if falling_edge {
            debug!("Device button '{}' released", name);
            self.sink
                .emit_activation(GestureDescriptor::device_button(name))
        } else {
            false
        };

        match self.states.get_mut(name) {
            Some(state) => *state = pressed,
            None => {
                self.states.insert(name.to_string(), pressed);
            }
        }

        emitted
    }

    /// Last observed state of a button token.
    pub fn state(&self, name: &str) -> Option<bool> {
        self.states.get(name).copied()
    }

    /// Forgets all button states, e.g. after the transport reconnected.
    pub fn reset(&mut self) {
        self.states.clear();
    }

    /// Reads lines from `reader` until EOF or cancellation.
    pub async fn run_reader<R>(
        &mut self,
        reader: R,
        cancel: CancellationToken,
    ) -> Result<(), ProducerError>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("Device protocol reader started");
        let mut lines = reader.lines();
        let mut total = 0usize;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Device protocol reader cancelled");
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => total += self.parse(&line),
                        None => {
                            info!("Device protocol stream ended");
                            break;
                        }
                    }
                }
            }
        }

        debug!("Device protocol reader emitted {} gestures", total);
        Ok(())
    }
}
