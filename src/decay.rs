// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

/// Intensity a beat resets the indicator to.
pub const MAX_INTENSITY: f64 = 100.0;

pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_millis(25);
pub const DEFAULT_DECAY_FACTOR: f64 = 0.75;
pub const DEFAULT_DECAY_MINIMUM: f64 = 0.0;

/// The displayed intensity of the beat indicator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayState {
    intensity: f64,
    factor: f64,
    minimum: f64,
}

impl DecayState {
    /// Creates a state resting at the minimum.
    pub fn new(factor: f64, minimum: f64) -> DecayState {
        DecayState {
            intensity: minimum,
            factor,
            minimum,
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Applies one decay step, never dropping below the minimum.
    pub fn decay(&mut self) {
        self.intensity = (self.intensity * self.factor).max(self.minimum);
    }

    /// Jumps back to full intensity.
    pub fn reset(&mut self) {
        self.intensity = MAX_INTENSITY;
    }
}

impl Default for DecayState {
    fn default() -> Self {
        DecayState::new(DEFAULT_DECAY_FACTOR, DEFAULT_DECAY_MINIMUM)
    }
}

/// Drives a shared [`DecayState`] from its own thread at a fixed interval.
///
/// The indicator knows nothing about beats. Whoever owns the state resets it; the
/// indicator only decays it and reports the new value to its tick hook.
pub struct DecayIndicator {
    stop: Option<Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl DecayIndicator {
    /// Starts decaying the state every `interval`, calling `on_tick` with the new intensity.
    pub fn start<F>(state: Arc<Mutex<DecayState>>, interval: Duration, on_tick: F) -> DecayIndicator
    where
        F: Fn(f64) + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let join = thread::spawn(move || {
            let span = span!(Level::INFO, "decay indicator");
            let _enter = span.enter();

            info!(interval = format!("{:?}", interval), "Decay indicator started.");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }

                let intensity = {
                    let mut state = state.lock();
                    state.decay();
                    state.intensity()
                };
                on_tick(intensity);
            }
            info!("Decay indicator stopped.");
        });

        DecayIndicator {
            stop: Some(stop_tx),
            join: Some(join),
        }
    }

    /// Stops the decay thread and waits for it to exit.
    pub fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("Decay indicator thread panicked.");
            }
        }
    }
}

impl Drop for DecayIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}
