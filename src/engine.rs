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
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use thread_priority::{set_current_thread_priority, ThreadPriority};
use tracing::{debug, error, info, span, warn, Level};

use crate::{
    audio::{self, Clip},
    observer::{Observer, Registry},
};

/// The tempo the engine starts at and returns to whenever it is turned on.
pub const DEFAULT_BPM: u32 = 90;

/// The slowest tempo the engine accepts. Lower requests are clamped to this.
pub const MIN_BPM: u32 = 1;

/// Fired once per beat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Beat {
    /// Beats since the engine was last turned on, starting at 1.
    pub number: u64,
}

/// Fired whenever the tempo is set, including the reset when the engine turns on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempoChange {
    pub bpm: u32,
}

/// Clamps a requested tempo to the supported range.
pub fn clamp_bpm(bpm: i32) -> u32 {
    bpm.max(MIN_BPM as i32) as u32
}

/// The wait between beats at the given tempo. Never zero.
pub fn beat_period(bpm: u32) -> Duration {
    Duration::from_millis((60_000 / u64::from(bpm.max(MIN_BPM))).max(1))
}

/// State shared between the engine and its beat loop.
struct Shared {
    bpm: AtomicU32,
    running: AtomicBool,
    clip: RwLock<Arc<dyn Clip>>,
    beats: Registry<Beat>,
    tempo: Registry<TempoChange>,
    active_loops: AtomicUsize,
}

impl Shared {
    fn clip(&self) -> Arc<dyn Clip> {
        self.clip.read().clone()
    }
}

/// A running beat loop and the means to stop it.
struct BeatLoop {
    stop: Sender<()>,
    join: thread::JoinHandle<()>,
}

impl BeatLoop {
    fn spawn(shared: Arc<Shared>) -> BeatLoop {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        shared.active_loops.fetch_add(1, Ordering::SeqCst);
        let join = thread::spawn(move || {
            BeatLoop::run(&shared, stop_rx);
            shared.active_loops.fetch_sub(1, Ordering::SeqCst);
        });
        BeatLoop {
            stop: stop_tx,
            join,
        }
    }

    fn run(shared: &Shared, stop_rx: Receiver<()>) {
        let span = span!(Level::INFO, "beat loop");
        let _enter = span.enter();

        configure_beat_thread_priority();
        info!(bpm = shared.bpm.load(Ordering::Acquire), "Beat loop started.");

        let mut number: u64 = 0;
        while shared.running.load(Ordering::Acquire) {
            number += 1;
            shared.clip().play_from_start();
            shared.beats.notify_all(&Beat { number });

            // The tempo is sampled once per beat; a change lands on the next wait.
            let period = beat_period(shared.bpm.load(Ordering::Acquire));
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }

        info!(beats = number, "Beat loop stopped.");
    }

    /// Signals the loop and waits for it, unless called from the loop's own thread.
    fn stop(self) {
        drop(self.stop);
        if self.join.thread().id() == thread::current().id() {
            debug!("Beat loop stopped from inside a beat, not waiting for it.");
            return;
        }
        if self.join.join().is_err() {
            error!("Beat loop panicked.");
        }
    }
}

fn configure_beat_thread_priority() {
    if let Err(e) = set_current_thread_priority(ThreadPriority::Max) {
        debug!(err = ?e, "Unable to raise beat loop priority");
    }
}

/// Generates beats at a tempo and notifies observers.
///
/// The engine is the single owner of the tempo and the on/off state. Both live in atomics so
/// the beat loop can read them without locking.
pub struct TempoEngine {
    device: Arc<dyn audio::Device>,
    sample_path: PathBuf,
    shared: Arc<Shared>,
    beat_loop: Mutex<Option<BeatLoop>>,
}

impl TempoEngine {
    /// Creates a new engine that is off and silent until initialized.
    pub fn new(device: Arc<dyn audio::Device>, sample_path: impl Into<PathBuf>) -> TempoEngine {
        TempoEngine {
            device,
            sample_path: sample_path.into(),
            shared: Arc::new(Shared {
                bpm: AtomicU32::new(DEFAULT_BPM),
                running: AtomicBool::new(false),
                clip: RwLock::new(Arc::new(audio::SilentClip)),
                beats: Registry::new("beat"),
                tempo: Registry::new("tempo"),
                active_loops: AtomicUsize::new(0),
            }),
            beat_loop: Mutex::new(None),
        }
    }

    /// Loads the click sample. A failure leaves the engine silent but otherwise working.
    pub fn initialize(&self) {
        let span = span!(Level::INFO, "initialize engine");
        let _enter = span.enter();

        match self.device.load(&self.sample_path) {
            Ok(clip) => {
                info!(
                    device = self.device.to_string(),
                    sample = ?self.sample_path,
                    "Click sample ready."
                );
                *self.shared.clip.write() = clip;
            }
            Err(e) => {
                error!(
                    err = e.to_string(),
                    device = self.device.to_string(),
                    sample = ?self.sample_path,
                    "Unable to load click sample, beats will be silent."
                );
            }
        }
    }

    /// Resets the tempo to the default and starts the beat loop, replacing any running loop.
    pub fn turn_on(&self) {
        let previous = self.beat_loop.lock().take();
        if let Some(previous) = previous {
            debug!("Engine already on, restarting beat loop.");
            previous.stop();
        }

        self.shared.bpm.store(DEFAULT_BPM, Ordering::Release);
        self.notify_tempo(DEFAULT_BPM);
        self.shared.running.store(true, Ordering::Release);

        info!(bpm = DEFAULT_BPM, "Engine on.");
        let replaced = self
            .beat_loop
            .lock()
            .replace(BeatLoop::spawn(self.shared.clone()));
        if let Some(replaced) = replaced {
            replaced.stop();
        }
    }

    /// Halts the click and stops the beat loop. A beat already being delivered may finish and
    /// retrigger the clip, so it is halted again once the loop is gone.
    pub fn turn_off(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.clip().stop();

        let current = self.beat_loop.lock().take();
        if let Some(current) = current {
            current.stop();
            self.shared.clip().stop();
        }
        info!("Engine off.");
    }

    /// Sets the tempo, clamping anything below [`MIN_BPM`], and notifies tempo observers.
    pub fn set_bpm(&self, bpm: i32) {
        let clamped = clamp_bpm(bpm);
        if i64::from(clamped) != i64::from(bpm) {
            warn!(requested = bpm, bpm = clamped, "Tempo below minimum, clamping.");
        }

        self.shared.bpm.store(clamped, Ordering::Release);
        self.notify_tempo(clamped);
    }

    /// The last tempo set. This keeps its value while the engine is off.
    pub fn bpm(&self) -> u32 {
        self.shared.bpm.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn register_beat_observer(&self, observer: &Observer<Beat>) -> bool {
        self.shared.beats.add(observer)
    }

    pub fn remove_beat_observer(&self, observer: &Observer<Beat>) -> bool {
        self.shared.beats.remove(observer)
    }

    pub fn register_tempo_observer(&self, observer: &Observer<TempoChange>) -> bool {
        self.shared.tempo.add(observer)
    }

    pub fn remove_tempo_observer(&self, observer: &Observer<TempoChange>) -> bool {
        self.shared.tempo.remove(observer)
    }

    /// Number of beat loop threads currently alive.
    #[cfg(test)]
    pub(crate) fn active_loops(&self) -> usize {
        self.shared.active_loops.load(Ordering::SeqCst)
    }

    fn notify_tempo(&self, bpm: u32) {
        self.shared.tempo.notify_all(&TempoChange { bpm });
    }
}

impl Drop for TempoEngine {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(current) = self.beat_loop.get_mut().take() {
            current.stop();
        }
    }
}
