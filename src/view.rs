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

//! The terminal rendering collaborator: a decaying beat bar and a tempo label.

use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    controller::View,
    decay::{DecayIndicator, DecayState, MAX_INTENSITY},
    engine::{Beat, TempoChange, TempoEngine},
    observer::Observer,
};

/// Label shown before the engine has reported a tempo.
pub const OFFLINE_LABEL: &str = "offline";

const BAR_WIDTH: usize = 20;

/// The text for the tempo label. A tempo of zero reads as offline.
pub fn tempo_label(bpm: u32) -> String {
    if bpm == 0 {
        OFFLINE_LABEL.to_string()
    } else {
        format!("Current BPM: {}", bpm)
    }
}

/// Redraws `line` on the terminal row above the cursor, then puts the cursor back where it was.
/// The row the cursor is on belongs to the command prompt and whatever the user is typing.
pub fn redraw_above_prompt(line: &str) -> String {
    format!("\x1b7\x1b[1A\r{}\x1b[K\x1b8", line)
}

/// Renders the bar and label as a single line.
pub fn render_line(intensity: f64, label: &str, width: usize) -> String {
    let filled = ((intensity / MAX_INTENSITY).clamp(0.0, 1.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {}",
        "#".repeat(filled),
        " ".repeat(width - filled),
        label
    )
}

/// Renders beats and tempo to a terminal.
///
/// The view observes the engine's beat and tempo channels. A beat resets its decay state; the
/// decay indicator pulls it back down and redraws the line on each tick. The line is drawn on
/// the row above the keyboard prompt so typed commands are never overwritten.
pub struct TerminalView {
    label: Arc<RwLock<String>>,
    start_enabled: AtomicBool,
    stop_enabled: AtomicBool,
    decay: Arc<Mutex<DecayState>>,
    indicator: Mutex<DecayIndicator>,
    beat_observer: Observer<Beat>,
    tempo_observer: Observer<TempoChange>,
}

impl TerminalView {
    /// Creates a view that draws to stdout, or draws nothing if `render` is false.
    pub fn new(state: DecayState, interval: Duration, render: bool) -> TerminalView {
        let out: Option<Box<dyn Write + Send>> = if render {
            Some(Box::new(io::stdout()))
        } else {
            None
        };
        TerminalView::with_output(state, interval, out)
    }

    /// Creates a view that draws to the given writer, if any.
    pub fn with_output(
        state: DecayState,
        interval: Duration,
        out: Option<Box<dyn Write + Send>>,
    ) -> TerminalView {
        let label = Arc::new(RwLock::new(OFFLINE_LABEL.to_string()));
        let decay = Arc::new(Mutex::new(state));

        let indicator = {
            let label = label.clone();
            let out = out.map(Mutex::new);
            DecayIndicator::start(decay.clone(), interval, move |intensity| {
                if let Some(out) = out.as_ref() {
                    let line = render_line(intensity, &label.read(), BAR_WIDTH);
                    let redraw = redraw_above_prompt(&line);
                    let mut out = out.lock();
                    if let Err(e) = out.write_all(redraw.as_bytes()).and_then(|_| out.flush()) {
                        debug!(err = e.to_string(), "Unable to draw beat bar");
                    }
                }
            })
        };

        let beat_observer = {
            let decay = decay.clone();
            Observer::new("terminal view beat bar", move |_: &Beat| decay.lock().reset())
        };
        let tempo_observer = {
            let label = label.clone();
            Observer::new("terminal view tempo label", move |e: &TempoChange| {
                *label.write() = tempo_label(e.bpm);
            })
        };

        TerminalView {
            label,
            start_enabled: AtomicBool::new(false),
            stop_enabled: AtomicBool::new(false),
            decay,
            indicator: Mutex::new(indicator),
            beat_observer,
            tempo_observer,
        }
    }

    /// Registers this view on both of the engine's channels.
    pub fn attach(&self, engine: &TempoEngine) {
        engine.register_beat_observer(&self.beat_observer);
        engine.register_tempo_observer(&self.tempo_observer);
    }

    /// Removes this view from both of the engine's channels.
    pub fn detach(&self, engine: &TempoEngine) {
        engine.remove_beat_observer(&self.beat_observer);
        engine.remove_tempo_observer(&self.tempo_observer);
    }

    pub fn label(&self) -> String {
        self.label.read().clone()
    }

    pub fn intensity(&self) -> f64 {
        self.decay.lock().intensity()
    }

    pub fn is_start_enabled(&self) -> bool {
        self.start_enabled.load(Ordering::SeqCst)
    }

    pub fn is_stop_enabled(&self) -> bool {
        self.stop_enabled.load(Ordering::SeqCst)
    }

    /// Stops the decay indicator. Rendering stops with it.
    pub fn close(&self) {
        self.indicator.lock().stop();
        info!("Terminal view closed.");
    }
}

impl View for TerminalView {
    fn enable_start(&self) {
        debug!("Start enabled.");
        self.start_enabled.store(true, Ordering::SeqCst);
    }

    fn disable_start(&self) {
        debug!("Start disabled.");
        self.start_enabled.store(false, Ordering::SeqCst);
    }

    fn enable_stop(&self) {
        debug!("Stop enabled.");
        self.stop_enabled.store(true, Ordering::SeqCst);
    }

    fn disable_stop(&self) {
        debug!("Stop disabled.");
        self.stop_enabled.store(false, Ordering::SeqCst);
    }
}
