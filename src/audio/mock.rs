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
    fmt, io,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use tracing::{debug, info, span, Level};

use super::AudioError;

/// A mock device. Doesn't actually play anything, but keeps track of what it was asked to do.
#[derive(Clone)]
pub struct Device {
    name: String,
    clip: Arc<Clip>,
    fail_loads: bool,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            clip: Arc::new(Clip::default()),
            fail_loads: false,
        }
    }

    /// Gets a mock device that refuses to load any sample.
    pub fn failing(name: &str) -> Device {
        Device {
            fail_loads: true,
            ..Device::get(name)
        }
    }

    /// The clip handed out by every successful load.
    pub fn clip(&self) -> Arc<Clip> {
        self.clip.clone()
    }
}

impl super::Device for Device {
    fn load(&self, path: &Path) -> Result<Arc<dyn super::Clip>, AudioError> {
        let span = span!(Level::INFO, "load sample (mock)");
        let _enter = span.enter();

        if self.fail_loads {
            return Err(AudioError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mock device {} refuses to load {}", self.name, path.display()),
            )));
        }

        info!(device = self.name, path = ?path, "Loading sample.");
        Ok(self.clip.clone())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

/// A mock clip that counts how often it was triggered and stopped.
#[derive(Default)]
pub struct Clip {
    plays: AtomicUsize,
    stops: AtomicUsize,
    playing: AtomicBool,
}

impl Clip {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl super::Clip for Clip {
    fn play_from_start(&self) {
        debug!("Mock clip played.");
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        debug!("Mock clip stopped.");
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}
