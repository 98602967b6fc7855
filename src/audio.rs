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
use std::{fmt, path::Path, sync::Arc};

pub mod cpal;
mod error;
pub mod mock;
pub mod wav;

pub use error::AudioError;

/// A loaded sample that can be retriggered from its first frame.
pub trait Clip: Send + Sync {
    /// Rewinds to frame zero and starts playing.
    fn play_from_start(&self);

    /// Rewinds to frame zero and halts playback.
    fn stop(&self);
}

/// An output that can load samples into playable clips.
pub trait Device: fmt::Display + Send + Sync {
    /// Loads the sample at the given path into a clip bound to this device.
    fn load(&self, path: &Path) -> Result<Arc<dyn Clip>, AudioError>;
}

/// A clip that plays nothing. Used when a sample could not be loaded.
pub struct SilentClip;

impl Clip for SilentClip {
    fn play_from_start(&self) {}

    fn stop(&self) {}
}

/// A device whose clips play nothing.
pub struct SilentDevice;

impl Device for SilentDevice {
    fn load(&self, _: &Path) -> Result<Arc<dyn Clip>, AudioError> {
        Ok(Arc::new(SilentClip))
    }
}

impl fmt::Display for SilentDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "silent")
    }
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, AudioError> {
    Ok(cpal::Device::list()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn Device> = Box::new(device);
            device
        })
        .collect())
}

/// Gets a device with the given name. Names starting with "mock" produce a mock device,
/// "silent" produces a device that plays nothing, and "default" is the host's default output.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, AudioError> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    }
    if name == "silent" {
        return Ok(Arc::new(SilentDevice));
    }

    Ok(Arc::new(cpal::Device::get(name)?))
}
