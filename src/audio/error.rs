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
/// Error types for loading samples and driving output devices.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Resampling from {0} Hz to {1} Hz failed: {2}")]
    ResamplingFailed(u32, u32, String),

    #[error("No output device found with name {0}")]
    DeviceNotFound(String),

    #[error("No default output device available")]
    NoDefaultDevice,

    #[error("Audio host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    #[error("Unable to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Unable to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("Unable to get default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unable to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Unable to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Output thread exited before the stream started")]
    OutputThread,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
