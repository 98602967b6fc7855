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
    fmt,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, span, Level};

use super::{wav::SampleData, AudioError};

/// A cpal output device.
pub struct Device {
    name: String,
    host_id: cpal::HostId,
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_id.name())
    }
}

impl Device {
    /// Lists cpal output devices across all available hosts.
    pub fn list() -> Result<Vec<Device>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let name = match device.name() {
                    Ok(name) => name,
                    Err(e) => {
                        debug!(err = e.to_string(), "Skipping device without a name");
                        continue;
                    }
                };
                devices.push(Device {
                    name,
                    host_id,
                    device,
                });
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the named cpal device, or the default output of the default host for "default".
    pub fn get(name: &str) -> Result<Device, AudioError> {
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or(AudioError::NoDefaultDevice)?;
            return Ok(Device {
                name: device.name()?,
                host_id: host.id(),
                device,
            });
        }

        Device::list()?
            .into_iter()
            .find(|device| device.name.trim() == name)
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
    }
}

impl super::Device for Device {
    fn load(&self, path: &Path) -> Result<Arc<dyn super::Clip>, AudioError> {
        let supported = self.device.default_output_config()?;
        let config: cpal::StreamConfig = supported.config();

        let data = SampleData::load(path)?
            .transcode(config.sample_rate.0)?
            .with_channels(config.channels);

        Ok(Arc::new(Clip::start(
            self.device.clone(),
            config,
            supported.sample_format(),
            data.into_samples(),
        )?))
    }
}

/// Shared playback cursor over an in-memory sample.
struct Playback {
    samples: Vec<f32>,
    /// Index of the next sample to output. Equal to the sample count when idle.
    position: AtomicUsize,
}

impl Playback {
    fn new(samples: Vec<f32>) -> Playback {
        let end = samples.len();
        Playback {
            samples,
            position: AtomicUsize::new(end),
        }
    }

    /// Copies the next samples into the output, zero-filling past the end.
    fn fill(&self, output: &mut [f32]) {
        let start = self.position.load(Ordering::Acquire).min(self.samples.len());
        let end = (start + output.len()).min(self.samples.len());
        let read = end - start;

        output[..read].copy_from_slice(&self.samples[start..end]);
        output[read..].fill(0.0);

        // A failed exchange means the clip was rewound meanwhile; the next callback picks that up.
        let _ = self
            .position
            .compare_exchange(start, end, Ordering::AcqRel, Ordering::Relaxed);
    }

    fn rewind(&self) {
        self.position.store(0, Ordering::Release);
    }

    fn halt(&self) {
        self.position.store(self.samples.len(), Ordering::Release);
    }
}

/// A sample bound to a running cpal output stream.
///
/// cpal streams can't move between threads on every platform, so the stream lives on its own
/// output thread for as long as the clip exists.
pub struct Clip {
    playback: Arc<Playback>,
    shutdown: Option<Sender<()>>,
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Clip {
    fn start(
        device: cpal::Device,
        config: cpal::StreamConfig,
        sample_format: cpal::SampleFormat,
        samples: Vec<f32>,
    ) -> Result<Clip, AudioError> {
        let playback = Arc::new(Playback::new(samples));
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);

        let output_thread = {
            let playback = playback.clone();
            thread::spawn(move || {
                Clip::run_output(device, config, sample_format, playback, ready_tx, shutdown_rx)
            })
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Clip {
                playback,
                shutdown: Some(shutdown_tx),
                output_thread: Some(output_thread),
            }),
            Ok(Err(e)) => {
                let _ = output_thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = output_thread.join();
                Err(AudioError::OutputThread)
            }
        }
    }

    /// Builds and plays the stream, then holds it until the clip is dropped.
    fn run_output(
        device: cpal::Device,
        config: cpal::StreamConfig,
        sample_format: cpal::SampleFormat,
        playback: Arc<Playback>,
        ready_tx: Sender<Result<(), AudioError>>,
        shutdown_rx: Receiver<()>,
    ) {
        let span = span!(Level::INFO, "clip output (cpal)");
        let _enter = span.enter();

        let stream = match build_stream(&device, &config, sample_format, playback) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }

        info!(
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            format = ?sample_format,
            "Clip output stream started."
        );
        let _ = ready_tx.send(Ok(()));

        // Returns once the sender side is dropped.
        let _ = shutdown_rx.recv();
        info!("Clip output stream closing.");
    }
}

impl super::Clip for Clip {
    fn play_from_start(&self) {
        self.playback.rewind();
    }

    fn stop(&self) {
        self.playback.halt();
    }
}

impl Drop for Clip {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(output_thread) = self.output_thread.take() {
            if output_thread.join().is_err() {
                error!("Clip output thread panicked.");
            }
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    playback: Arc<Playback>,
) -> Result<cpal::Stream, AudioError> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, playback),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, playback),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, playback),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, playback),
        other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    playback: Arc<Playback>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            playback.fill(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = <T as cpal::Sample>::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

#[cfg(test)]
mod test {
    use super::Playback;

    #[test]
    fn test_playback_idle_until_rewound() {
        let playback = Playback::new(vec![0.5, 0.25, 0.125]);
        let mut output = vec![1.0; 4];

        playback.fill(&mut output);
        assert_eq!(vec![0.0; 4], output);

        playback.rewind();
        playback.fill(&mut output);
        assert_eq!(vec![0.5, 0.25, 0.125, 0.0], output);
    }

    #[test]
    fn test_playback_spans_callbacks() {
        let playback = Playback::new(vec![1.0, 2.0, 3.0]);
        let mut output = vec![0.0; 2];

        playback.rewind();
        playback.fill(&mut output);
        assert_eq!(vec![1.0, 2.0], output);
        playback.fill(&mut output);
        assert_eq!(vec![3.0, 0.0], output);
        playback.fill(&mut output);
        assert_eq!(vec![0.0, 0.0], output);
    }

    #[test]
    fn test_playback_halt() {
        let playback = Playback::new(vec![1.0, 2.0, 3.0]);
        let mut output = vec![0.0; 1];

        playback.rewind();
        playback.fill(&mut output);
        playback.halt();
        playback.fill(&mut output);
        assert_eq!(vec![0.0], output);
    }
}
