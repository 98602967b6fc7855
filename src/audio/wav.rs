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

//! In-memory WAV samples.
//!
//! Click samples are short, so they are decoded entirely into memory and shaped to the
//! output device's rate and channel layout once, at load time.

use std::{fmt, path::Path, time::Duration};

use hound::WavReader;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::{debug, info};

use super::AudioError;

/// Frames fed to the resampler per call.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Decoded, interleaved f32 sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleData {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SampleData {
    /// Creates sample data from interleaved samples.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> SampleData {
        SampleData {
            samples,
            channels,
            sample_rate,
        }
    }

    /// Reads a WAV file entirely into memory, scaling integer formats to [-1.0, 1.0].
    pub fn load(path: &Path) -> Result<SampleData, AudioError> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(AudioError::UnsupportedFormat(format!(
                        "{}-bit integer samples",
                        spec.bits_per_sample
                    )));
                }
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|sample| sample as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let data = SampleData::new(samples, spec.channels, spec.sample_rate);
        info!(
            path = ?path,
            channels = data.channels,
            sample_rate = data.sample_rate,
            duration_ms = data.duration().as_millis(),
            "Sample loaded"
        );
        Ok(data)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Resamples to the target rate. The result has exactly `ceil(frames * ratio)` frames,
    /// aligned to the source with the resampler's delay removed.
    pub fn transcode(self, target_rate: u32) -> Result<SampleData, AudioError> {
        if self.sample_rate == target_rate
            || self.sample_rate == 0
            || self.channels == 0
            || self.samples.is_empty()
        {
            return Ok(self);
        }

        debug!(
            source_rate = self.sample_rate,
            target_rate, "Transcoding sample"
        );

        let source_rate = self.sample_rate;
        let resampling_failed = |e: &dyn fmt::Display| {
            AudioError::ResamplingFailed(source_rate, target_rate, e.to_string())
        };

        let channels = self.channels as usize;
        let frames = self.frames();
        let ratio = target_rate as f64 / source_rate as f64;
        let target_frames = (frames as f64 * ratio).ceil() as usize;

        let sinc_params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 128,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler =
            SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, channels)
                .map_err(|e| resampling_failed(&e))?;

        let delay = resampler.output_delay();
        let planar = to_planar(&self.samples, channels);
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(delay + target_frames); channels];
        let mut scratch = resampler.output_buffer_allocate(true);

        let mut position = 0;
        while position < frames {
            let end = (position + resampler.input_frames_next()).min(frames);
            let block: Vec<&[f32]> = planar.iter().map(|c| &c[position..end]).collect();

            let (_, produced) = if end - position == resampler.input_frames_next() {
                resampler.process_into_buffer(&block[..], &mut scratch, None)
            } else {
                resampler.process_partial_into_buffer(Some(&block[..]), &mut scratch, None)
            }
            .map_err(|e| resampling_failed(&e))?;

            push_planar(&mut output, &scratch, produced);
            position = end;
        }

        // Flush the tail still held inside the resampler.
        while output[0].len() < delay + target_frames {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut scratch, None)
                .map_err(|e| resampling_failed(&e))?;
            if produced == 0 {
                break;
            }
            push_planar(&mut output, &scratch, produced);
        }

        let aligned: Vec<Vec<f32>> = output
            .into_iter()
            .map(|channel| {
                let mut channel: Vec<f32> =
                    channel.into_iter().skip(delay).take(target_frames).collect();
                channel.resize(target_frames, 0.0);
                channel
            })
            .collect();

        Ok(SampleData::new(
            to_interleaved(&aligned, target_frames),
            self.channels,
            target_rate,
        ))
    }

    /// Maps the sample onto a different channel count. Downmixing to mono averages all
    /// source channels; otherwise output channel `n` takes source channel `n % channels`.
    pub fn with_channels(self, target_channels: u16) -> SampleData {
        if self.channels == target_channels || self.channels == 0 || target_channels == 0 {
            return self;
        }

        let source = self.channels as usize;
        let target = target_channels as usize;
        let mut output = Vec::with_capacity(self.frames() * target);

        for frame in self.samples.chunks_exact(source) {
            if target == 1 {
                output.push(frame.iter().sum::<f32>() / source as f32);
            } else {
                output.extend((0..target).map(|channel| frame[channel % source]));
            }
        }

        SampleData::new(output, target_channels, self.sample_rate)
    }

    /// Consumes the data, returning the interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Splits interleaved samples into one buffer per channel.
fn to_planar(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }
    planar
}

/// Interleaves per-channel buffers of equal length.
fn to_interleaved(planar: &[Vec<f32>], frames: usize) -> Vec<f32> {
    let mut samples = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        samples.extend(planar.iter().map(|channel| channel[frame]));
    }
    samples
}

fn push_planar(output: &mut [Vec<f32>], block: &[Vec<f32>], frames: usize) {
    for (channel, produced) in output.iter_mut().zip(block) {
        channel.extend_from_slice(&produced[..frames]);
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::{audio::AudioError, testutil::write_wav};

    use super::{to_interleaved, to_planar, SampleData};

    #[test]
    fn test_load_int_wav() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = write_wav(tempdir.path(), "click.wav", 44100, 2, 441).unwrap();

        let data = SampleData::load(&path).unwrap();
        assert_eq!(2, data.channels());
        assert_eq!(44100, data.sample_rate());
        assert_eq!(441, data.frames());
        assert!(data.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
        assert_eq!(10, data.duration().as_millis());
    }

    #[test]
    fn test_load_missing_file() {
        let result = SampleData::load(&PathBuf::from("definitely/not/here.wav"));
        assert!(matches!(result, Err(AudioError::Wav(_))));
    }

    #[test]
    fn test_transcode_length() {
        let data = SampleData::new(vec![0.5; 4410], 1, 44100);
        let result = data.transcode(48000).unwrap();

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(expected_len, result.frames());
        assert_eq!(48000, result.sample_rate());
    }

    #[test]
    fn test_transcode_preserves_channels() {
        let frames = 4410;
        let mut samples = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            samples.extend([0.5, -0.5]);
        }
        let result = SampleData::new(samples, 2, 44100).transcode(48000).unwrap();

        assert_eq!(2, result.channels());
        let middle = result.frames() / 2;
        let left = result.samples()[middle * 2];
        let right = result.samples()[middle * 2 + 1];
        assert!((left - 0.5).abs() < 0.05, "left channel was {}", left);
        assert!((right + 0.5).abs() < 0.05, "right channel was {}", right);
    }

    #[test]
    fn test_transcode_same_rate_is_untouched() {
        let data = SampleData::new(vec![0.1, 0.2, 0.3], 1, 48000);
        assert_eq!(data.clone(), data.transcode(48000).unwrap());
    }

    #[test]
    fn test_planar_round_trip() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = to_planar(&samples, 2);
        assert_eq!(vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]], planar);
        assert_eq!(samples, to_interleaved(&planar, 3));
    }

    #[test]
    fn test_mono_to_stereo() {
        let data = SampleData::new(vec![0.1, 0.2, 0.3], 1, 48000);
        let result = data.with_channels(2);

        assert_eq!(2, result.channels());
        assert_eq!(vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3], result.into_samples());
    }

    #[test]
    fn test_stereo_to_mono() {
        let data = SampleData::new(vec![1.0, 0.0, 0.5, 0.5], 2, 48000);
        let result = data.with_channels(1);

        assert_eq!(vec![0.5, 0.5], result.into_samples());
    }
}
