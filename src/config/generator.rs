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
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::decay::{
    DecayState, DEFAULT_DECAY_FACTOR, DEFAULT_DECAY_INTERVAL, DEFAULT_DECAY_MINIMUM,
    MAX_INTENSITY,
};

use super::error::ConfigError;

const DEFAULT_SAMPLE: &str = "clap.wav";
const DEFAULT_AUDIO_DEVICE: &str = "default";

/// The configuration for the beat generator.
#[derive(Deserialize, Clone, Default)]
pub struct Generator {
    /// The click sample to play on each beat.
    sample: Option<String>,

    /// The audio device to play the sample on.
    audio_device: Option<String>,

    /// How the beat indicator fades.
    decay: Option<Decay>,

    /// Whether the terminal view draws the beat bar.
    render: Option<bool>,
}

impl Generator {
    /// Parse a generator configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Generator, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Generator>()?)
    }

    /// The click sample path (default: clap.wav).
    pub fn sample(&self) -> PathBuf {
        PathBuf::from(self.sample.as_deref().unwrap_or(DEFAULT_SAMPLE))
    }

    /// The audio device name (default: the default output device).
    pub fn audio_device(&self) -> &str {
        self.audio_device.as_deref().unwrap_or(DEFAULT_AUDIO_DEVICE)
    }

    pub fn decay(&self) -> Decay {
        self.decay.clone().unwrap_or_default()
    }

    pub fn render(&self) -> bool {
        self.render.unwrap_or(true)
    }

    pub fn set_render(&mut self, render: bool) {
        self.render = Some(render);
    }
}

/// The decay settings for the beat indicator.
#[derive(Deserialize, Clone, Default)]
pub struct Decay {
    /// Time between decay ticks (default: 25ms).
    interval: Option<String>,

    /// Multiplier applied on each tick (default: 0.75).
    factor: Option<f64>,

    /// Intensity the indicator never decays below (default: 0).
    minimum: Option<f64>,
}

impl Decay {
    /// The time between decay ticks. Zero is rejected, the indicator would never wait.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        let interval = match &self.interval {
            Some(interval) => {
                let parsed: Duration = DurationString::from_string(interval.clone())
                    .map_err(|e| ConfigError::InvalidDuration(interval.clone(), e.to_string()))?
                    .into();
                if parsed.is_zero() {
                    return Err(ConfigError::ZeroDecayInterval(interval.clone()));
                }
                parsed
            }
            None => DEFAULT_DECAY_INTERVAL,
        };
        Ok(interval)
    }

    /// Builds a resting decay state from the factor and minimum.
    pub fn state(&self) -> Result<DecayState, ConfigError> {
        let factor = self.factor.unwrap_or(DEFAULT_DECAY_FACTOR);
        if !(factor > 0.0 && factor < 1.0) {
            return Err(ConfigError::InvalidDecayFactor(factor));
        }

        let minimum = self.minimum.unwrap_or(DEFAULT_DECAY_MINIMUM);
        if !(0.0..=MAX_INTENSITY).contains(&minimum) {
            return Err(ConfigError::InvalidDecayMinimum(minimum));
        }

        Ok(DecayState::new(factor, minimum))
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, path::PathBuf, time::Duration};

    use config::{Config, File, FileFormat};

    use crate::config::ConfigError;

    use super::Generator;

    fn parse(yaml: &str) -> Result<Generator, Box<dyn Error>> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Generator>()?)
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let generator = parse("{}")?;
        assert_eq!(PathBuf::from("clap.wav"), generator.sample());
        assert_eq!("default", generator.audio_device());
        assert!(generator.render());

        let decay = generator.decay();
        assert_eq!(Duration::from_millis(25), decay.interval()?);
        let mut state = decay.state()?;
        assert_eq!(0.0, state.intensity());
        state.reset();
        state.decay();
        assert_eq!(75.0, state.intensity());
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), Box<dyn Error>> {
        let generator = parse(
            r#"
            sample: sounds/rimshot.wav
            audio_device: mock-device
            render: false
            decay:
              interval: 50ms
              factor: 0.5
              minimum: 10
            "#,
        )?;
        assert_eq!(PathBuf::from("sounds/rimshot.wav"), generator.sample());
        assert_eq!("mock-device", generator.audio_device());
        assert!(!generator.render());

        let decay = generator.decay();
        assert_eq!(Duration::from_millis(50), decay.interval()?);
        let mut state = decay.state()?;
        assert_eq!(10.0, state.intensity());
        state.reset();
        state.decay();
        assert_eq!(50.0, state.intensity());
        Ok(())
    }

    #[test]
    fn test_invalid_decay() -> Result<(), Box<dyn Error>> {
        let generator = parse("decay:\n  interval: soon\n")?;
        assert!(matches!(
            generator.decay().interval(),
            Err(ConfigError::InvalidDuration(_, _))
        ));

        let generator = parse("decay:\n  interval: 0ms\n")?;
        assert!(matches!(
            generator.decay().interval(),
            Err(ConfigError::ZeroDecayInterval(_))
        ));

        let generator = parse("decay:\n  factor: 1.5\n")?;
        assert!(matches!(
            generator.decay().state(),
            Err(ConfigError::InvalidDecayFactor(_))
        ));

        let generator = parse("decay:\n  minimum: -1\n")?;
        assert!(matches!(
            generator.decay().state(),
            Err(ConfigError::InvalidDecayMinimum(_))
        ));
        Ok(())
    }

    #[test]
    fn test_deserialize_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("beatgen.yaml");
        fs::write(&path, "sample: click.wav\naudio_device: silent\n")?;

        let generator = Generator::deserialize(&path)?;
        assert_eq!(PathBuf::from("click.wav"), generator.sample());
        assert_eq!("silent", generator.audio_device());
        Ok(())
    }

    #[test]
    fn test_deserialize_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Generator::deserialize(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
