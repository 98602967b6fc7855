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
use std::{error::Error, io, path::PathBuf, sync::Arc};

use beatgen::{
    audio::{self, wav::SampleData, AudioError},
    config::Generator,
    controller::{keyboard, Controller},
    engine::TempoEngine,
};
use clap::{crate_version, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A beat generator."
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Starts the beat generator, reading commands from stdin.
    Start {
        /// The path to the generator configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Loads a click sample and prints its format.
    VerifySample {
        /// The path to the WAV file.
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Start { config: None }) {
        Commands::Start { config } => start(config)?,
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::VerifySample { path } => {
            let sample = SampleData::load(&path)?;
            println!(
                "{}: {} channel(s), {} Hz, {} frames, {:?}",
                path.display(),
                sample.channels(),
                sample.sample_rate(),
                sample.frames(),
                sample.duration(),
            );
        }
    }

    Ok(())
}

fn start(config_path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config = match config_path {
        Some(path) => Generator::deserialize(&path)?,
        None => Generator::default(),
    };

    let device = match audio::get_device(config.audio_device()) {
        Ok(device) => device,
        Err(e @ AudioError::NoDefaultDevice) => {
            warn!(err = e.to_string(), "Falling back to silent output.");
            Arc::new(audio::SilentDevice)
        }
        Err(e) => return Err(e.into()),
    };
    info!(device = device.to_string(), "Using audio device.");

    let engine = Arc::new(TempoEngine::new(device, config.sample()));
    let (controller, view) = Controller::with_terminal_view(engine, &config)?;

    let result = controller.run(Arc::new(keyboard::Driver::new()));
    view.close();
    println!();

    Ok(result?)
}
