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
    io,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;
use tracing::{info, span, warn, Level};

use super::Event;

const START: &str = "start";
const STOP: &str = "stop";
const INCREASE: &str = "+";
const INCREASE_WORD: &str = "up";
const DECREASE: &str = "-";
const DECREASE_WORD: &str = "down";
const SET: &str = "set";
const QUIT: &str = "quit";

/// A controller that drives the engine from line-based keyboard input.
#[derive(Default)]
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one command and forwards it. Returns false when input has ended, the user quit,
    /// or nobody is listening anymore.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "\nCommand ({}, {}, {}/{}, {}/{}, {} <bpm>, {}): ",
            START, STOP, INCREASE, INCREASE_WORD, DECREASE, DECREASE_WORD, SET, QUIT,
        )?;
        writer.flush()?;

        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            info!("Keyboard input closed.");
            let _ = events_tx.send(Event::Quit);
            return Ok(false);
        }

        let input = input.trim().to_lowercase();
        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (input.as_str(), ""),
        };

        let event = match command {
            START => Event::Start,
            STOP => Event::Stop,
            INCREASE | INCREASE_WORD => Event::IncreaseBpm,
            DECREASE | DECREASE_WORD => Event::DecreaseBpm,
            SET => Event::SetBpm(argument.to_string()),
            QUIT => Event::Quit,
            "" => return Ok(true),
            _ => {
                warn!(input, "Unrecognized input");
                return Ok(true);
            }
        };

        let keep_going = event != Event::Quit;
        if events_tx.send(event).is_err() {
            return Ok(false);
        }
        Ok(keep_going)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use crate::controller::{keyboard::*, Event};

    use super::Driver;

    fn get_event(input: &str) -> Result<(bool, Option<Event>), io::Error> {
        let (sender, receiver) = crossbeam_channel::bounded::<Event>(1);

        let reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let keep_going = Driver::monitor_io(&sender, reader, &mut writer)?;
        // The prompt starts its own row so the beat bar can be drawn on the row above it.
        assert!(String::from_utf8_lossy(&writer).starts_with("\nCommand ("));

        // Force the sender to close.
        drop(sender);
        Ok((keep_going, receiver.recv().ok()))
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!((true, Some(Event::Start)), get_event(START)?);
        assert_eq!((true, Some(Event::Stop)), get_event("STOP\n")?);
        assert_eq!((true, Some(Event::IncreaseBpm)), get_event(INCREASE)?);
        assert_eq!((true, Some(Event::IncreaseBpm)), get_event(INCREASE_WORD)?);
        assert_eq!((true, Some(Event::DecreaseBpm)), get_event(DECREASE)?);
        assert_eq!((true, Some(Event::DecreaseBpm)), get_event(DECREASE_WORD)?);
        assert_eq!(
            (true, Some(Event::SetBpm("120".to_string()))),
            get_event("set 120\n")?
        );
        assert_eq!(
            (true, Some(Event::SetBpm(String::new()))),
            get_event("set\n")?
        );
        assert_eq!((false, Some(Event::Quit)), get_event(QUIT)?);
        Ok(())
    }

    #[test]
    fn test_ignored_input() -> Result<(), io::Error> {
        assert_eq!((true, None), get_event("unrecognized\n")?);
        assert_eq!((true, None), get_event("\n")?);
        Ok(())
    }

    #[test]
    fn test_end_of_input_quits() -> Result<(), io::Error> {
        assert_eq!((false, Some(Event::Quit)), get_event("")?);
        Ok(())
    }

    #[test]
    fn test_closed_receiver_stops() -> Result<(), io::Error> {
        let (sender, receiver) = crossbeam_channel::bounded::<Event>(1);
        drop(receiver);
        let keep_going = Driver::monitor_io(&sender, BufReader::new(START.as_bytes()), io::sink())?;
        assert!(!keep_going);
        Ok(())
    }
}
