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
use std::{io, sync::Arc, thread::JoinHandle};

use crossbeam_channel::Sender;
use tracing::{error, info, span, warn, Level};

use crate::{
    config::{ConfigError, Generator},
    engine::{TempoEngine, DEFAULT_BPM},
    view::TerminalView,
};

pub mod keyboard;

/// Controller events that will trigger behavior in the engine.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Turns the engine on at the default tempo.
    Start,

    /// Turns the engine off.
    Stop,

    /// Raises the tempo by one beat per minute.
    IncreaseBpm,

    /// Lowers the tempo by one beat per minute.
    DecreaseBpm,

    /// Sets the tempo from user-entered text. Unparseable text falls back to the default.
    SetBpm(String),

    /// Stops the engine and ends the controller.
    Quit,
}

/// The enable/disable surface the controller drives on a view.
pub trait View: Send + Sync {
    fn enable_start(&self);
    fn disable_start(&self);
    fn enable_stop(&self);
    fn disable_stop(&self);
}

/// A source of controller events.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Routes user intents to the engine and keeps the view's controls in step.
pub struct Controller {
    engine: Arc<TempoEngine>,
    view: Arc<dyn View>,
}

impl Controller {
    /// Creates a controller, puts the view in its initial state, and initializes the engine.
    pub fn new(engine: Arc<TempoEngine>, view: Arc<dyn View>) -> Controller {
        view.disable_stop();
        view.enable_start();
        engine.initialize();
        Controller { engine, view }
    }

    /// Creates a terminal view from the configuration, attaches it to the engine, and builds a
    /// controller around it.
    pub fn with_terminal_view(
        engine: Arc<TempoEngine>,
        config: &Generator,
    ) -> Result<(Controller, Arc<TerminalView>), ConfigError> {
        let decay = config.decay();
        let view = Arc::new(TerminalView::new(
            decay.state()?,
            decay.interval()?,
            config.render(),
        ));
        view.attach(&engine);

        let controller = Controller::new(engine, view.clone());
        Ok((controller, view))
    }

    pub fn start(&self) {
        self.engine.turn_on();
        self.view.disable_start();
        self.view.enable_stop();
    }

    pub fn stop(&self) {
        self.engine.turn_off();
        self.view.disable_stop();
        self.view.enable_start();
    }

    pub fn increase_bpm(&self) {
        let bpm = self.current_bpm();
        self.engine.set_bpm(bpm.saturating_add(1));
    }

    pub fn decrease_bpm(&self) {
        let bpm = self.current_bpm();
        self.engine.set_bpm(bpm.saturating_sub(1));
    }

    pub fn set_bpm(&self, bpm: i32) {
        self.engine.set_bpm(bpm);
    }

    /// Sets the tempo from user-entered text. Empty or non-numeric input uses the default tempo.
    pub fn set_bpm_from_input(&self, input: &str) {
        let input = input.trim();
        let bpm = if input.is_empty() {
            DEFAULT_BPM as i32
        } else {
            match input.parse::<i32>() {
                Ok(bpm) => bpm,
                Err(e) => {
                    warn!(
                        input,
                        err = e.to_string(),
                        default = DEFAULT_BPM,
                        "Invalid tempo, using the default."
                    );
                    DEFAULT_BPM as i32
                }
            }
        };
        self.set_bpm(bpm);
    }

    /// Applies a single event. Returns false once the controller should stop.
    pub fn handle(&self, event: Event) -> bool {
        match event {
            Event::Start => self.start(),
            Event::Stop => self.stop(),
            Event::IncreaseBpm => self.increase_bpm(),
            Event::DecreaseBpm => self.decrease_bpm(),
            Event::SetBpm(input) => self.set_bpm_from_input(&input),
            Event::Quit => return false,
        }
        true
    }

    /// Runs events from the driver until it quits or closes, then turns the engine off.
    pub fn run(&self, driver: Arc<dyn Driver>) -> Result<(), io::Error> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, events_rx) = crossbeam_channel::bounded(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(bpm = self.engine.bpm(), "Controller started.");

        loop {
            match events_rx.recv() {
                Ok(event) => {
                    info!(event = format!("{:?}", event), "Received event.");
                    if !self.handle(event) {
                        break;
                    }
                }
                Err(_) => {
                    info!("Event driver closed.");
                    break;
                }
            }
        }

        if self.engine.is_running() {
            self.stop();
        }
        info!("Controller closing.");

        // Dropping the receiver unblocks a driver waiting to send.
        drop(events_rx);
        match join_handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Event driver panicked.");
                Err(io::Error::new(io::ErrorKind::Other, "event driver panicked"))
            }
        }
    }

    fn current_bpm(&self) -> i32 {
        i32::try_from(self.engine.bpm()).unwrap_or(i32::MAX)
    }
}

#[cfg(test)]
mod test {
    use std::{
        io,
        sync::Arc,
        thread::{self, JoinHandle},
    };

    use crossbeam_channel::Sender;
    use parking_lot::Mutex;

    use crate::{audio::mock, config::Generator, engine::TempoEngine};

    use super::{Controller, Driver, Event, View};

    #[derive(Default)]
    struct RecordingView {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingView {
        fn take(&self) -> Vec<&'static str> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl View for RecordingView {
        fn enable_start(&self) {
            self.calls.lock().push("enable_start");
        }

        fn disable_start(&self) {
            self.calls.lock().push("disable_start");
        }

        fn enable_stop(&self) {
            self.calls.lock().push("enable_stop");
        }

        fn disable_stop(&self) {
            self.calls.lock().push("disable_stop");
        }
    }

    /// Sends a fixed list of events, then closes.
    struct ScriptedDriver {
        events: Mutex<Vec<Event>>,
    }

    impl ScriptedDriver {
        fn new(events: Vec<Event>) -> ScriptedDriver {
            ScriptedDriver {
                events: Mutex::new(events),
            }
        }
    }

    impl Driver for ScriptedDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = std::mem::take(&mut *self.events.lock());
            thread::spawn(move || {
                for event in events {
                    if events_tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    fn controller() -> (Controller, Arc<TempoEngine>, Arc<RecordingView>, mock::Device) {
        let device = mock::Device::get("mock");
        let engine = Arc::new(TempoEngine::new(Arc::new(device.clone()), "click.wav"));
        let view = Arc::new(RecordingView::default());
        let controller = Controller::new(engine.clone(), view.clone());
        (controller, engine, view, device)
    }

    #[test]
    fn test_initial_view_state() {
        let (_controller, _, view, _) = controller();
        assert_eq!(vec!["disable_stop", "enable_start"], view.take());
    }

    #[test]
    fn test_start_and_stop() {
        let (controller, engine, view, device) = controller();
        view.take();

        controller.start();
        assert!(engine.is_running());
        assert_eq!(vec!["disable_start", "enable_stop"], view.take());

        controller.stop();
        assert!(!engine.is_running());
        assert_eq!(vec!["disable_stop", "enable_start"], view.take());
        assert!(device.clip().stops() >= 1);
        assert!(!device.clip().is_playing());
    }

    #[test]
    fn test_increase_three_times() {
        let (controller, engine, _, _) = controller();
        controller.start();
        assert_eq!(90, engine.bpm());

        controller.increase_bpm();
        controller.increase_bpm();
        controller.increase_bpm();
        assert_eq!(93, engine.bpm());
        controller.stop();
    }

    #[test]
    fn test_decrease_stops_at_minimum() {
        let (controller, engine, _, _) = controller();
        controller.set_bpm(2);
        controller.decrease_bpm();
        assert_eq!(1, engine.bpm());
        controller.decrease_bpm();
        assert_eq!(1, engine.bpm());
    }

    #[test]
    fn test_set_bpm_from_input() {
        let (controller, engine, _, _) = controller();

        controller.set_bpm_from_input("120");
        assert_eq!(120, engine.bpm());

        controller.set_bpm_from_input(" 75 ");
        assert_eq!(75, engine.bpm());

        controller.set_bpm_from_input("");
        assert_eq!(90, engine.bpm());

        controller.set_bpm_from_input("120");
        controller.set_bpm_from_input("fast");
        assert_eq!(90, engine.bpm());

        controller.set_bpm_from_input("-3");
        assert_eq!(1, engine.bpm());
    }

    #[test]
    fn test_run_scripted_events() -> Result<(), io::Error> {
        let (controller, engine, view, _) = controller();
        view.take();

        let driver = Arc::new(ScriptedDriver::new(vec![
            Event::Start,
            Event::IncreaseBpm,
            Event::IncreaseBpm,
            Event::SetBpm("100".to_string()),
            Event::DecreaseBpm,
            Event::Quit,
            Event::Start,
        ]));
        controller.run(driver)?;

        assert_eq!(99, engine.bpm());
        assert!(!engine.is_running());
        assert_eq!(
            vec!["disable_start", "enable_stop", "disable_stop", "enable_start"],
            view.take()
        );
        Ok(())
    }

    #[test]
    fn test_run_stops_engine_when_driver_closes() -> Result<(), io::Error> {
        let (controller, engine, _, _) = controller();
        controller.run(Arc::new(ScriptedDriver::new(vec![Event::Start])))?;
        assert!(!engine.is_running());
        Ok(())
    }

    #[test]
    fn test_with_terminal_view() {
        let device = mock::Device::get("mock");
        let engine = Arc::new(TempoEngine::new(Arc::new(device.clone()), "click.wav"));
        let mut config = Generator::default();
        config.set_render(false);

        let (controller, view) = Controller::with_terminal_view(engine.clone(), &config).unwrap();
        assert!(view.is_start_enabled());
        assert!(!view.is_stop_enabled());

        controller.start();
        assert_eq!("Current BPM: 90", view.label());
        assert!(view.is_stop_enabled());

        controller.stop();
        view.close();
    }
}
