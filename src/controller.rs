use crate::state::ControllerState;
use color_eyre::eyre::{eyre, Result};
use gilrs::{Axis, EventType, GamepadId, Gilrs};
use std::{sync::mpsc::Sender, time::Duration};
use tracing::{debug, info, warn};
use watch::{WatchReceiver, WatchSender};

/// Controller buttons with a meaning for camera control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    CycleCamera,
    ZoomOut,
    ZoomIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Primary,
    DPad,
}

/// A discrete input event, in the order it happened.
///
/// Axis coordinates follow the usual controller convention: positive `x` is
/// right and positive `y` is down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    ButtonPressed(Button),
    ButtonReleased(Button),
    AxisMoved { stick: Stick, x: f32, y: f32 },
}

/// Turns raw gilrs input into controller events, keeping track of the
/// current state of everything it has seen.
#[derive(Debug, Default)]
struct EventTranslator {
    state: ControllerState,
}

impl EventTranslator {
    fn button(&mut self, button: gilrs::Button, pressed: bool) -> Option<ControllerEvent> {
        let offset = if pressed { 1.0 } else { 0.0 };

        let (id, held) = match button {
            gilrs::Button::DPadUp => return self.dpad(None, Some(-offset)),
            gilrs::Button::DPadDown => return self.dpad(None, Some(offset)),
            gilrs::Button::DPadLeft => return self.dpad(Some(-offset), None),
            gilrs::Button::DPadRight => return self.dpad(Some(offset), None),
            gilrs::Button::South => (Button::ZoomOut, &mut self.state.zoom_out),
            gilrs::Button::East => (Button::ZoomIn, &mut self.state.zoom_in),
            gilrs::Button::West => (Button::CycleCamera, &mut self.state.cycle_camera),
            _ => return None,
        };

        // Only report edges.
        if *held == pressed {
            return None;
        }
        *held = pressed;

        Some(if pressed {
            ControllerEvent::ButtonPressed(id)
        } else {
            ControllerEvent::ButtonReleased(id)
        })
    }

    fn axis(&mut self, axis: Axis, value: f32) -> Option<ControllerEvent> {
        // gilrs reports up as positive.
        match axis {
            Axis::LeftStickX => self.state.stick_x = value,
            Axis::LeftStickY => self.state.stick_y = -value,
            Axis::DPadX => return self.dpad(Some(value), None),
            Axis::DPadY => return self.dpad(None, Some(-value)),
            _ => return None,
        }

        Some(ControllerEvent::AxisMoved {
            stick: Stick::Primary,
            x: self.state.stick_x,
            y: self.state.stick_y,
        })
    }

    fn dpad(&mut self, x: Option<f32>, y: Option<f32>) -> Option<ControllerEvent> {
        let previous = (self.state.dpad_x, self.state.dpad_y);

        if let Some(x) = x {
            self.state.dpad_x = x;
        }
        if let Some(y) = y {
            self.state.dpad_y = y;
        }

        if (self.state.dpad_x, self.state.dpad_y) == previous {
            return None;
        }

        Some(ControllerEvent::AxisMoved {
            stick: Stick::DPad,
            x: self.state.dpad_x,
            y: self.state.dpad_y,
        })
    }
}

/// Monitors input from a game controller, and reports events and state
/// changes.
pub struct ControllerMonitor {
    name_matches: Option<String>,
    gilrs: Gilrs,
    selected_gamepad: Option<GamepadId>,
    translator: EventTranslator,
    events: Option<Sender<ControllerEvent>>,
    state_sender: WatchSender<ControllerState>,
    state_receiver: WatchReceiver<ControllerState>,
}

impl ControllerMonitor {
    /// Create a new monitor. Only events from the first controller found whose
    /// name contains the given string will be monitored, or from the first
    /// controller found if no name is given.
    pub fn new(name_matches: Option<&str>) -> Result<Self> {
        let (state_sender, state_receiver) = watch::channel(ControllerState::default());
        let gilrs = Gilrs::new().map_err(|e| eyre!("failed to initialize game controller input: {e}"))?;

        Ok(Self {
            name_matches: name_matches.map(str::to_string),
            gilrs,
            selected_gamepad: None,
            translator: EventTranslator::default(),
            events: None,
            state_sender,
            state_receiver,
        })
    }

    /// Get a receiver for getting notified of state changes.
    pub fn state_receiver(&self) -> WatchReceiver<ControllerState> {
        self.state_receiver.clone()
    }

    /// Deliver controller events to the given channel.
    pub fn forward_events(&mut self, sender: Sender<ControllerEvent>) {
        self.events = Some(sender);
    }

    pub fn run(&mut self) {
        while let Some(event) = self.gilrs.next_event_blocking(Some(Duration::from_secs(1))) {
            // Re-select a gamepad whenever one is connected or disconnected.
            if let EventType::Connected | EventType::Disconnected = event.event {
                self.select_gamepad();
                continue;
            }

            if self.selected_gamepad != Some(event.id) {
                continue;
            }

            let translated = match event.event {
                EventType::ButtonPressed(button, ..) => self.translator.button(button, true),
                EventType::ButtonReleased(button, ..) => self.translator.button(button, false),
                EventType::AxisChanged(axis, value, ..) => self.translator.axis(axis, value),
                _ => None,
            };

            if let Some(translated) = translated {
                self.publish(translated);
            }
        }
    }

    fn publish(&mut self, event: ControllerEvent) {
        let state = &self.translator.state;
        self.state_sender.update(|current| current.clone_from(state));

        if let Some(sender) = &self.events {
            debug!(?event, "Controller event");

            if sender.send(event).is_err() {
                warn!("Dispatch loop has stopped, no longer forwarding controller events");
                self.events = None;
            }
        }
    }

    pub fn select_gamepad(&mut self) {
        info!("Discovering game controllers...");
        let mut selected = None;

        for (id, gamepad) in self.gilrs.gamepads() {
            info!("  {}", gamepad.name());

            let matches = self
                .name_matches
                .as_deref()
                .map_or(true, |name| gamepad.name().contains(name));

            if selected.is_none() && matches {
                selected = Some(id);
            }
        }

        if selected.is_none() {
            warn!("No matching game controller found, waiting for one to connect");
        }

        self.selected_gamepad = selected;
    }
}
