use crate::{
    backend::CommandBackend,
    command::{AxisSelector, MotionCommand, MotionVector, Speed},
    controller::{Button, ControllerEvent, Stick},
    policy::{self, Outcome},
    quantize::{quantize, AxisTracker},
    roster::CameraRoster,
};
use std::{sync::mpsc::Receiver, time::Duration};
use tracing::{error, info};

/// Tuning of the control loop.
#[derive(Debug, Clone)]
pub struct Settings {
    pub speed_scale: f32,
    pub move_timeout: Duration,
    pub stop_on_switch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed_scale: policy::DEFAULT_SPEED_SCALE,
            move_timeout: Duration::from_secs(10),
            stop_on_switch: false,
        }
    }
}

/// State of the control loop: the cameras, which one is active, and the last
/// level seen on each axis of the primary stick.
pub struct ControlSession<B> {
    roster: CameraRoster<B>,
    pan: AxisTracker,
    tilt: AxisTracker,
    settings: Settings,
}

impl<B: CommandBackend> ControlSession<B> {
    pub fn new(roster: CameraRoster<B>, settings: Settings) -> Self {
        Self {
            roster,
            pan: AxisTracker::default(),
            tilt: AxisTracker::default(),
            settings,
        }
    }

    /// Handle events until the sending side of the channel goes away.
    ///
    /// Each event is handled to completion, including any request sent to a
    /// camera, before the next one is taken from the channel. A slow camera
    /// therefore delays every event queued behind it; requests are bounded by
    /// the backend's timeout and never cancelled early.
    pub fn run(&mut self, events: Receiver<ControllerEvent>) {
        info!(
            camera = self.roster.active().name(),
            cameras = self.roster.len(),
            "Running..."
        );

        for event in events {
            self.handle(event);
        }

        info!("Controller input closed, stopping dispatch");
    }

    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::ButtonPressed(Button::CycleCamera) => self.cycle_camera(),
            ControllerEvent::ButtonReleased(Button::CycleCamera) => {}
            ControllerEvent::ButtonPressed(Button::ZoomOut) => {
                info!("Zoom out button pushed");
                self.zoom(false);
            }
            ControllerEvent::ButtonReleased(Button::ZoomOut) => {
                info!("Zoom out button released");
                self.send(MotionCommand::Stop {
                    axis: AxisSelector::Zoom,
                });
            }
            ControllerEvent::ButtonPressed(Button::ZoomIn) => {
                info!("Zoom in button pushed");
                self.zoom(true);
            }
            ControllerEvent::ButtonReleased(Button::ZoomIn) => {
                info!("Zoom in button released");
                self.send(MotionCommand::Stop {
                    axis: AxisSelector::Zoom,
                });
            }
            ControllerEvent::AxisMoved {
                stick: Stick::Primary,
                x,
                y,
            } => self.handle_stick(x, y),
            ControllerEvent::AxisMoved {
                stick: Stick::DPad,
                x,
                y,
            } => self.handle_dpad(x, y),
        }
    }

    fn cycle_camera(&mut self) {
        if self.settings.stop_on_switch {
            self.send(MotionCommand::Stop {
                axis: AxisSelector::PanTilt,
            });
            self.send(MotionCommand::Stop {
                axis: AxisSelector::Zoom,
            });

            // Let a stick that is still held start moving the next camera.
            self.pan = AxisTracker::default();
            self.tilt = AxisTracker::default();
        }

        let index = self.roster.select_next();
        info!(
            index,
            camera = self.roster.active().name(),
            "Changed camera"
        );
    }

    fn zoom(&mut self, tele: bool) {
        self.send(MotionCommand::Move {
            axis: AxisSelector::Zoom,
            vector: MotionVector::zoom(policy::zoom_speed(tele)),
            timeout: self.settings.move_timeout,
        });
    }

    fn handle_stick(&mut self, x: f32, y: f32) {
        let pan = outcome(&mut self.pan, x);
        let tilt = outcome(&mut self.tilt, y);

        if pan == Outcome::Stop {
            info!("Pan stopped");
            self.send(MotionCommand::Stop {
                axis: AxisSelector::Pan,
            });
        }

        if tilt == Outcome::Stop {
            info!("Tilt stopped");
            self.send(MotionCommand::Stop {
                axis: AxisSelector::Tilt,
            });
        }

        // Both axes travel in one command, so a change on either of them
        // sends the current speed of both.
        if matches!(pan, Outcome::Move(_)) || matches!(tilt, Outcome::Move(_)) {
            let speed_scale = self.settings.speed_scale;
            let pan_speed = policy::stick_speed(self.pan.previous(), speed_scale);
            let tilt_speed = policy::stick_speed(self.tilt.previous(), speed_scale);

            let axis = match (pan_speed.is_zero(), tilt_speed.is_zero()) {
                (false, false) => AxisSelector::PanTilt,
                (false, true) => AxisSelector::Pan,
                _ => AxisSelector::Tilt,
            };

            info!(
                pan = pan_speed.velocity,
                tilt = tilt_speed.velocity,
                "Moving"
            );
            self.send(MotionCommand::Move {
                axis,
                vector: MotionVector::pan_tilt(pan_speed, tilt_speed),
                timeout: self.settings.move_timeout,
            });
        }
    }

    fn handle_dpad(&mut self, x: f32, y: f32) {
        let x = quantize(x);
        let y = quantize(y);

        if policy::in_deadzone(x) && policy::in_deadzone(y) {
            info!("Pan/tilt stopped");
            self.send(MotionCommand::Stop {
                axis: AxisSelector::PanTilt,
            });
            return;
        }

        if !policy::in_deadzone(x) {
            info!(right = x.value() > 0, "Nudging pan");
            self.send(MotionCommand::Move {
                axis: AxisSelector::Pan,
                vector: MotionVector::pan_tilt(policy::nudge_speed(x), Speed::ZERO),
                timeout: self.settings.move_timeout,
            });
        }

        if !policy::in_deadzone(y) {
            info!(down = y.value() > 0, "Nudging tilt");
            self.send(MotionCommand::Move {
                axis: AxisSelector::Tilt,
                vector: MotionVector::pan_tilt(Speed::ZERO, policy::nudge_speed(y)),
                timeout: self.settings.move_timeout,
            });
        }
    }

    /// Send a command to the active camera. Failures are logged and otherwise
    /// ignored.
    fn send(&mut self, command: MotionCommand) {
        let camera = self.roster.active_mut();

        if let Err(e) = camera.backend_mut().execute(&command) {
            error!(
                camera = camera.name(),
                command = command.name(),
                "Failed to send {} command: {:#}",
                command.name(),
                e
            );
        }
    }
}

fn outcome(tracker: &mut AxisTracker, sample: f32) -> Outcome {
    match tracker.transition(quantize(sample)) {
        Some((previous, current)) => policy::evaluate(previous, current),
        None => Outcome::NoChange,
    }
}
