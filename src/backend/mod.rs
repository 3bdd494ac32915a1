use crate::{
    command::{AxisSelector, MotionCommand, MotionVector},
    config::{CameraTarget, Protocol},
};
use color_eyre::eyre::{Result, WrapErr};
use std::time::Duration;

mod onvif;
mod step;
mod wsse;

pub use onvif::OnvifBackend;
pub use step::StepBackend;

/// Sends motion commands to a single camera.
///
/// Implementations own the connection to their camera and are only ever
/// driven from one thread at a time. Calls block until the camera answers or
/// the request timeout elapses.
pub trait CommandBackend {
    /// Start moving the selected axes. The camera is expected to stop on its
    /// own after `timeout` if it supports it.
    fn continuous_move(
        &mut self,
        axis: AxisSelector,
        vector: MotionVector,
        timeout: Duration,
    ) -> Result<()>;

    /// Stop motion on the selected axes.
    fn stop(&mut self, axis: AxisSelector) -> Result<()>;

    fn execute(&mut self, command: &MotionCommand) -> Result<()> {
        match *command {
            MotionCommand::Move {
                axis,
                vector,
                timeout,
            } => self.continuous_move(axis, vector, timeout),
            MotionCommand::Stop { axis } => self.stop(axis),
        }
    }
}

/// A camera backend chosen by the configured protocol.
pub enum Backend {
    Onvif(OnvifBackend),
    Step(StepBackend),
}

impl Backend {
    pub fn connect(target: &CameraTarget, request_timeout: Duration) -> Result<Self> {
        match target.protocol() {
            Protocol::Onvif => OnvifBackend::connect(target, request_timeout).map(Self::Onvif),
            Protocol::Cgi => StepBackend::new(target, request_timeout).map(Self::Step),
        }
    }
}

impl CommandBackend for Backend {
    fn continuous_move(
        &mut self,
        axis: AxisSelector,
        vector: MotionVector,
        timeout: Duration,
    ) -> Result<()> {
        match self {
            Self::Onvif(backend) => backend.continuous_move(axis, vector, timeout),
            Self::Step(backend) => backend.continuous_move(axis, vector, timeout),
        }
    }

    fn stop(&mut self, axis: AxisSelector) -> Result<()> {
        match self {
            Self::Onvif(backend) => backend.stop(axis),
            Self::Step(backend) => backend.stop(axis),
        }
    }
}

/// Shorten a response body for inclusion in an error message.
fn excerpt(body: &str) -> &str {
    const MAX_LEN: usize = 200;

    let body = body.trim();
    match body.char_indices().nth(MAX_LEN) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

fn http_client(request_timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(request_timeout)
        .build()
        .wrap_err("failed to build http client")
}
