use std::time::Duration;

/// Which motion axes a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSelector {
    Pan,
    Tilt,
    Zoom,
    PanTilt,
}

impl AxisSelector {
    pub fn includes_pan(self) -> bool {
        matches!(self, Self::Pan | Self::PanTilt)
    }

    pub fn includes_tilt(self) -> bool {
        matches!(self, Self::Tilt | Self::PanTilt)
    }

    pub fn includes_zoom(self) -> bool {
        matches!(self, Self::Zoom)
    }
}

/// Speed of a single axis, expressed for both kinds of camera backend.
///
/// `velocity` is the signed continuous velocity in `[-1.0, 1.0]`; `step` is
/// the unsigned speed argument used by step-action cameras. The direction of
/// a step request is taken from the sign of `velocity`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    pub velocity: f32,
    pub step: u8,
}

impl Speed {
    pub const ZERO: Speed = Speed {
        velocity: 0.0,
        step: 0,
    };

    pub fn new(velocity: f32, step: u8) -> Self {
        Self { velocity, step }
    }

    pub fn is_zero(&self) -> bool {
        self.velocity == 0.0
    }
}

/// Speeds of all three axes. Positive values mean right, down and zoom in
/// (tele), following the controller's axis convention.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionVector {
    pub pan: Speed,
    pub tilt: Speed,
    pub zoom: Speed,
}

impl MotionVector {
    pub fn pan_tilt(pan: Speed, tilt: Speed) -> Self {
        Self {
            pan,
            tilt,
            zoom: Speed::ZERO,
        }
    }

    pub fn zoom(zoom: Speed) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }
}

/// A single request to a camera.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionCommand {
    Move {
        axis: AxisSelector,
        vector: MotionVector,
        timeout: Duration,
    },
    Stop {
        axis: AxisSelector,
    },
}

impl MotionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Stop { .. } => "stop",
        }
    }
}
