use crate::{command::Speed, quantize::Level};

/// Levels whose magnitude is below this are treated as the stick resting in
/// its neutral position.
pub const DEADZONE_LEVEL: u8 = 2;

/// Fraction of the camera's maximum velocity reached at full stick
/// deflection.
pub const DEFAULT_SPEED_SCALE: f32 = 0.25;

/// Velocity and step speed of a single D-pad nudge.
pub const NUDGE_VELOCITY: f32 = 0.1;
pub const NUDGE_STEP: u8 = 1;

/// Velocity and step speed used while a zoom button is held.
pub const ZOOM_VELOCITY: f32 = 0.8;
pub const ZOOM_STEP: u8 = 4;

/// What to do after an axis level has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoChange,
    Stop,
    Move(Level),
}

pub fn in_deadzone(level: Level) -> bool {
    level.magnitude() < DEADZONE_LEVEL
}

/// Decide the outcome of moving an axis from `previous` to `current`.
///
/// Moving between two levels that are both inside the deadzone is not a
/// change: the axis was already stopped when it entered the deadzone.
pub fn evaluate(previous: Level, current: Level) -> Outcome {
    if previous == current || (in_deadzone(previous) && in_deadzone(current)) {
        Outcome::NoChange
    } else if in_deadzone(current) {
        Outcome::Stop
    } else {
        Outcome::Move(current)
    }
}

/// Continuous velocity for a level, `(level / 10) * speed_scale`.
pub fn velocity(level: Level, speed_scale: f32) -> f32 {
    level.value() as f32 / 10.0 * speed_scale
}

/// Step speed for a level. The deadzone width is subtracted so that the
/// first level outside the deadzone maps to the slowest step.
pub fn step_speed(level: Level) -> u8 {
    level.magnitude().saturating_sub(DEADZONE_LEVEL)
}

/// Speed of a stick axis at the given level. Levels inside the deadzone
/// produce no motion.
pub fn stick_speed(level: Level, speed_scale: f32) -> Speed {
    if in_deadzone(level) {
        Speed::ZERO
    } else {
        Speed::new(velocity(level, speed_scale), step_speed(level))
    }
}

/// Fixed-size speed in the direction of `level`, used for the D-pad.
pub fn nudge_speed(level: Level) -> Speed {
    Speed::new(NUDGE_VELOCITY.copysign(level.value() as f32), NUDGE_STEP)
}

/// Zoom speed; `tele` zooms in, otherwise out.
pub fn zoom_speed(tele: bool) -> Speed {
    let velocity = if tele { ZOOM_VELOCITY } else { -ZOOM_VELOCITY };
    Speed::new(velocity, ZOOM_STEP)
}
