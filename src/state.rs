use std::fmt;

/// Raw state of every button and axis the controller monitor tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub cycle_camera: bool,
    pub zoom_out: bool,
    pub zoom_in: bool,
    pub stick_x: f32,
    pub stick_y: f32,
    pub dpad_x: f32,
    pub dpad_y: f32,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Buttons: cycle={} zoom_out={} zoom_in={}",
            self.cycle_camera, self.zoom_out, self.zoom_in
        )?;
        write!(
            f,
            "Axis: stick=({:.2}, {:.2}) dpad=({:.2}, {:.2})",
            self.stick_x, self.stick_y, self.dpad_x, self.dpad_y
        )
    }
}
