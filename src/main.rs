use clap::Parser;
use color_eyre::eyre::Result;
use std::{path::PathBuf, sync::mpsc, thread, time::Duration};
use tracing_subscriber::EnvFilter;

mod backend;
mod command;
mod config;
mod controller;
mod dispatch;
mod policy;
mod quantize;
mod roster;
mod signals;
mod state;
#[cfg(test)]
mod testing;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML file listing the cameras to control
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the buttons and axes of the controller instead of controlling
    /// cameras
    #[arg(long)]
    show_joystick: bool,

    /// Only use a controller whose name contains this string
    #[arg(long)]
    controller: Option<String>,

    /// Fraction of the camera's maximum speed reached at full stick deflection
    #[arg(long, default_value_t = policy::DEFAULT_SPEED_SCALE, value_parser = parse_speed_scale)]
    speed_scale: f32,
}

/// Accept a speed scale in `(0, 1]`.
fn parse_speed_scale(value: &str) -> Result<f32, String> {
    let scale: f32 = value.parse().map_err(|e| format!("{e}"))?;

    if scale > 0.0 && scale <= 1.0 {
        Ok(scale)
    } else {
        Err(format!("{value} is not in the range (0, 1]"))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = Args::parse();
    signals::exit_on_termination()?;

    // Cameras are connected before the controller is opened.
    let session = if args.show_joystick {
        None
    } else {
        let config = config::Config::load(&args.config)?;
        let roster = roster::CameraRoster::connect(&config.cameras, config.request_timeout())?;
        let settings = dispatch::Settings {
            speed_scale: args.speed_scale,
            move_timeout: config.move_timeout(),
            stop_on_switch: config.stop_on_switch,
        };

        Some(dispatch::ControlSession::new(roster, settings))
    };

    let mut controller_monitor = controller::ControllerMonitor::new(args.controller.as_deref())?;
    controller_monitor.select_gamepad();

    match session {
        Some(mut session) => {
            let (sender, receiver) = mpsc::channel();
            controller_monitor.forward_events(sender);
            thread::spawn(move || session.run(receiver));
        }
        None => {
            let mut receiver = controller_monitor.state_receiver();
            thread::spawn(move || loop {
                thread::sleep(Duration::from_secs(2));
                println!("{}", receiver.get());
            });
        }
    }

    loop {
        controller_monitor.run();
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_scale_defaults_to_a_quarter() {
        let args = Args::try_parse_from(["joystick-ptz"]).unwrap();
        assert_eq!(args.speed_scale, policy::DEFAULT_SPEED_SCALE);
    }

    #[test]
    fn speed_scale_must_be_a_fraction() {
        assert_eq!(parse_speed_scale("0.5"), Ok(0.5));
        assert_eq!(parse_speed_scale("1"), Ok(1.0));
        assert!(parse_speed_scale("0").is_err());
        assert!(parse_speed_scale("-0.25").is_err());
        assert!(parse_speed_scale("4.5").is_err());
        assert!(parse_speed_scale("NaN").is_err());
        assert!(parse_speed_scale("fast").is_err());

        assert!(Args::try_parse_from(["joystick-ptz", "--speed-scale", "0"]).is_err());
        assert!(Args::try_parse_from(["joystick-ptz", "--speed-scale", "0.5"]).is_ok());
    }
}
