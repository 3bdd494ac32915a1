use color_eyre::eyre::{Result, WrapErr};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM},
    iterator::Signals,
};
use std::{process, thread};

/// Exit the process as soon as a termination signal arrives.
///
/// Cameras are not told to stop, so one that is moving keeps moving until
/// its continuous move times out.
pub fn exit_on_termination() -> Result<()> {
    let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM, SIGQUIT])
        .wrap_err("failed to register signal handlers")?;

    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            println!("\nreceived signal: {}", signal_name(signal));
            process::exit(0);
        }
    });

    Ok(())
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGHUP => "SIGHUP",
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGQUIT => "SIGQUIT",
        _ => "unknown",
    }
}
