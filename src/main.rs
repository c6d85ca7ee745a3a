use std::path::PathBuf;

use clap::Parser;
use serial_probe::{ProbeConfig, ProbeError};

/// Round-trip test for the JSON-over-serial device link.
#[derive(Parser)]
#[command(name = "serial-probe", version)]
struct Cli {
    /// Device path to test; skips auto-detection.
    port: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = ProbeConfig::default();

    // Failures are reported on stdout like every other diagnostic; the
    // process still exits normally.
    match serial_probe::run(&config, cli.port) {
        Ok(()) => {}
        Err(ProbeError::NoPortFound) => {
            println!("No working serial port found. Please specify port manually:");
            println!("    serial-probe /dev/ttyAMA0");
        }
        Err(err) => println!("Error: {err}"),
    }
}
