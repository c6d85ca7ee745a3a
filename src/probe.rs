use std::path::PathBuf;
use std::thread;

use crossbeam::{channel, select};

use crate::config::ProbeConfig;
use crate::connection::Connection;
use crate::frame;
use crate::ProbeError;

/// Resolve the port to test.
///
/// A supplied path is used verbatim, without validating it against the
/// candidate list or the filesystem. Otherwise each candidate is opened once
/// as a probe and the first that opens wins; candidates that cannot be opened
/// are skipped silently.
pub fn resolve_port(
    config: &ProbeConfig,
    supplied: Option<PathBuf>,
) -> Result<PathBuf, ProbeError> {
    if let Some(path) = supplied {
        return Ok(path);
    }
    for candidate in &config.candidates {
        match Connection::open(candidate, config.baud, config.probe_timeout) {
            Ok(probe) => {
                drop(probe);
                println!("Found working port: {}", candidate.display());
                return Ok(candidate.clone());
            }
            Err(err) => {
                log::debug!("candidate {} skipped: {err}", candidate.display());
            }
        }
    }
    Err(ProbeError::NoPortFound)
}

/// # Serial Probe
///
/// Runs the full diagnostic against the device:
/// 1. Resolves a serial port (explicit path or candidate auto-detection).
/// 2. Flushes stale data, sends the fixed test command once and prints
///    whatever comes back, trying JSON decoding line by line.
/// 3. Passively listens for the configured window and prints any further
///    incoming data as plain text.
///
/// Every step prints to stdout as it happens. The returned error is only the
/// reason the run could not continue; per-frame decode and parse problems are
/// reported inline and never end the run.
pub fn run(config: &ProbeConfig, supplied: Option<PathBuf>) -> Result<(), ProbeError> {
    let port = resolve_port(config, supplied)?;
    println!("Testing communication on {}", port.display());

    let mut conn = Connection::open(&port, config.baud, config.io_timeout)?;
    println!("Connected to {}", conn.path().display());

    round_trip(config, &mut conn)?;
    listen(config, &mut conn)?;

    drop(conn);
    println!("Test completed");
    Ok(())
}

/// One write-then-read exchange with the fixed test command.
fn round_trip(config: &ProbeConfig, conn: &mut Connection) -> Result<(), ProbeError> {
    conn.clear_buffers()?;

    let request = config.test_command.encode_line()?;
    conn.send(&request)?;
    println!(
        "Sent test command: {}",
        String::from_utf8_lossy(&request).trim_end()
    );

    // No early wake on data arrival. Give the controller time to answer.
    thread::sleep(config.settle_delay);

    if !conn.readable()? {
        println!("No data received");
        return Ok(());
    }

    let raw = conn.read_available()?;
    println!("Raw data received: {}", raw.escape_ascii());
    let decoded = frame::decode_lossy(&raw);
    println!("Decoded data: {decoded}");
    for line in frame::split_frames(&decoded) {
        match frame::parse_frame(line) {
            Ok(value) => println!("Valid JSON: {value}"),
            Err(err) => println!("JSON decode error: {err} for line: {line}"),
        }
    }
    Ok(())
}

/// Print everything that arrives during the listen window as plain text.
/// The loop runs the full window even if nothing ever arrives.
fn listen(config: &ProbeConfig, conn: &mut Connection) -> Result<(), ProbeError> {
    println!(
        "\nListening for data for {} seconds...",
        config.listen_window.as_secs()
    );
    let window = channel::after(config.listen_window);
    let ticker = channel::tick(config.poll_interval);
    loop {
        select! {
            recv(window) -> _ => return Ok(()),
            recv(ticker) -> _ => {
                if conn.readable()? {
                    let raw = conn.read_available()?;
                    let decoded = frame::decode_lossy(&raw);
                    println!("Received: {}", decoded.trim());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_candidates() -> ProbeConfig {
        ProbeConfig {
            candidates: vec![
                PathBuf::from("/dev/serial-probe-test-missing-0"),
                PathBuf::from("/dev/serial-probe-test-missing-1"),
            ],
            ..ProbeConfig::default()
        }
    }

    #[test]
    fn supplied_port_is_used_verbatim() {
        let config = unreachable_candidates();
        let supplied = PathBuf::from("/definitely/not/a/tty");
        let port = resolve_port(&config, Some(supplied.clone())).expect("supplied path wins");
        assert_eq!(port, supplied);
    }

    #[test]
    fn no_openable_candidate_is_a_hard_failure() {
        let config = unreachable_candidates();
        let err = resolve_port(&config, None).expect_err("nothing to find");
        assert!(matches!(err, ProbeError::NoPortFound));
    }

    #[test]
    fn run_with_bad_supplied_port_fails_at_open() {
        let config = unreachable_candidates();
        let err = run(&config, Some(PathBuf::from("/definitely/not/a/tty"))).expect_err("open fails");
        assert!(matches!(err, ProbeError::Io(_)));
    }
}
