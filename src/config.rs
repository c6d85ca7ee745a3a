//! Fixed run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::frame::Command;

/// Baud rate of the device link.
pub const BAUD_RATE: u32 = 115200;

/// Device paths probed, in order, when no port is given on the command line.
pub const CANDIDATE_PORTS: [&str; 3] = ["/dev/ttyAMA0", "/dev/serial0", "/dev/ttyUSB0"];

/// The command sent once per run. Opcode 1001 asks the controller for a
/// status report.
pub const TEST_COMMAND: Command = Command { opcode: 1001 };

/// Immutable configuration for one probe run, built once at startup.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Baud rate for the detection probe and the test connection alike.
    pub baud: u32,
    /// Candidate device paths tried in order during auto-detection.
    pub candidates: Vec<PathBuf>,
    /// I/O deadline used when probing a candidate port.
    pub probe_timeout: Duration,
    /// I/O deadline on the test connection.
    pub io_timeout: Duration,
    /// Unconditional wait between sending the command and checking for a
    /// response.
    pub settle_delay: Duration,
    /// Total wall-clock duration of the passive listen phase.
    pub listen_window: Duration,
    /// Re-check cadence inside the passive listen phase.
    pub poll_interval: Duration,
    /// The command sent exactly once per run.
    pub test_command: Command,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            baud: BAUD_RATE,
            candidates: CANDIDATE_PORTS.iter().map(PathBuf::from).collect(),
            probe_timeout: Duration::from_secs(1),
            io_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_secs(1),
            listen_window: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            test_command: TEST_COMMAND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_follow_probe_order() {
        let config = ProbeConfig::default();
        assert_eq!(
            config.candidates,
            vec![
                PathBuf::from("/dev/ttyAMA0"),
                PathBuf::from("/dev/serial0"),
                PathBuf::from("/dev/ttyUSB0"),
            ]
        );
    }

    #[test]
    fn default_timing_matches_the_wire_contract() {
        let config = ProbeConfig::default();
        assert_eq!(config.baud, 115200);
        assert_eq!(config.listen_window, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }
}
