use std::{
    fs::File,
    io::{self, Error, Read, Write},
    os::fd::{AsRawFd, BorrowedFd, FromRawFd},
    path::Path,
    time::Instant,
};

use nix::{
    errno::Errno,
    poll::{PollFd, PollFlags, PollTimeout},
};
use termios::os::target::speed_t;
use termios::{cfmakeraw, cfsetspeed, tcflush, tcsetattr, Termios, TCIOFLUSH, TCSANOW};

/// Map a numeric baud rate to the termios speed constant.
pub fn baud_flag(baud: u32) -> io::Result<speed_t> {
    match baud {
        9600 => Ok(termios::B9600),
        19200 => Ok(termios::B19200),
        38400 => Ok(termios::B38400),
        57600 => Ok(termios::os::target::B57600),
        115200 => Ok(termios::os::target::B115200),
        _ => Err(Error::other(format!("unsupported baud rate: {baud}"))),
    }
}

/// Open the device under the given path for non-blocking direct I/O and
/// configure the TTY for raw mode at the given baud rate.
///
/// # Safety
///
/// The fd passed to `from_raw_fd` is owned and open because we get it
/// straight from the fcntl::open call.
pub fn port_open(path: impl AsRef<Path>, baud: u32) -> io::Result<File> {
    use nix::fcntl::OFlag;
    use nix::sys::stat::Mode;

    let oflag =
        // Open for reading and writing.
        OFlag::O_RDWR |
        // Do not make the device the controlling terminal for the process.
        OFlag::O_NOCTTY |
        // Return without blocking for the device to be ready or available.
        OFlag::O_NONBLOCK |
        OFlag::O_NDELAY;

    let fd = nix::fcntl::open(path.as_ref(), oflag, Mode::empty())?;
    let file = unsafe { File::from_raw_fd(fd) };

    let mut termios = Termios::from_fd(file.as_raw_fd())?;
    cfmakeraw(&mut termios);
    cfsetspeed(&mut termios, baud_flag(baud)?)?;
    tcsetattr(file.as_raw_fd(), TCSANOW, &termios)?;

    Ok(file)
}

/// Discard everything queued in both the input and output directions.
pub fn port_flush(port: &File) -> io::Result<()> {
    tcflush(port.as_raw_fd(), TCIOFLUSH)
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum PollKind {
    ForRead,
    ForWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum PollStatus {
    TimedOut,
    ReadReady,
    WriteReady,
}

/// Poll the port for readiness.
///
/// With a deadline the call blocks until the port becomes ready or the
/// deadline passes. Without one it reports the current state immediately.
///
/// # Safety
///
/// The fd remains open and valid for the duration of the returned BorrowedFd
/// because we borrow it from the `&File` only for the duration of the call.
pub fn port_poll(port: &File, poll: PollKind, deadline: Option<Instant>) -> io::Result<PollStatus> {
    let fd = unsafe { BorrowedFd::borrow_raw(port.as_raw_fd()) };
    let timeout = match deadline {
        Some(deadline) => {
            let time_left = deadline.saturating_duration_since(Instant::now());
            PollTimeout::try_from(time_left).unwrap_or(PollTimeout::ZERO)
        }
        None => PollTimeout::ZERO,
    };
    let input_flags = match poll {
        PollKind::ForRead => {
            PollFlags::POLLIN | PollFlags::POLLPRI | PollFlags::POLLRDNORM | PollFlags::POLLRDBAND
        }
        PollKind::ForWrite => PollFlags::POLLOUT | PollFlags::POLLWRNORM | PollFlags::POLLWRBAND,
    };
    let mut pollfd = [PollFd::new(fd, input_flags)];
    match nix::poll::poll(&mut pollfd, timeout) {
        // Upon failure, poll() shall return -1 and set errno to indicate the error.
        Err(errno) => Err(Error::from(errno)),
        // Upon successful completion, poll() shall return a non-negative value.
        Ok(rc) if rc < 0 => Err(Error::from(Errno::last())),
        // A value of 0 indicates that the call timed out.
        Ok(0) => Ok(PollStatus::TimedOut),
        // A positive value indicates how many pollfd structures have selected events.
        Ok(_) => {
            let revents = match pollfd[0].revents() {
                Some(flags) => flags,
                None => return Ok(PollStatus::TimedOut),
            };

            if revents.intersects(PollFlags::POLLHUP) {
                return Err(Error::other("POLLHUP: Device has been disconnected"));
            }
            if revents.intersects(PollFlags::POLLNVAL) {
                return Err(Error::other("POLLNVAL: Invalid fd member"));
            }
            if revents.intersects(PollFlags::POLLERR) {
                return Err(Error::other("POLLERR: An error has occurred"));
            }

            let pf_write_ready =
                PollFlags::POLLOUT | PollFlags::POLLWRNORM | PollFlags::POLLWRBAND;
            if revents.intersects(pf_write_ready) {
                return Ok(PollStatus::WriteReady);
            }

            let pf_read_ready = PollFlags::POLLIN
                | PollFlags::POLLRDNORM
                | PollFlags::POLLRDBAND
                | PollFlags::POLLPRI;
            if revents.intersects(pf_read_ready) {
                return Ok(PollStatus::ReadReady);
            }

            log::warn!("poll returned ready with undocumented revents: {revents:?}");
            Ok(PollStatus::TimedOut)
        }
    }
}

/// Drain everything currently readable from the port. EOF, interrupts and
/// timeouts are treated as "no more data", not as errors.
pub fn port_read(port: &mut File, data: &mut Vec<u8>) -> io::Result<()> {
    let mut buf = [0; 4096];
    loop {
        match port.read(&mut buf) {
            Ok(0) => {
                // EOF - No more data
                return Ok(());
            }
            Ok(n) => {
                data.extend_from_slice(&buf[0..n]);
            }
            Err(err) => match err.kind() {
                io::ErrorKind::Interrupted
                | io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock => {
                    // The port is drained. Not an error for our use case.
                    return Ok(());
                }
                _ => return Err(err),
            },
        }
    }
}

/// Write the whole buffer to the port or fail at the deadline.
pub fn port_write_all(port: &mut File, data: &[u8], deadline: Instant) -> io::Result<()> {
    let mut remaining = data;
    loop {
        match port_poll(port, PollKind::ForWrite, Some(deadline))? {
            PollStatus::WriteReady => match port.write(remaining) {
                Ok(0) => {
                    // EOF - Ignored. The deadline check below decides.
                }
                Ok(n) => remaining = &remaining[n..],
                Err(err) => match err.kind() {
                    io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock => {}
                    _ => return Err(err),
                },
            },
            PollStatus::TimedOut => {
                // Deadline is checked manually below.
            }
            PollStatus::ReadReady => {
                log::warn!("poll for write readiness reported read readiness");
            }
        }

        if remaining.is_empty() {
            return Ok(());
        }
        if deadline <= Instant::now() {
            return Err(io::ErrorKind::TimedOut.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_baud_rates_map_to_flags() {
        assert!(baud_flag(115200).is_ok());
        assert!(baud_flag(9600).is_ok());
    }

    #[test]
    fn unsupported_baud_is_rejected() {
        assert!(baud_flag(12345).is_err());
    }

    #[test]
    fn open_rejects_missing_device() {
        let result = port_open(Path::new("/dev/this-port-does-not-exist"), 115200);
        assert!(result.is_err());
    }

    #[test]
    fn open_rejects_non_tty() {
        // Opens fine as a file but raw-mode setup must fail cleanly.
        let result = port_open(Path::new("/dev/null"), 115200);
        assert!(result.is_err());
    }
}
