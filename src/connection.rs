use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::serial_port::{
    port_flush, port_open, port_poll, port_read, port_write_all, PollKind, PollStatus,
};

/// An exclusively owned serial connection.
///
/// The device is opened in raw non-blocking mode and closed when the value
/// drops, so the handle is released on every exit path.
pub struct Connection {
    file: File,
    path: PathBuf,
    io_timeout: Duration,
}

impl Connection {
    /// Opens the device at `path` with the given baud rate. `io_timeout` is
    /// the default deadline applied to blocking calls on this connection.
    pub fn open(path: impl AsRef<Path>, baud: u32, io_timeout: Duration) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = port_open(&path, baud)?;
        log::debug!("opened {} at {} baud", path.display(), baud);
        Ok(Self {
            file,
            path,
            io_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Discard stale data queued in both directions.
    pub fn clear_buffers(&self) -> io::Result<()> {
        port_flush(&self.file)
    }

    /// Report whether input bytes are ready right now, without blocking.
    pub fn readable(&self) -> io::Result<bool> {
        let status = port_poll(&self.file, PollKind::ForRead, None)?;
        Ok(status == PollStatus::ReadReady)
    }

    /// Drain all currently available bytes. Best effort only: there is no
    /// guarantee the result holds a complete frame.
    pub fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        port_read(&mut self.file, &mut data)?;
        Ok(data)
    }

    /// Write the whole buffer, bounded by the connection's I/O deadline.
    pub fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + self.io_timeout;
        port_write_all(&mut self.file, data, deadline)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        log::debug!("closed {}", self.path.display());
    }
}
