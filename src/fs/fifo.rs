/*!
 * FIFO Connections
 * Short text messages over named pipes
 */

use super::descriptor::Descriptor;
use super::file::File;
use crate::core::errors::{SystemError, SystemResult};
use crate::core::limits::{FIFO_MAX_MESSAGE_LEN, FIFO_POLL_INTERVAL};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::path::PathBuf;
use tracing::warn;

/// A named pipe used to pass messages shorter than `FIFO_MAX_MESSAGE_LEN`
///
/// Creating the value does not create the pipe; call `make` for that.
/// At most one descriptor is held at a time.
#[derive(Debug)]
pub struct FifoConnection {
    file: File,
    descriptor: Option<Descriptor>,
    blocking: bool,
}

impl FifoConnection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_file(File::new(path))
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file,
            descriptor: None,
            blocking: true,
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Create the named pipe on the filesystem
    pub fn make(&self, perm: Mode) -> SystemResult<()> {
        self.file.make_fifo(perm)
    }

    pub fn open_read(&mut self, block: bool) -> SystemResult<&Descriptor> {
        self.open_with(OFlag::O_RDONLY, block)
    }

    pub fn open_write(&mut self, block: bool) -> SystemResult<&Descriptor> {
        self.open_with(OFlag::O_WRONLY, block)
    }

    pub fn open_read_write(&mut self, block: bool) -> SystemResult<&Descriptor> {
        self.open_with(OFlag::O_RDWR, block)
    }

    fn open_with(&mut self, mut flags: OFlag, block: bool) -> SystemResult<&Descriptor> {
        assert!(
            self.descriptor.is_none(),
            "FIFO {} is already open",
            self.file
        );
        if !block {
            flags |= OFlag::O_NONBLOCK;
        }
        let descriptor = Descriptor::open(&self.file, flags, Mode::empty())?;
        self.blocking = block;
        let held: &Descriptor = self.descriptor.insert(descriptor);
        Ok(held)
    }

    /// Close the held descriptor, if any
    pub fn close(&mut self) -> SystemResult<()> {
        match self.descriptor.take() {
            Some(mut descriptor) => descriptor.close(),
            None => Ok(()),
        }
    }

    /// Write one message over the held descriptor
    pub fn send(&self, message: &str) -> SystemResult<()> {
        check_length(message)?;
        let descriptor = self.held()?;
        descriptor.write(message.as_bytes())?;
        Ok(())
    }

    /// Read one message over the held descriptor
    ///
    /// Blocks (polling) until data arrives. In non-blocking mode a read
    /// that finds no writer returns an empty message.
    pub fn read(&self) -> SystemResult<String> {
        let descriptor = self.held()?;
        read_loop(descriptor, !self.blocking)
    }

    /// Open for writing, send one message, close
    pub fn send_message(&self, message: &str) -> SystemResult<()> {
        self.warn_if_not_fifo();
        check_length(message)?;
        let mut descriptor = Descriptor::open(&self.file, OFlag::O_WRONLY, Mode::empty())?;
        descriptor.write(message.as_bytes())?;
        descriptor.close()
    }

    /// Open for reading, wait for one message, close
    pub fn read_message(&self) -> SystemResult<String> {
        self.warn_if_not_fifo();
        let mut descriptor = Descriptor::open(&self.file, OFlag::O_RDONLY, Mode::empty())?;
        let message = read_loop(&descriptor, false)?;
        descriptor.close()?;
        Ok(message)
    }

    fn held(&self) -> SystemResult<&Descriptor> {
        self.descriptor.as_ref().ok_or_else(|| {
            SystemError::os_call(
                "open",
                format!("FIFO {} has no open descriptor", self.file),
                nix::errno::Errno::EBADF,
            )
        })
    }

    fn warn_if_not_fifo(&self) {
        if !self.file.is_fifo() {
            warn!(path = %self.file, "not a FIFO");
        }
    }
}

fn check_length(message: &str) -> SystemResult<()> {
    let len = message.len();
    if len == 0 || len >= FIFO_MAX_MESSAGE_LEN {
        return Err(SystemError::InvalidMessage {
            len,
            max: FIFO_MAX_MESSAGE_LEN,
        });
    }
    Ok(())
}

fn read_loop(descriptor: &Descriptor, return_on_eof: bool) -> SystemResult<String> {
    let mut buffer = [0u8; FIFO_MAX_MESSAGE_LEN];
    loop {
        let count = descriptor.read(&mut buffer[..FIFO_MAX_MESSAGE_LEN - 1])?;
        if count > 0 {
            return Ok(String::from_utf8_lossy(&buffer[..count]).into_owned());
        }
        if return_on_eof {
            return Ok(String::new());
        }
        std::thread::sleep(FIFO_POLL_INTERVAL);
    }
}
