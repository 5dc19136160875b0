/*!
 * File Descriptors
 *
 * Owned OS handles with guaranteed close on drop
 */

use super::file::File;
use crate::core::errors::{SystemError, SystemResult};
use crate::core::guard::{Guard, GuardDrop};
use crate::core::limits::PIPE_READ_CHUNK;
use crate::monitoring::OsCallSpan;
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::{fchmod, Mode};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use tracing::{debug, warn};

/// One open OS handle plus the name of what it refers to
///
/// The handle is either open or closed (`None`); closing twice is a no-op.
/// A descriptor still open when dropped is closed without raising.
///
/// # Example
///
/// ```no_run
/// use posix_system::fs::{Descriptor, File};
/// use nix::sys::stat::Mode;
///
/// let file = File::new("/tmp/out.log");
/// let mut out = Descriptor::open(&file, Descriptor::flags(false, true), Mode::from_bits_truncate(0o644))?;
/// out.write(b"hello")?;
/// out.close()?;
/// # Ok::<(), posix_system::SystemError>(())
/// ```
#[derive(Debug)]
pub struct Descriptor {
    fd: Option<OwnedFd>,
    name: String,
}

impl Descriptor {
    /// Open flags for a (read, write) access pair
    ///
    /// | read | write | flags |
    /// |------|-------|-------|
    /// | yes  | yes   | `O_RDWR \| O_CREAT` |
    /// | yes  | no    | `O_RDONLY` |
    /// | no   | yes   | `O_WRONLY \| O_CREAT` |
    /// | no   | no    | no flags |
    pub fn flags(read_mode: bool, write_mode: bool) -> OFlag {
        match (read_mode, write_mode) {
            (true, true) => OFlag::O_RDWR | OFlag::O_CREAT,
            (true, false) => OFlag::O_RDONLY,
            (false, true) => OFlag::O_WRONLY | OFlag::O_CREAT,
            (false, false) => OFlag::empty(),
        }
    }

    /// Open `file` with the given flags
    ///
    /// When the file did not exist before and `O_CREAT` was requested, `perm`
    /// is applied again with `fchmod` so the result does not depend on the
    /// process umask.
    pub fn open(file: &File, flags: OFlag, perm: Mode) -> SystemResult<Self> {
        let name = file.full_name();
        let already_exists = file.exists();

        let span = OsCallSpan::new("open", &name);
        let raw = span
            .finish(fcntl::open(file.path(), flags, perm))
            .map_err(|errno| SystemError::OpenFailed {
                name: name.clone(),
                errno,
            })?;

        // SAFETY: open just returned this descriptor and nothing else owns it
        let descriptor = Self::from_owned(unsafe { OwnedFd::from_raw_fd(raw) }, name);

        if !already_exists && flags.contains(OFlag::O_CREAT) {
            fchmod(raw, perm).map_err(|errno| {
                SystemError::os_call("fchmod", format!("on file {}", descriptor.name), errno)
            })?;
        }

        debug!(fd = raw, name = %descriptor.name, "descriptor opened");
        Ok(descriptor)
    }

    /// Wrap a handle obtained elsewhere (pipe ends)
    pub(crate) fn from_owned(fd: OwnedFd, name: impl Into<String>) -> Self {
        Self {
            fd: Some(fd),
            name: name.into(),
        }
    }

    /// Raw handle, `None` once closed
    #[inline]
    pub fn fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Borrow the open handle
    #[inline]
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        use std::os::fd::AsFd;
        self.fd.as_ref().map(|fd| fd.as_fd())
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// Display name of the underlying file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read up to `buffer.len()` bytes; returns the count actually read
    pub fn read(&self, buffer: &mut [u8]) -> SystemResult<usize> {
        let fd = self.fd().ok_or_else(|| self.read_error(Errno::EBADF))?;
        nix::unistd::read(fd, buffer).map_err(|errno| self.read_error(errno))
    }

    /// Write up to `buffer.len()` bytes; returns the count actually written
    pub fn write(&self, buffer: &[u8]) -> SystemResult<usize> {
        let fd = self.as_fd().ok_or_else(|| self.write_error(Errno::EBADF))?;
        nix::unistd::write(fd, buffer).map_err(|errno| self.write_error(errno))
    }

    /// Write the whole buffer, looping over short writes
    pub fn write_all(&self, mut buffer: &[u8]) -> SystemResult<()> {
        while !buffer.is_empty() {
            match self.write(buffer) {
                Ok(0) => return Err(self.write_error(Errno::EIO)),
                Ok(n) => buffer = &buffer[n..],
                Err(SystemError::WriteFailed {
                    errno: Errno::EINTR,
                    ..
                }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read until end-of-stream
    pub fn read_to_end(&self) -> SystemResult<Vec<u8>> {
        let mut content = Vec::new();
        let mut chunk = [0u8; PIPE_READ_CHUNK];
        loop {
            match self.read(&mut chunk) {
                Ok(0) => return Ok(content),
                Ok(n) => content.extend_from_slice(&chunk[..n]),
                Err(SystemError::ReadFailed {
                    errno: Errno::EINTR,
                    ..
                }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the handle
    ///
    /// The handle counts as closed afterwards even when the OS reports an
    /// error; retrying `close` on POSIX systems may hit a reused number.
    pub fn close(&mut self) -> SystemResult<()> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };
        let raw = fd.into_raw_fd();
        nix::unistd::close(raw).map_err(|errno| SystemError::CloseFailed {
            name: self.name.clone(),
            errno,
        })?;
        debug!(fd = raw, name = %self.name, "descriptor closed");
        Ok(())
    }

    /// Close the handle, logging failures instead of returning them
    pub fn close_safe(&mut self) {
        if let Err(e) = self.close() {
            warn!(resource = self.resource_type(), name = %self.name, error = %e, "close failed");
        }
    }

    /// Mark the handle close-on-exec
    pub fn close_on_exec(&self) -> SystemResult<()> {
        let fd = self.fd().ok_or_else(|| {
            SystemError::os_call("fcntl", format!("on closed file {}", self.name), Errno::EBADF)
        })?;

        let old = fcntl::fcntl(fd, FcntlArg::F_GETFD).map_err(|errno| {
            SystemError::os_call(
                "fcntl",
                format!("reading descriptor flags for file {}", self.name),
                errno,
            )
        })?;

        let flags = FdFlag::from_bits_truncate(old) | FdFlag::FD_CLOEXEC;
        fcntl::fcntl(fd, FcntlArg::F_SETFD(flags)).map_err(|errno| {
            SystemError::os_call(
                "fcntl",
                format!("setting close-on-exec for file {}", self.name),
                errno,
            )
        })?;
        Ok(())
    }

    fn read_error(&self, errno: Errno) -> SystemError {
        SystemError::ReadFailed {
            name: self.name.clone(),
            errno,
        }
    }

    fn write_error(&self, errno: Errno) -> SystemError {
        SystemError::WriteFailed {
            name: self.name.clone(),
            errno,
        }
    }
}

impl Guard for Descriptor {
    fn resource_type(&self) -> &'static str {
        "descriptor"
    }

    fn is_active(&self) -> bool {
        self.is_open()
    }

    fn release(&mut self) -> SystemResult<()> {
        self.close()
    }
}

impl GuardDrop for Descriptor {
    fn on_drop(&mut self) {
        if self.is_open() {
            self.close_safe();
        }
    }
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        self.on_drop();
    }
}
