/*!
 * File Paths
 * The named-target collaborator descriptors open
 */

use crate::core::errors::{SystemError, SystemResult};
use nix::sys::stat::Mode;
use std::fmt;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

/// A named file-like target on the local filesystem
///
/// Holds only the path; nothing is opened until a `Descriptor` is built
/// over it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name used in diagnostics
    pub fn full_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn is_fifo(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false)
    }

    /// Create a named pipe at this path
    pub fn make_fifo(&self, perm: Mode) -> SystemResult<()> {
        nix::unistd::mkfifo(self.path.as_path(), perm).map_err(|errno| {
            SystemError::os_call("mkfifo", format!("on file {}", self.full_name()), errno)
        })
    }

    /// Remove the file from the filesystem
    pub fn remove(&self) -> SystemResult<()> {
        nix::unistd::unlink(self.path.as_path()).map_err(|errno| SystemError::RemoveFailed {
            name: self.full_name(),
            errno,
        })
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<&str> for File {
    fn from(path: &str) -> Self {
        File::new(path)
    }
}

impl From<PathBuf> for File {
    fn from(path: PathBuf) -> Self {
        File::new(path)
    }
}

impl From<&Path> for File {
    fn from(path: &Path) -> Self {
        File::new(path)
    }
}
