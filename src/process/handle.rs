/*!
 * Process Handles
 * PID wrappers with wait and signal operations
 */

use super::status::interpret_wait_status;
use crate::core::errors::{SystemError, SystemResult};
use crate::core::types::RawPid;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{getpid, Pid};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use tracing::{debug, info};

static CURRENT: OnceLock<Process> = OnceLock::new();

/// Handle on an OS process
///
/// Does not own the process: dropping the handle neither kills nor reaps
/// it. Identity is the PID alone; the name is for diagnostics. Once a
/// child has been reaped by `join` the handle is stale and must not be
/// joined again.
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    name: Option<String>,
}

impl Process {
    /// The calling process
    ///
    /// Built on first use and never changed afterwards.
    pub fn current() -> &'static Process {
        CURRENT.get_or_init(|| Process::new(getpid()))
    }

    pub fn new(pid: Pid) -> Self {
        Self { pid, name: None }
    }

    pub fn from_raw(pid: RawPid) -> Self {
        Self::new(Pid::from_raw(pid))
    }

    pub fn with_name(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: Some(name.into()),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn raw_pid(&self) -> RawPid {
        self.pid.as_raw()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_current(&self) -> bool {
        self == Process::current()
    }

    /// Block until the process changes state, then interpret that state
    ///
    /// Normal exit yields the exit code, unless it is non-zero and
    /// `throw_on_nonzero` is set. Termination or stop by a signal is an
    /// error. There is no timeout.
    ///
    /// # Panics
    ///
    /// In debug builds, when called on the current process.
    pub fn join(&self, throw_on_nonzero: bool) -> SystemResult<i32> {
        debug_assert!(!self.is_current(), "a process cannot wait on itself");

        let status = waitpid(self.pid, None)
            .map_err(|errno| SystemError::os_call("waitpid", format!("on process {self}"), errno))?;

        let result = interpret_wait_status(status, throw_on_nonzero);
        match &result {
            Ok(code) => info!(pid = self.raw_pid(), code, "process exited"),
            Err(e) => info!(pid = self.raw_pid(), error = %e, "process ended abnormally"),
        }
        result
    }

    /// Send `signal` to the process
    pub fn signal(&self, signal: Signal) -> SystemResult<()> {
        kill(self.pid, signal).map_err(|errno| {
            SystemError::os_call("kill", format!("on process {self}"), errno)
        })?;
        debug!(pid = self.raw_pid(), signal = ?signal, "signal sent");
        Ok(())
    }

    /// Probe with the null signal
    ///
    /// Any failure counts as "does not exist", including EPERM for a live
    /// process owned by another user.
    pub fn exists(&self) -> bool {
        kill(self.pid, None).is_ok()
    }

    /// Send SIGTERM if the process exists
    ///
    /// Does not wait for the process to go away and does not escalate.
    pub fn terminate(&self) -> SystemResult<()> {
        if self.exists() {
            self.signal(Signal::SIGTERM)?;
        }
        Ok(())
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid
    }
}

impl Eq for Process {}

impl Hash for Process {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pid.hash(state);
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            write!(f, "{name} ")?;
        }
        write!(f, "pid: {}", self.pid)
    }
}
