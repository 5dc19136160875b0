/*!
 * Launch Plan
 *
 * Everything a child needs between fork and exec is built in the parent:
 * argv/envp arrays, the command line and the exec-failure note. The child
 * branch then only makes async-signal-safe calls and never allocates.
 */

use super::handle::Process;
use super::marshal::CStringArray;
use super::signals::{ignore_child_termination, reset_child_dispositions, BlockedSignals};
use crate::core::errors::{SystemError, SystemResult};
use crate::core::limits::EXEC_FAILURE_STATUS;
use crate::core::types::EnvMap;
use crate::fs::Descriptor;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::{dup2, fork, ForkResult};
use std::os::fd::{BorrowedFd, RawFd};
use tracing::{info, warn};

const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;
const STDERR: RawFd = 2;

/// Standard streams of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildStdio {
    /// Keep the parent's streams
    Inherit,
    /// Put these handles on 0, 1 and 2
    Redirect {
        stdin: RawFd,
        stdout: RawFd,
        stderr: RawFd,
    },
}

impl ChildStdio {
    pub(crate) fn redirect(
        stdin: &Descriptor,
        stdout: &Descriptor,
        stderr: &Descriptor,
    ) -> SystemResult<Self> {
        let raw = |d: &Descriptor| {
            d.fd().ok_or_else(|| {
                SystemError::os_call("dup2", format!("on closed file {}", d.name()), Errno::EBADF)
            })
        };
        Ok(ChildStdio::Redirect {
            stdin: raw(stdin)?,
            stdout: raw(stdout)?,
            stderr: raw(stderr)?,
        })
    }

    /// Child side: install the handles onto the standard streams
    ///
    /// Async-signal-safe. A handle already sitting on its target number
    /// only loses close-on-exec; the others are duplicated and closed.
    fn wire(&self) -> Result<(), (&'static str, Errno)> {
        let ChildStdio::Redirect {
            stdin,
            stdout,
            stderr,
        } = *self
        else {
            return Ok(());
        };

        let pairs = [(stdin, STDIN), (stdout, STDOUT), (stderr, STDERR)];
        for (fd, target) in pairs {
            if fd == target {
                fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map_err(|errno| ("fcntl", errno))?;
            } else {
                dup2(fd, target).map_err(|errno| ("dup2", errno))?;
            }
        }
        for (fd, _) in pairs {
            if fd > STDERR {
                let _ = nix::unistd::close(fd);
            }
        }
        Ok(())
    }
}

/// One launch, fully marshaled before fork
#[derive(Debug)]
pub(crate) struct LaunchPlan {
    argv: CStringArray,
    envp: Option<CStringArray>,
    command_line: String,
    failure_note: Vec<u8>,
}

impl LaunchPlan {
    /// `env` of `None` inherits the caller's environment
    pub(crate) fn new<S: AsRef<str>>(
        program: &str,
        params: &[S],
        env: Option<&EnvMap>,
    ) -> SystemResult<Self> {
        let argv = CStringArray::arguments(program, params)?;
        let envp = env.map(CStringArray::environment).transpose()?;
        let command_line = command_line(program, params);
        let failure_note = format!("Can not execute \"{command_line}\": ").into_bytes();

        Ok(Self {
            argv,
            envp,
            command_line,
            failure_note,
        })
    }

    pub(crate) fn command_line(&self) -> &str {
        &self.command_line
    }

    fn exec_call(&self) -> &'static str {
        if self.envp.is_some() {
            "execve"
        } else {
            "execv"
        }
    }

    /// Replace the current image; returns only with the failure cause
    fn exec(&self) -> Errno {
        // SAFETY: both arrays are NULL-terminated and outlive the call
        unsafe {
            match &self.envp {
                Some(envp) => libc::execve(self.argv.first_ptr(), self.argv.as_ptr(), envp.as_ptr()),
                None => libc::execv(self.argv.first_ptr(), self.argv.as_ptr()),
            };
        }
        Errno::last()
    }

    /// Exec in the calling process, turning a return into an error
    pub(crate) fn replace_current(&self) -> SystemError {
        let errno = self.exec();
        SystemError::os_call(
            self.exec_call(),
            format!("while executing \"{}\"", self.command_line),
            errno,
        )
    }

    /// Fork and exec the plan in the child
    ///
    /// The caller holds the launch lock. With `forget` set, SIGCHLD is
    /// ignored in this process before forking and reset in the child.
    pub(crate) fn fork(&self, stdio: &ChildStdio, forget: bool) -> SystemResult<Process> {
        let blocked = BlockedSignals::block_all()?;
        if forget {
            ignore_child_termination()?;
        }

        // SAFETY: the child branch only calls async-signal-safe functions
        // on data prepared above, then execs or exits
        match unsafe { fork() } {
            Ok(ForkResult::Child) => self.child_main(&blocked, stdio, forget),
            Ok(ForkResult::Parent { child }) => {
                if let Err(e) = blocked.restore() {
                    warn!(error = %e, "parent signal mask not restored");
                }
                info!(
                    pid = child.as_raw(),
                    command = %self.command_line,
                    detached = forget,
                    "process launched"
                );
                Ok(Process::with_name(child, self.command_line.clone()))
            }
            Err(errno) => {
                drop(blocked);
                Err(SystemError::os_call(
                    "fork",
                    format!("while launching \"{}\"", self.command_line),
                    errno,
                ))
            }
        }
    }

    fn child_main(&self, blocked: &BlockedSignals, stdio: &ChildStdio, forget: bool) -> ! {
        reset_child_dispositions(forget);
        blocked.restore_in_child();

        if let Err((call, errno)) = stdio.wire() {
            report_child_failure(&self.failure_note, call, errno);
        } else {
            let errno = self.exec();
            report_child_failure(&self.failure_note, self.exec_call(), errno);
        }

        // SAFETY: _exit skips atexit handlers and stdio flushing inherited
        // from the parent
        unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
    }
}

/// Program path and parameters joined by single spaces
pub(crate) fn command_line<S: AsRef<str>>(program: &str, params: &[S]) -> String {
    let mut line = String::from(program);
    for param in params {
        line.push(' ');
        line.push_str(param.as_ref());
    }
    line
}

/// Raw write of the exec failure onto the child's stderr
fn report_child_failure(note: &[u8], call: &str, errno: Errno) {
    // SAFETY: descriptor 2 stays open for the duration of these writes
    let stderr = unsafe { BorrowedFd::borrow_raw(STDERR) };
    for part in [note, call.as_bytes(), b": ", errno.desc().as_bytes(), b"\n"] {
        let _ = nix::unistd::write(stderr, part);
    }
}
