/*!
 * Pipe Triple
 * stdin-feed, stdout-capture and stderr-capture pipes for one child
 */

use super::launch::ChildStdio;
use crate::core::errors::{SystemError, SystemResult};
use crate::fs::Descriptor;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use tracing::warn;

/// One unidirectional pipe
struct Pipe {
    read: Descriptor,
    write: Descriptor,
}

impl Pipe {
    fn open(stream: &str) -> SystemResult<Self> {
        // close-on-exec from creation: a fork elsewhere in the process must
        // not inherit either end
        let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(|errno| {
            SystemError::os_call("pipe", format!("while creating {stream} pipe"), errno)
        })?;
        Ok(Self {
            read: Descriptor::from_owned(read, format!("{stream} pipe (read end)")),
            write: Descriptor::from_owned(write, format!("{stream} pipe (write end)")),
        })
    }
}

/// Three pipes created together before fork
///
/// Every end is close-on-exec; the child's `dup2` onto 0/1/2 produces the
/// only copies that survive exec.
pub(crate) struct PipeTriple {
    stdin: Pipe,
    stdout: Pipe,
    stderr: Pipe,
}

impl PipeTriple {
    pub(crate) fn open() -> SystemResult<Self> {
        Ok(Self {
            stdin: Pipe::open("stdin")?,
            stdout: Pipe::open("stdout")?,
            stderr: Pipe::open("stderr")?,
        })
    }

    /// Separate the ends the child uses from the ones the parent keeps
    pub(crate) fn split(self) -> (ChildEnds, ParentEnds) {
        (
            ChildEnds {
                stdin: self.stdin.read,
                stdout: self.stdout.write,
                stderr: self.stderr.write,
            },
            ParentEnds {
                stdin: self.stdin.write,
                stdout: self.stdout.read,
                stderr: self.stderr.read,
            },
        )
    }
}

/// Ends wired onto the child's standard streams
pub(crate) struct ChildEnds {
    stdin: Descriptor,
    stdout: Descriptor,
    stderr: Descriptor,
}

impl ChildEnds {
    pub(crate) fn stdio(&self) -> SystemResult<ChildStdio> {
        ChildStdio::redirect(&self.stdin, &self.stdout, &self.stderr)
    }

    /// Parent-side close after fork
    pub(crate) fn close(mut self) {
        for end in [&mut self.stdin, &mut self.stdout, &mut self.stderr] {
            end.close_safe();
        }
    }
}

/// Ends the parent keeps: the stdin feed and both capture readers
pub(crate) struct ParentEnds {
    pub(crate) stdin: Descriptor,
    pub(crate) stdout: Descriptor,
    pub(crate) stderr: Descriptor,
}

impl ParentEnds {
    /// Drain both capture pipes to end-of-stream, then close everything
    pub(crate) fn drain(mut self) -> SystemResult<(Vec<u8>, Vec<u8>)> {
        self.stdin.close_safe();
        let out = self.stdout.read_to_end()?;
        let err = self.stderr.read_to_end()?;
        for end in [&mut self.stdout, &mut self.stderr] {
            if let Err(e) = end.close() {
                warn!(error = %e, "failed to close capture pipe");
            }
        }
        Ok((out, err))
    }
}
