/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use nix::errno::Errno;
use thiserror::Error;

/// Result type for every fallible operation in the crate
pub type SystemResult<T> = Result<T, SystemError>;

/// Failures surfaced by descriptors, process handles and launches
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SystemError {
    #[error("Can not open file \"{name}\" ({errno})")]
    #[diagnostic(
        code(system::open_failed),
        help("Check that the path exists and that the access mode is permitted.")
    )]
    OpenFailed { name: String, errno: Errno },

    #[error("Can not read from file \"{name}\" ({errno})")]
    #[diagnostic(code(system::read_failed))]
    ReadFailed { name: String, errno: Errno },

    #[error("Can not write to file \"{name}\" ({errno})")]
    #[diagnostic(code(system::write_failed))]
    WriteFailed { name: String, errno: Errno },

    #[error("Can not close file \"{name}\" ({errno})")]
    #[diagnostic(
        code(system::close_failed),
        help("The handle is released by the kernel even when close reports an error.")
    )]
    CloseFailed { name: String, errno: Errno },

    #[error("Can not remove file \"{name}\" ({errno})")]
    #[diagnostic(code(system::remove_failed))]
    RemoveFailed { name: String, errno: Errno },

    #[error("System call \"{call}\" fails {context} ({errno})")]
    #[diagnostic(code(system::os_call_failed))]
    OsCallFailed {
        call: &'static str,
        context: String,
        errno: Errno,
    },

    #[error("Execution of the \"{command}\" command fails with {status} status")]
    #[diagnostic(
        code(system::execution_failed),
        help("The captured standard error of the command is attached to this error.")
    )]
    ExecutionFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Process terminated with the {status} status")]
    #[diagnostic(code(system::non_zero_exit))]
    NonZeroExit { status: i32 },

    #[error("Process has been terminated by the {signal} signal")]
    #[diagnostic(
        code(system::process_signaled),
        help("A process stopped by a signal is reported the same way as one killed by it.")
    )]
    ProcessSignaled { signal: i32 },

    #[error("Request for allocating {bytes} bytes of memory fails")]
    #[diagnostic(code(system::allocation_failed))]
    AllocationFailed { bytes: usize },

    #[error("Invalid string for the OS interface: {0:?}")]
    #[diagnostic(
        code(system::invalid_string),
        help("Arguments and environment entries must not contain NUL bytes; keys must not contain '='.")
    )]
    InvalidString(String),

    #[error("Message length {len} out of range 1..{max}")]
    #[diagnostic(code(system::invalid_message))]
    InvalidMessage { len: usize, max: usize },
}

impl SystemError {
    /// Build an `OsCallFailed` from the current `errno`
    pub fn os_call(call: &'static str, context: impl Into<String>, errno: Errno) -> Self {
        SystemError::OsCallFailed {
            call,
            context: context.into(),
            errno,
        }
    }

    /// OS error code carried by this error, if any
    pub fn errno(&self) -> Option<Errno> {
        match self {
            SystemError::OpenFailed { errno, .. }
            | SystemError::ReadFailed { errno, .. }
            | SystemError::WriteFailed { errno, .. }
            | SystemError::CloseFailed { errno, .. }
            | SystemError::RemoveFailed { errno, .. }
            | SystemError::OsCallFailed { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Exit status carried by execution and termination errors
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            SystemError::ExecutionFailed { status, .. } | SystemError::NonZeroExit { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
