/*!
 * Exit Status
 * Wait-status interpretation and textual exit codes
 */

use crate::core::errors::{SystemError, SystemResult};
use crate::core::limits::{SYSEXITS_BASE, SYSEXITS_MAX, TEST_EXIT_BASE, TEST_EXIT_MAX};
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;

const OK_EXIT_NAME: &str = "ok";

/// Names for sysexits codes EX_USAGE (64) through EX_CONFIG (78)
const SYSEXITS_NAMES: [&str; 15] = [
    "command line usage error",
    "data format error",
    "cannot open input",
    "addressee unknown",
    "host name unknown",
    "service unavailable",
    "internal software error",
    "system error",
    "critical OS file missing",
    "can't create (user) output file",
    "input/output error",
    "temp failure; user is invited to retry",
    "remote error in protocol",
    "permission denied",
    "configuration error",
];

/// Names for test-manager result codes 182 through 186
const TEST_EXIT_NAMES: [&str; 5] = [
    "undefined test",
    "test failed",
    "test unresolved",
    "test untested",
    "unsupported test",
];

/// Turn a wait status into an exit code or an error
///
/// | status | result |
/// |--------|--------|
/// | exited 0 | `Ok(0)` |
/// | exited n, `throw_on_nonzero == false` | `Ok(n)` |
/// | exited n, `throw_on_nonzero == true` | `NonZeroExit { n }` |
/// | killed by signal s | `ProcessSignaled { s }` |
/// | stopped by signal s | `ProcessSignaled { s }` |
pub fn interpret_wait_status(status: WaitStatus, throw_on_nonzero: bool) -> SystemResult<i32> {
    match status {
        WaitStatus::Exited(_, code) => {
            if !throw_on_nonzero || code == 0 {
                Ok(code)
            } else {
                Err(SystemError::NonZeroExit { status: code })
            }
        }
        WaitStatus::Signaled(_, signal, _) => Err(SystemError::ProcessSignaled {
            signal: signal as i32,
        }),
        WaitStatus::Stopped(_, signal) => Err(SystemError::ProcessSignaled {
            signal: signal as i32,
        }),
        other => Err(SystemError::os_call(
            "waitpid",
            format!("returned unexpected status {other:?}"),
            Errno::EINVAL,
        )),
    }
}

/// Textual meaning of an exit code, when it is a known one
pub fn exit_text(code: i32) -> Option<&'static str> {
    if code == 0 {
        return Some(OK_EXIT_NAME);
    }
    if (SYSEXITS_BASE..=SYSEXITS_MAX).contains(&code) {
        return Some(SYSEXITS_NAMES[(code - SYSEXITS_BASE) as usize]);
    }
    if (TEST_EXIT_BASE..=TEST_EXIT_MAX).contains(&code) {
        return Some(TEST_EXIT_NAMES[(code - TEST_EXIT_BASE) as usize]);
    }
    None
}

/// `"text(code)"` for known codes, the bare number otherwise
pub fn exit_pretty(code: i32) -> String {
    match exit_text(code) {
        Some(text) => format!("{text}({code})"),
        None => code.to_string(),
    }
}
