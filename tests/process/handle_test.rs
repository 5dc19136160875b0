/*!
 * Process Handle Tests
 * Signals, existence probes and reaping
 */

use nix::sys::signal::Signal;
use posix_system::{Executable, Process, SystemError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serial_test::serial;
use std::collections::HashSet;

#[test]
#[serial]
fn test_terminate_running_child() {
    let child = Executable::new("/bin/sleep").start(&["30"]).unwrap();
    assert!(child.exists());

    child.terminate().unwrap();
    assert_eq!(
        child.join(false).unwrap_err(),
        SystemError::ProcessSignaled {
            signal: Signal::SIGTERM as i32
        }
    );
    assert!(!child.exists());
}

#[test]
#[serial]
fn test_signal_kill() {
    let child = Executable::new("/bin/sleep").start(&["30"]).unwrap();
    child.signal(Signal::SIGKILL).unwrap();
    assert_eq!(
        child.join(true).unwrap_err(),
        SystemError::ProcessSignaled { signal: 9 }
    );
}

#[test]
#[serial]
fn test_reaped_child_no_longer_exists() {
    let child = Executable::new("/bin/true").start::<&str>(&[]).unwrap();
    assert_eq!(child.join(true).unwrap(), 0);
    assert!(!child.exists());
    assert!(child.terminate().is_ok());
}

#[test]
#[serial]
fn test_display_uses_command_line() {
    let child = Executable::new("/bin/sh").start(&["-c", "exit 0"]).unwrap();
    let shown = child.to_string();
    assert_eq!(shown, format!("/bin/sh -c exit 0 pid: {}", child.raw_pid()));
    child.join(true).unwrap();
}

proptest! {
    #[test]
    fn prop_identity_is_pid(pid in 1i32..i32::MAX, a in "[a-z]{0,6}", b in "[a-z]{0,6}") {
        let first = Process::with_name(nix::unistd::Pid::from_raw(pid), a);
        let second = Process::with_name(nix::unistd::Pid::from_raw(pid), b);
        prop_assert_eq!(&first, &second);

        let set: HashSet<Process> = [first, second].into_iter().collect();
        prop_assert_eq!(set.len(), 1);
    }
}
