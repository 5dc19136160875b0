/*!
 * Detached Launch Test
 *
 * Lives in its own binary: ignoring SIGCHLD is process-wide and permanent.
 */

use posix_system::{Executable, SystemError};
use std::time::{Duration, Instant};

#[test]
fn test_forgotten_child_is_not_left_as_zombie() {
    let process = Executable::new("/bin/true")
        .start_and_forget::<&str>(&[])
        .unwrap();
    assert_eq!(process.name(), Some("/bin/true"));

    // the kernel reaps the child on its own; the probe fails once it is gone
    let deadline = Instant::now() + Duration::from_secs(10);
    while process.exists() {
        assert!(Instant::now() < deadline, "forgotten child never went away");
        std::thread::sleep(Duration::from_millis(20));
    }

    // nothing left to wait for
    let err = process.join(false).unwrap_err();
    assert!(matches!(
        err,
        SystemError::OsCallFailed {
            call: "waitpid",
            errno: nix::errno::Errno::ECHILD,
            ..
        }
    ));
}
