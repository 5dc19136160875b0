/*!
 * Executable Tests
 * Launch variants, captured output and redirected streams
 */

use nix::sys::stat::Mode;
use posix_system::{EnvMap, Executable, File, SystemError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serial_test::serial;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sh() -> Executable {
    Executable::new("/bin/sh")
}

#[test]
#[serial]
fn test_start_and_join_exit_codes() {
    let ok = sh().start(&["-c", "exit 0"]).unwrap();
    assert_eq!(ok.join(true).unwrap(), 0);

    let failing = sh().start(&["-c", "exit 7"]).unwrap();
    assert_eq!(
        failing.join(true).unwrap_err(),
        SystemError::NonZeroExit { status: 7 }
    );

    let lenient = sh().start(&["-c", "exit 7"]).unwrap();
    assert_eq!(lenient.join(false).unwrap(), 7);
}

#[test]
#[serial]
fn test_argument_zero_is_full_path() {
    let out = sh().pipe_in(&["-c", "echo \"$0\""]).unwrap();
    assert_eq!(out, "/bin/sh\n");
}

#[test]
#[serial]
fn test_pipe_in_exact_output() {
    let out = Executable::new("/bin/sh")
        .pipe_in(&["-c", "printf hello"])
        .unwrap();
    assert_eq!(out, "hello");
}

#[test]
#[serial]
fn test_pipe_in_output_larger_than_read_chunk() {
    // 10000 bytes: several drain chunks, still below the pipe capacity
    let out = Executable::system("i=0; while [ $i -lt 1000 ]; do printf 123456789x; i=$((i+1)); done")
        .unwrap();
    assert_eq!(out.len(), 10_000);
    assert_eq!(out, "123456789x".repeat(1000));
}

#[test]
#[serial]
fn test_pipe_in_nonzero_exit_carries_stderr() {
    let err = sh()
        .pipe_in(&["-c", "echo partial; echo broken >&2; exit 9"])
        .unwrap_err();

    assert_eq!(err.exit_status(), Some(9));
    match err {
        SystemError::ExecutionFailed {
            command, stderr, ..
        } => {
            assert_eq!(command, "/bin/sh -c echo partial; echo broken >&2; exit 9");
            assert_eq!(stderr, "broken\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
#[serial]
fn test_pipe_in_with_env_replaces_environment() {
    let env = EnvMap::from([("FOO".to_string(), "bar".to_string())]);
    let out = sh().pipe_in_with_env(&["-c", "echo $FOO"], &env).unwrap();
    assert_eq!(out, "bar\n");

    // nothing else leaks in from the parent
    let home = sh()
        .pipe_in_with_env(&["-c", "echo \"${HOME:-unset}\""], &env)
        .unwrap();
    assert_eq!(home, "unset\n");
    assert_eq!(std::env::var_os("FOO"), None);
}

#[test]
#[serial]
fn test_start_with_env() {
    let env = EnvMap::from([("CODE".to_string(), "5".to_string())]);
    let process = sh().start_with_env(&["-c", "exit $CODE"], &env).unwrap();
    assert_eq!(process.join(false).unwrap(), 5);
}

#[test]
#[serial]
fn test_missing_program_fails_in_child() {
    let err = Executable::new("/nonexistent/tool")
        .pipe_in(&["x"])
        .unwrap_err();
    match err {
        SystemError::ExecutionFailed { status, stderr, .. } => {
            assert_eq!(status, libc::EXIT_FAILURE);
            assert!(stderr.starts_with("Can not execute \"/nonexistent/tool x\": execv"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
#[serial]
fn test_exec_missing_program_returns_error() {
    let err = Executable::new("/nonexistent/tool")
        .exec::<&str>(&[])
        .unwrap_err();
    assert!(matches!(err, SystemError::OsCallFailed { call: "execv", .. }));

    let err = Executable::new("/nonexistent/tool")
        .exec_with_env::<&str>(&[], &EnvMap::new())
        .unwrap_err();
    assert!(matches!(err, SystemError::OsCallFailed { call: "execve", .. }));
}

#[test]
#[serial]
fn test_pipe_out_redirects_all_streams() {
    let dir = tempfile::tempdir().unwrap();
    let input = File::new(dir.path().join("in.txt"));
    let output = File::new(dir.path().join("out.txt"));
    let error = File::new(dir.path().join("err.txt"));
    std::fs::write(input.path(), "from file\n").unwrap();

    let process = sh()
        .pipe_out(
            &["-c", "cat; echo warned >&2"],
            &input,
            &output,
            &error,
            Mode::from_bits_truncate(0o600),
        )
        .unwrap();
    assert_eq!(process.join(true).unwrap(), 0);

    assert_eq!(std::fs::read_to_string(output.path()).unwrap(), "from file\n");
    assert_eq!(std::fs::read_to_string(error.path()).unwrap(), "warned\n");
}

#[test]
#[serial]
fn test_pipe_out_with_env() {
    let dir = tempfile::tempdir().unwrap();
    let input = File::new("/dev/null");
    let output = File::new(dir.path().join("out.txt"));
    let env = EnvMap::from([("GREETING".to_string(), "hi".to_string())]);

    let process = sh()
        .pipe_out_with_env(
            &["-c", "echo $GREETING"],
            &env,
            &input,
            &output,
            &output,
            Mode::from_bits_truncate(0o600),
        )
        .unwrap();
    assert_eq!(process.join(true).unwrap(), 0);
    assert_eq!(std::fs::read_to_string(output.path()).unwrap(), "hi\n");
}

#[test]
#[serial]
fn test_system() {
    assert_eq!(Executable::system("echo one two").unwrap(), "one two\n");
    assert_eq!(Executable::system("exit 3").unwrap_err().exit_status(), Some(3));
}

#[test]
#[serial]
fn test_capture_unaffected_by_concurrent_spawns() {
    // other code in the process forking long-lived children must never
    // inherit a capture pipe and hold its drain open
    let stop = Arc::new(AtomicBool::new(false));
    let spawners: Vec<_> = (0..2)
        .map(|_| {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut children = Vec::new();
                while !stop.load(Ordering::Relaxed) {
                    if let Ok(child) = Command::new("/bin/sleep").arg("1").spawn() {
                        children.push(child);
                    }
                    children.retain_mut(|c| !matches!(c.try_wait(), Ok(Some(_))));
                    thread::sleep(Duration::from_millis(5));
                }
                for mut child in children {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            })
        })
        .collect();

    let mut worst = Duration::ZERO;
    for _ in 0..500 {
        let start = Instant::now();
        let out = Executable::system("true");
        worst = worst.max(start.elapsed());
        if out.is_err() {
            stop.store(true, Ordering::Relaxed);
        }
        assert_eq!(out.unwrap(), "");
    }

    stop.store(true, Ordering::Relaxed);
    for spawner in spawners {
        spawner.join().unwrap();
    }
    assert!(worst < Duration::from_millis(500), "capture stalled for {worst:?}");
}

proptest! {
    #[test]
    fn prop_command_line_joins_with_spaces(params in prop::collection::vec("[a-z0-9]{1,8}", 0..6)) {
        let line = Executable::new("/bin/echo").command_line(&params);
        let mut expected = vec!["/bin/echo".to_string()];
        expected.extend(params.iter().cloned());
        prop_assert_eq!(line, expected.join(" "));
    }
}
