/*!
 * Descriptor Tests
 * Creation permissions, flag derivation and handle leaks
 */

use nix::fcntl::OFlag;
use nix::sys::stat::{umask, Mode};
use posix_system::{Descriptor, Executable, File, SystemError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;

fn mode_of(file: &File) -> u32 {
    std::fs::metadata(file.path()).unwrap().permissions().mode() & 0o777
}

#[test]
#[serial]
fn test_create_ignores_umask() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("created"));

    let previous = umask(Mode::from_bits_truncate(0o077));
    let result = Descriptor::open(&file, Descriptor::flags(false, true), Mode::from_bits_truncate(0o644));
    umask(previous);

    let mut descriptor = result.unwrap();
    descriptor.close().unwrap();
    assert_eq!(mode_of(&file), 0o644);
}

#[test]
#[serial]
fn test_existing_file_keeps_its_mode() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("existing"));
    std::fs::write(file.path(), b"x").unwrap();
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();

    let mut descriptor =
        Descriptor::open(&file, Descriptor::flags(true, true), Mode::from_bits_truncate(0o644)).unwrap();
    descriptor.close().unwrap();
    assert_eq!(mode_of(&file), 0o600);
}

#[test]
#[serial]
fn test_drop_closes_handle() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("dropped"));

    let raw = {
        let descriptor =
            Descriptor::open(&file, Descriptor::flags(true, true), Mode::from_bits_truncate(0o600)).unwrap();
        descriptor.fd().unwrap()
    };
    assert_eq!(
        nix::fcntl::fcntl(raw, nix::fcntl::FcntlArg::F_GETFD),
        Err(nix::errno::Errno::EBADF)
    );
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_open_drop_cycles_leak_no_handles() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("cycled"));
    let before = open_handles();

    for _ in 0..100 {
        let descriptor =
            Descriptor::open(&file, Descriptor::flags(true, true), Mode::from_bits_truncate(0o600)).unwrap();
        assert!(descriptor.is_open());
    }
    for _ in 0..100 {
        let mut descriptor =
            Descriptor::open(&file, Descriptor::flags(true, false), Mode::empty()).unwrap();
        descriptor.close_safe();
    }

    assert_eq!(open_handles(), before);
}

#[test]
#[serial]
fn test_open_error_names_file() {
    let err = Descriptor::open(
        &File::new("/nonexistent/dir/file"),
        Descriptor::flags(true, false),
        Mode::empty(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Can not open file \"/nonexistent/dir/file\" (ENOENT: No such file or directory)");
}

#[cfg(target_os = "linux")]
fn open_handles() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_launches_leak_no_handles() {
    let dir = tempfile::tempdir().unwrap();
    let output = File::new(dir.path().join("out"));
    let before = open_handles();

    Executable::system("echo quiet").unwrap();
    let _ = Executable::system("exit 2");
    let child = Executable::new("/bin/true")
        .pipe_out::<&str>(&[], &File::new("/dev/null"), &output, &output, Mode::from_bits_truncate(0o600))
        .unwrap();
    child.join(true).unwrap();
    let missing = Executable::new("/bin/true").pipe_out::<&str>(
        &[],
        &File::new(dir.path().join("missing")),
        &output,
        &output,
        Mode::from_bits_truncate(0o600),
    );
    assert!(matches!(missing, Err(SystemError::OpenFailed { .. })));

    assert_eq!(open_handles(), before);
}

proptest! {
    #[test]
    fn prop_flags_follow_access_table(read in any::<bool>(), write in any::<bool>()) {
        let flags = Descriptor::flags(read, write);
        prop_assert_eq!(flags.contains(OFlag::O_CREAT), write);
        let access = flags & OFlag::O_ACCMODE;
        let expected = match (read, write) {
            (true, true) => OFlag::O_RDWR,
            (false, true) => OFlag::O_WRONLY,
            _ => OFlag::O_RDONLY,
        };
        prop_assert_eq!(access, expected);
    }
}
