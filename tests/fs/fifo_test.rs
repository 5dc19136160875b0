/*!
 * FIFO Connection Tests
 */

use nix::sys::stat::Mode;
use posix_system::{FifoConnection, SystemError};
use pretty_assertions::assert_eq;
use serial_test::serial;

#[test]
#[serial]
fn test_held_descriptor_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut fifo = FifoConnection::new(dir.path().join("held"));
    fifo.make(Mode::from_bits_truncate(0o600)).unwrap();

    fifo.open_read_write(true).unwrap();
    fifo.send("status").unwrap();
    assert_eq!(fifo.read().unwrap(), "status");
    fifo.close().unwrap();
    fifo.file().remove().unwrap();
}

#[test]
#[serial]
fn test_non_blocking_read_without_writer() {
    let dir = tempfile::tempdir().unwrap();
    let mut fifo = FifoConnection::new(dir.path().join("idle"));
    fifo.make(Mode::from_bits_truncate(0o600)).unwrap();

    fifo.open_read(false).unwrap();
    assert!(!fifo.is_blocking());
    assert_eq!(fifo.read().unwrap(), "");
}

#[test]
fn test_message_length_limits() {
    let fifo = FifoConnection::new("/nonexistent/fifo");
    assert!(matches!(
        fifo.send_message(""),
        Err(SystemError::InvalidMessage { len: 0, .. })
    ));
    assert!(matches!(
        fifo.send_message(&"x".repeat(600)),
        Err(SystemError::InvalidMessage { len: 600, .. })
    ));
}
