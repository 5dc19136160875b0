/*!
 * System Limits and Constants
 *
 * Centralized location for buffer sizes, exit codes and fixed paths.
 * Organized by subsystem.
 */

use std::time::Duration;

// =============================================================================
// PROCESS LAUNCHING
// =============================================================================

/// Chunk size used to drain captured pipes
/// Outputs larger than one chunk are concatenated across reads
pub const PIPE_READ_CHUNK: usize = 4096;

/// Exit status of a child whose exec (or stdio wiring) failed
pub const EXEC_FAILURE_STATUS: i32 = libc::EXIT_FAILURE;

/// Shell used by `Executable::system`
pub const SHELL_COMMAND: &str = "/bin/sh";

/// Shell flag introducing the command string
pub const SHELL_COMMAND_PARAM: &str = "-c";

// =============================================================================
// EXIT CODE RANGES
// =============================================================================

/// First sysexits code (EX_USAGE)
pub const SYSEXITS_BASE: i32 = 64;

/// Last sysexits code (EX_CONFIG)
pub const SYSEXITS_MAX: i32 = 78;

/// Lowest test-manager result code
pub const TEST_EXIT_BASE: i32 = 182;

/// Highest test-manager result code
pub const TEST_EXIT_MAX: i32 = 186;

// =============================================================================
// FIFO CONNECTIONS
// =============================================================================

/// Upper bound (exclusive) on a single FIFO message
pub const FIFO_MAX_MESSAGE_LEN: usize = 512;

/// Sleep between empty reads of a FIFO
pub const FIFO_POLL_INTERVAL: Duration = Duration::from_millis(100);
