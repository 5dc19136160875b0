/*!
 * POSIX System Library
 * Descriptors, process handles, fork/exec launches and memory-mapped files
 */

pub mod core;
pub mod fs;
pub mod memory;
pub mod monitoring;
pub mod process;

// Re-exports
pub use crate::core::{EnvMap, RawPid, SystemError, SystemResult};
pub use fs::{Descriptor, FifoConnection, File};
pub use memory::{page_size, MapFile};
pub use monitoring::{init_tracing, OsCallSpan};
pub use process::{exit_pretty, exit_text, Executable, Process};
