/*!
 * Process Module
 * Process handles, exit status and fork/exec orchestration
 */

pub mod executable;
pub mod handle;
mod launch;
pub mod marshal;
mod pipes;
mod signals;
pub mod status;

// Re-export for convenience
pub use executable::Executable;
pub use handle::Process;
pub use marshal::CStringArray;
pub use status::{exit_pretty, exit_text, interpret_wait_status};
