/*!
 * RAII Resource Guards
 *
 * Owned OS resources release themselves exactly once: explicitly through
 * `Guard::release`, which reports failures, or on drop through
 * `GuardDrop::on_drop`, which only logs them.
 *
 * ## Guarded Resources
 *
 * - **Descriptor**: one open file handle
 * - **MapFile**: a memory mapping plus the descriptor backing it
 */

mod traits;

pub use traits::{Guard, GuardDrop};
