/*!
 * Guard Traits
 *
 * Core abstractions for RAII guards over OS resources
 */

use crate::core::errors::SystemResult;

/// Core guard trait
///
/// Implemented by every type that owns an OS resource (a descriptor, a
/// memory mapping) and must give it back exactly once.
pub trait Guard {
    /// Resource type name for logging/debugging
    fn resource_type(&self) -> &'static str;

    /// Check if the guarded resource is still held
    fn is_active(&self) -> bool;

    /// Release the resource, reporting OS failures to the caller
    ///
    /// Releasing an inactive guard is a no-op.
    fn release(&mut self) -> SystemResult<()>;
}

/// Guards that clean up on drop
///
/// Separates Drop logic so the no-raise path is testable on its own
pub trait GuardDrop: Guard {
    /// Perform cleanup on drop
    ///
    /// # Panics
    ///
    /// Should NOT panic. Log errors instead.
    fn on_drop(&mut self);
}
