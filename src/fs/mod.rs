/*!
 * Filesystem Module
 * Named targets, owned descriptors and FIFO messaging
 */

pub mod descriptor;
pub mod fifo;
pub mod file;

pub use descriptor::Descriptor;
pub use fifo::FifoConnection;
pub use file::File;
