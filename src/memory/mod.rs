/*!
 * Memory Module
 * File-backed memory mappings
 */

pub mod map_file;

pub use map_file::{page_size, MapFile};
