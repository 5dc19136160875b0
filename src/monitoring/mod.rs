/*!
 * Monitoring Module
 * Structured logging setup and OS call spans
 */

pub mod tracer;

pub use tracer::{init_tracing, OsCallSpan};
