/*!
 * Monitoring
 * Tracing initialization and diagnostic reporting
 */

pub mod diagnostics;
mod tracer;

pub use diagnostics::{log, log_path_error, log_with_error};
pub use tracer::{init_tracing, DEFAULT_FILTER};
