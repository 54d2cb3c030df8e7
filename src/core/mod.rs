/*!
 * Core Module
 * Fundamental launcher types, numeric primitives and error handling
 */

pub mod errors;
pub mod limits;
pub mod num;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use types::*;
