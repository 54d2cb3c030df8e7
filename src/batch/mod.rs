/*!
 * Batch Module
 * Argument limits, token sources and the batching engine
 */

pub mod config;
pub mod engine;
pub mod limits;
pub mod source;
pub mod tokenizer;

// Re-export for convenience
pub use config::{c_arg, OversizedPolicy, RunConfig, SourceSpec};
pub use engine::BatchEngine;
pub use limits::{environment_size, system_arg_max, ArgLimits, InfoReport};
pub use source::{FileIdentity, TokenSource};
pub use tokenizer::TokenReader;
