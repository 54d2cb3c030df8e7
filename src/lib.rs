/*!
 * Batch Launcher Library
 * Streams NUL-separated tokens into as few program invocations as the
 * system argument limits allow
 */

pub mod batch;
pub mod cli;
pub mod core;
pub mod memory;
pub mod monitoring;
pub mod process;
pub mod vector;

// Re-exports
pub use batch::{ArgLimits, BatchEngine, InfoReport, RunConfig, SourceSpec, TokenSource};
pub use crate::core::errors::{LaunchError, LaunchResult};
pub use memory::{AllocatorConfig, GrowthAllocator, MemoryError, MemoryGeometry, MemoryResult};
pub use monitoring::init_tracing;
pub use process::{ChildOutcome, Executor, ForkExecutor, WaitPolicy};
pub use vector::{BoundedArray, GrowableArray, InlineArray, StringVector};
