/*!
 * Core Types
 * Common types used across the launcher
 */

/// OS process ID type
pub type Pid = i32;

/// Size type for memory operations
pub type Size = usize;

/// Index into a bounded container
pub type Index = usize;

/// Exit status of a launched program (or of the launcher itself)
pub type ExitStatus = i32;
