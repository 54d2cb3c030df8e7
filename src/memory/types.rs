/*!
 * Memory Types
 * Common types for allocation and container capacity
 */

use nix::errno::Errno;
use serde::Serialize;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory and container errors
///
/// `Overflow` and `IndexExhausted` form the "too large" class and are kept
/// apart from `OutOfMemory`, which means the system refused a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("Size overflow while {context}")]
    Overflow { context: &'static str },

    #[error("Index space exhausted: requested capacity {requested}, maximum {max}")]
    IndexExhausted { requested: usize, max: usize },

    #[error("Declared length {declared} exceeds the {available} bytes supplied")]
    InvalidLength { declared: usize, available: usize },

    #[error("Interior NUL byte at offset {position}")]
    InteriorNul { position: usize },

    #[error("Index {index} out of bounds (used {used})")]
    OutOfBounds { index: usize, used: usize },
}

impl MemoryError {
    /// Shorthand for an overflow during a named computation
    pub const fn overflow(context: &'static str) -> Self {
        MemoryError::Overflow { context }
    }

    /// Whether this is a capacity/overflow condition rather than a refusal
    pub const fn is_too_large(&self) -> bool {
        matches!(
            self,
            MemoryError::Overflow { .. } | MemoryError::IndexExhausted { .. }
        )
    }

    /// OS error number matching this condition
    pub const fn errno(&self) -> Errno {
        match self {
            MemoryError::OutOfMemory { .. } => Errno::ENOMEM,
            MemoryError::Overflow { .. } | MemoryError::IndexExhausted { .. } => Errno::E2BIG,
            MemoryError::InvalidLength { .. }
            | MemoryError::InteriorNul { .. }
            | MemoryError::OutOfBounds { .. } => Errno::EINVAL,
        }
    }
}

/// Used/allocated pair of a growable container
///
/// `used <= allocated` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capacity {
    pub used: usize,
    pub allocated: usize,
}

impl Capacity {
    pub const fn new(used: usize, allocated: usize) -> Self {
        Self { used, allocated }
    }

    /// Slots (or bytes) still available without growing
    pub const fn remaining(&self) -> usize {
        self.allocated - self.used
    }

    pub const fn is_full(&self) -> bool {
        self.used == self.allocated
    }
}
