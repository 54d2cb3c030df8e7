/*!
 * Vector Module
 * Bounded arrays over pluggable storage and the string vector built on them
 */

pub mod array;
pub mod storage;
pub mod strvec;

// Re-export for convenience
pub use array::{BoundedArray, GrowableArray, InlineArray};
pub use storage::{slot_size, HeapStorage, InlineStorage, Storage};
pub use strvec::{PointerList, StringVector};
