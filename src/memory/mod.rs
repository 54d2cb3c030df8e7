/*!
 * Memory Module
 * Block geometry and the growth-policy allocator
 */

pub mod allocator;
pub mod geometry;
pub mod types;

// Re-export for convenience
pub use allocator::{AllocatorConfig, GrowthAllocator, RawRegion, REGION_ALIGN};
pub use geometry::{system_page_size, MemoryGeometry};
pub use types::*;
