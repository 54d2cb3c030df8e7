/*!
 * Memory Geometry
 * Page size, block size and growth factor, computed once and passed around
 */

use crate::core::limits::{
    BLOCK_SIZE_DEFAULT, GROWTH_FACTOR_DEFAULT, GROWTH_FACTOR_LIMIT, PAGE_SIZE_DEFAULT,
};
use crate::core::num::{checked_mul, is_power_of_two, next_power_of_two, round_up};
use nix::unistd::{sysconf, SysconfVar};
use serde::Serialize;
use tracing::debug;

/// Sizing constants shared by the allocator and every container
///
/// Block size is always a power of two and never smaller than the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryGeometry {
    page_size: usize,
    block_size: usize,
    growth_factor: u32,
}

impl MemoryGeometry {
    /// Build a geometry from raw values, normalizing each one
    ///
    /// - a page size of zero falls back to the default page
    /// - a block default below one default page falls back to the default
    ///   block, other values are raised to the next power of two
    /// - a growth factor outside `(1, word_bits / 2)` falls back to the default
    pub fn new(page_size: usize, block_default: usize, growth_factor: u32) -> Self {
        let page_size = if page_size == 0 {
            PAGE_SIZE_DEFAULT
        } else {
            page_size
        };

        let block_default = if block_default < PAGE_SIZE_DEFAULT {
            BLOCK_SIZE_DEFAULT
        } else if is_power_of_two(block_default) {
            block_default
        } else {
            next_power_of_two(block_default).unwrap_or(BLOCK_SIZE_DEFAULT)
        };

        let growth_factor = if growth_factor > 1 && growth_factor < GROWTH_FACTOR_LIMIT {
            growth_factor
        } else {
            GROWTH_FACTOR_DEFAULT
        };

        Self {
            page_size,
            block_size: block_default.max(page_size),
            growth_factor,
        }
    }

    /// Query the system page size once and combine it with the defaults
    pub fn detect() -> Self {
        Self::with_defaults(system_page_size())
    }

    /// Default block and growth factor on top of a given page size
    pub fn with_defaults(page_size: usize) -> Self {
        Self::new(page_size, BLOCK_SIZE_DEFAULT, GROWTH_FACTOR_DEFAULT)
    }

    #[inline]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub const fn growth_factor(&self) -> u32 {
        self.growth_factor
    }

    /// Round a length up to whole blocks; zero stays zero
    #[inline]
    pub fn block_align(&self, length: usize) -> Option<usize> {
        if length == 0 {
            return Some(0);
        }
        round_up(length, self.block_size)
    }

    /// Bytes to pre-reserve for repeated appends of `item_size`-byte items
    pub fn calc_growth(&self, item_size: usize) -> Option<usize> {
        self.calc_growth_ex(item_size, self.growth_factor)
    }

    /// `calc_growth` with an explicit growth factor
    ///
    /// Small items get one block; larger ones get `item_size << factor`
    /// rounded to whole blocks.
    pub fn calc_growth_ex(&self, item_size: usize, growth_factor: u32) -> Option<usize> {
        if growth_factor >= usize::BITS {
            return None;
        }
        if item_size > (self.block_size >> growth_factor) {
            let scaled = checked_mul(item_size, 1usize << growth_factor)?;
            return self.block_align(scaled);
        }
        Some(self.block_size)
    }
}

impl Default for MemoryGeometry {
    fn default() -> Self {
        Self::with_defaults(PAGE_SIZE_DEFAULT)
    }
}

/// System page size, falling back to the default page
pub fn system_page_size() -> usize {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(len)) if len > 0 => len as usize,
        other => {
            debug!(result = ?other, "sysconf(PAGE_SIZE) unavailable, using default page");
            PAGE_SIZE_DEFAULT
        }
    }
}
