/*!
 * Growth-Policy Allocator
 * Block-aligned raw regions with explicit zero-fill and secure-free policies
 *
 * Every region handed out is a whole number of blocks. Growth requests are
 * computed with checked arithmetic; any overflow or refusal leaves the
 * existing region exactly as it was.
 */

use super::geometry::MemoryGeometry;
use super::types::{MemoryError, MemoryResult};
use crate::core::num::checked_add;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use tracing::{debug, trace};

/// Alignment of every region (enough for any fundamental type)
pub const REGION_ALIGN: usize = 16;

/// Allocation policies and geometry
///
/// - `zero_fill_alloc`: newly allocated regions start zeroed
/// - `zero_fill_extend`: the tail added by growth is zeroed
/// - `secure_free`: regions are wiped before they are released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    pub geometry: MemoryGeometry,
    pub zero_fill_alloc: bool,
    pub zero_fill_extend: bool,
    pub secure_free: bool,
}

impl AllocatorConfig {
    pub fn new(geometry: MemoryGeometry) -> Self {
        Self {
            geometry,
            zero_fill_alloc: true,
            zero_fill_extend: true,
            secure_free: true,
        }
    }

    pub fn with_zero_fill_alloc(mut self, enabled: bool) -> Self {
        self.zero_fill_alloc = enabled;
        self
    }

    pub fn with_zero_fill_extend(mut self, enabled: bool) -> Self {
        self.zero_fill_extend = enabled;
        self
    }

    pub fn with_secure_free(mut self, enabled: bool) -> Self {
        self.secure_free = enabled;
        self
    }

    /// Detect the system geometry and apply environment overrides
    ///
    /// Environment variables:
    /// - LAUNCHER_MEMORY_BLOCK: block default in bytes
    /// - LAUNCHER_GROWTH_FACTOR: growth factor (shift)
    /// - LAUNCHER_SECURE_FREE: `0`/`false` disables wipe-before-free
    pub fn from_env() -> Self {
        let detected = MemoryGeometry::detect();

        let block = env_number("LAUNCHER_MEMORY_BLOCK").unwrap_or(detected.block_size());
        let factor = env_number("LAUNCHER_GROWTH_FACTOR")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(detected.growth_factor());
        let secure = std::env::var("LAUNCHER_SECURE_FREE")
            .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
            .unwrap_or(true);

        let geometry = MemoryGeometry::new(detected.page_size(), block, factor);
        debug!(
            page = geometry.page_size(),
            block = geometry.block_size(),
            growth_factor = geometry.growth_factor(),
            secure_free = secure,
            "allocator configured"
        );

        Self::new(geometry).with_secure_free(secure)
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new(MemoryGeometry::default())
    }
}

fn env_number(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Owned, block-aligned raw memory
///
/// A region remembers whether it has to be wiped, so dropping it is always
/// safe and honours the policy it was allocated under. An empty region owns
/// nothing.
#[derive(Debug, Default)]
pub struct RawRegion {
    ptr: Option<NonNull<u8>>,
    len: usize,
    secure: bool,
}

impl RawRegion {
    /// Region that owns no memory
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            len: 0,
            secure: false,
        }
    }

    /// Allocated length in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base pointer, dangling for an empty region
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match self.ptr {
            Some(ptr) => ptr.as_ptr(),
            None => NonNull::<u8>::dangling().as_ptr(),
        }
    }

    /// Mutable base pointer, dangling for an empty region
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self.ptr {
            Some(ptr) => ptr.as_ptr(),
            None => NonNull::<u8>::dangling().as_ptr(),
        }
    }

    /// Copy `bytes` into the region at `offset`
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> MemoryResult<()> {
        let end = checked_add(offset, bytes.len())
            .ok_or(MemoryError::overflow("computing a region write"))?;
        if end > self.len {
            return Err(MemoryError::OutOfBounds {
                index: end,
                used: self.len,
            });
        }
        if !bytes.is_empty() {
            // SAFETY: [offset, end) lies inside the allocation and cannot
            // overlap the borrowed source slice.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    bytes.as_ptr(),
                    self.as_mut_ptr().add(offset),
                    bytes.len(),
                );
            }
        }
        Ok(())
    }

    /// Set `len` bytes starting at `offset` to `byte`
    pub fn fill(&mut self, offset: usize, len: usize, byte: u8) -> MemoryResult<()> {
        let end =
            checked_add(offset, len).ok_or(MemoryError::overflow("computing a region fill"))?;
        if end > self.len {
            return Err(MemoryError::OutOfBounds {
                index: end,
                used: self.len,
            });
        }
        if len > 0 {
            // SAFETY: [offset, end) lies inside the allocation.
            unsafe { std::ptr::write_bytes(self.as_mut_ptr().add(offset), byte, len) };
        }
        Ok(())
    }

    /// Borrow `len` bytes starting at `offset`
    ///
    /// # Safety
    ///
    /// Every byte in the range must have been written (or zero-filled by the
    /// allocator) and the range must lie inside the region.
    #[inline]
    pub unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        if len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.as_ptr().add(offset), len)
    }

    fn layout(len: usize) -> MemoryResult<Layout> {
        Layout::from_size_align(len, REGION_ALIGN)
            .map_err(|_| MemoryError::overflow("building an allocation layout"))
    }

    fn wipe(&mut self) {
        let base = self.as_mut_ptr();
        for i in 0..self.len {
            // SAFETY: i < len, inside the allocation. Volatile so the stores
            // survive the deallocation that follows.
            unsafe { std::ptr::write_volatile(base.add(i), 0) };
        }
        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
    }

    /// Wipe (when required) and release the memory; a no-op when empty
    fn release(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            self.len = 0;
            return;
        };

        if self.secure {
            self.ptr = Some(ptr);
            self.wipe();
            self.ptr = None;
        }

        if let Ok(layout) = Self::layout(self.len) {
            // SAFETY: ptr was produced by the global allocator with this
            // exact layout and is released exactly once (taken above).
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
        self.len = 0;
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        self.release();
    }
}

/// Allocator applying block alignment, geometric growth and zero policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthAllocator {
    config: AllocatorConfig,
}

impl GrowthAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    #[inline]
    pub fn geometry(&self) -> &MemoryGeometry {
        &self.config.geometry
    }

    /// Allocate at least `requested` bytes, rounded up to whole blocks
    ///
    /// A zero-byte request yields an empty region.
    pub fn alloc(&self, requested: usize) -> MemoryResult<RawRegion> {
        let len = self
            .geometry()
            .block_align(requested)
            .ok_or(MemoryError::overflow("rounding an allocation to blocks"))?;
        if len == 0 {
            return Ok(RawRegion::empty());
        }

        let layout = RawRegion::layout(len)?;
        // SAFETY: layout has a non-zero size.
        let raw = unsafe {
            if self.config.zero_fill_alloc {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        let ptr = NonNull::new(raw).ok_or(MemoryError::OutOfMemory { requested: len })?;

        trace!(requested, len, "region allocated");
        Ok(RawRegion {
            ptr: Some(ptr),
            len,
            secure: self.config.secure_free,
        })
    }

    /// Block-aligned size needed to hold `old_len + extend_by` bytes
    ///
    /// `Ok(None)` when the block-aligned capacity of `old_len` already
    /// absorbs the extension (or there is nothing to extend).
    pub fn plan_growth(&self, old_len: usize, extend_by: usize) -> MemoryResult<Option<usize>> {
        if extend_by == 0 {
            return Ok(None);
        }

        let geometry = self.geometry();
        let current = geometry
            .block_align(old_len)
            .ok_or(MemoryError::overflow("aligning the current length"))?;
        let wanted = checked_add(old_len, extend_by)
            .ok_or(MemoryError::overflow("adding the extension"))?;
        if current >= wanted {
            return Ok(None);
        }

        geometry
            .block_align(wanted)
            .map(Some)
            .ok_or(MemoryError::overflow("aligning the grown length"))
    }

    /// Make `region` large enough for `old_len + extend_by` bytes
    ///
    /// `old_len` is the number of bytes the caller is using. Returns whether
    /// the region actually changed. On error the region is untouched.
    pub fn realloc(
        &self,
        region: &mut RawRegion,
        old_len: usize,
        extend_by: usize,
    ) -> MemoryResult<bool> {
        let Some(new_len) = self.plan_growth(old_len, extend_by)? else {
            return Ok(false);
        };
        if new_len <= region.len() {
            return Ok(false);
        }

        let Some(ptr) = region.ptr else {
            *region = self.alloc(new_len)?;
            return Ok(true);
        };

        let old_layout = RawRegion::layout(region.len())?;
        // validates new_len against the alignment before realloc sees it
        RawRegion::layout(new_len)?;

        // SAFETY: ptr/old_layout describe the live allocation; new_len is
        // non-zero and fits a valid layout.
        let raw = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_len) };
        let new_ptr = NonNull::new(raw).ok_or(MemoryError::OutOfMemory { requested: new_len })?;

        let old_region_len = region.len();
        region.ptr = Some(new_ptr);
        region.len = new_len;
        region.secure = self.config.secure_free;

        if self.config.zero_fill_extend {
            region.fill(old_region_len, new_len - old_region_len, 0)?;
        }

        trace!(old = old_region_len, new = new_len, "region grown");
        Ok(true)
    }

    /// Release a region, wiping it first under the secure-free policy
    ///
    /// Releasing an already released region is a no-op.
    pub fn free(&self, region: &mut RawRegion) {
        region.secure = region.secure || self.config.secure_free;
        region.release();
    }
}
