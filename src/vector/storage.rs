/*!
 * Storage Strategies
 * Heap-growable and fixed in-place backing stores for bounded arrays
 */

use crate::core::num::{checked_add, word_align};
use crate::memory::{GrowthAllocator, MemoryError, MemoryResult, RawRegion, REGION_ALIGN};
use std::marker::PhantomData;
use std::mem::{align_of, size_of, MaybeUninit};

/// Slot size of `T` inside a heap store
#[inline]
pub const fn slot_size<T>() -> usize {
    let aligned = word_align(size_of::<T>());
    if aligned == 0 {
        1
    } else {
        aligned
    }
}

/// Backing store of a [`BoundedArray`](super::BoundedArray)
///
/// A store only knows about slots; bookkeeping of how many are in use
/// belongs to the array.
pub trait Storage<T: Copy> {
    /// Slots available without growing
    fn capacity(&self) -> usize;

    /// Bytes one automatic growth step asks for
    fn growth_step(&self) -> MemoryResult<usize>;

    /// Grow by at least `bytes`, never beyond `max_slots` slots
    ///
    /// On error the store is unchanged.
    fn grow_bytes(&mut self, bytes: usize, max_slots: usize) -> MemoryResult<()>;

    /// Store `value` in slot `index` (must be below `capacity()`)
    fn write(&mut self, index: usize, value: T) -> MemoryResult<()>;

    /// Load slot `index`
    ///
    /// # Safety
    ///
    /// `index < capacity()` and the slot has been written.
    unsafe fn read(&self, index: usize) -> T;

    /// Independent copy holding the first `len` slots
    fn try_clone(&self, len: usize) -> MemoryResult<Self>
    where
        Self: Sized;

    /// Drop all capacity; a no-op when already released
    fn release(&mut self);
}

/// Allocator-backed, geometrically growing store
#[derive(Debug)]
pub struct HeapStorage<T> {
    allocator: GrowthAllocator,
    growth_factor: u32,
    region: RawRegion,
    _marker: PhantomData<T>,
}

impl<T: Copy> HeapStorage<T> {
    /// Elements must not need more alignment than a region base provides
    const FITS_REGION_ALIGN: () = assert!(
        align_of::<T>() <= REGION_ALIGN,
        "element alignment exceeds the region alignment"
    );

    pub fn new(allocator: GrowthAllocator) -> Self {
        let growth_factor = allocator.geometry().growth_factor();
        Self::with_growth_factor(allocator, growth_factor)
    }

    pub fn with_growth_factor(allocator: GrowthAllocator, growth_factor: u32) -> Self {
        let () = Self::FITS_REGION_ALIGN;
        Self {
            allocator,
            growth_factor,
            region: RawRegion::empty(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn growth_factor(&self) -> u32 {
        self.growth_factor
    }

    #[inline]
    pub fn allocator(&self) -> &GrowthAllocator {
        &self.allocator
    }

    #[inline]
    fn offset(index: usize) -> usize {
        index * slot_size::<T>()
    }
}

impl<T: Copy> Storage<T> for HeapStorage<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.region.len() / slot_size::<T>()
    }

    fn growth_step(&self) -> MemoryResult<usize> {
        self.allocator
            .geometry()
            .calc_growth_ex(slot_size::<T>(), self.growth_factor)
            .ok_or(MemoryError::overflow("computing the growth step"))
    }

    fn grow_bytes(&mut self, bytes: usize, max_slots: usize) -> MemoryResult<()> {
        let old_len = self.region.len();
        let Some(new_len) = self.allocator.plan_growth(old_len, bytes)? else {
            return Ok(());
        };

        let slots = new_len / slot_size::<T>();
        if slots > max_slots {
            return Err(MemoryError::IndexExhausted {
                requested: slots,
                max: max_slots,
            });
        }

        self.allocator.realloc(&mut self.region, old_len, bytes)?;
        Ok(())
    }

    fn write(&mut self, index: usize, value: T) -> MemoryResult<()> {
        if index >= self.capacity() {
            return Err(MemoryError::OutOfBounds {
                index,
                used: self.capacity(),
            });
        }
        // SAFETY: the slot lies inside the region (checked above) and slot
        // sizes are multiples of align_of::<T>() on a 16-aligned base.
        unsafe {
            let ptr = self.region.as_mut_ptr().add(Self::offset(index)) as *mut T;
            ptr.write(value);
        }
        Ok(())
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.capacity());
        let ptr = self.region.as_ptr().add(Self::offset(index)) as *const T;
        ptr.read()
    }

    fn try_clone(&self, len: usize) -> MemoryResult<Self> {
        let mut copy = Self::with_growth_factor(self.allocator, self.growth_factor);
        if self.region.is_empty() {
            return Ok(copy);
        }

        copy.region = self.allocator.alloc(self.region.len())?;
        let bytes = Self::offset(len.min(self.capacity()));
        // SAFETY: the first `len` slots have been written by the owner.
        let content = unsafe { self.region.slice(0, bytes) };
        copy.region.write(0, content)?;
        Ok(copy)
    }

    fn release(&mut self) {
        self.allocator.free(&mut self.region);
    }
}

/// Fixed in-place store of `N` slots; growth always fails
#[derive(Debug, Clone, Copy)]
pub struct InlineStorage<T: Copy, const N: usize> {
    data: [MaybeUninit<T>; N],
}

impl<T: Copy, const N: usize> InlineStorage<T, N> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            // SAFETY: an array of MaybeUninit needs no initialization.
            data: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }
}

impl<T: Copy, const N: usize> Default for InlineStorage<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> Storage<T> for InlineStorage<T, N> {
    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn growth_step(&self) -> MemoryResult<usize> {
        Ok(slot_size::<T>())
    }

    fn grow_bytes(&mut self, bytes: usize, max_slots: usize) -> MemoryResult<()> {
        if bytes == 0 {
            return Ok(());
        }
        let extra = bytes.div_ceil(slot_size::<T>());
        Err(MemoryError::IndexExhausted {
            requested: checked_add(N, extra).unwrap_or(usize::MAX),
            max: N.min(max_slots),
        })
    }

    fn write(&mut self, index: usize, value: T) -> MemoryResult<()> {
        match self.data.get_mut(index) {
            Some(slot) => {
                slot.write(value);
                Ok(())
            }
            None => Err(MemoryError::OutOfBounds { index, used: N }),
        }
    }

    #[inline]
    unsafe fn read(&self, index: usize) -> T {
        self.data.get_unchecked(index).assume_init()
    }

    fn try_clone(&self, _len: usize) -> MemoryResult<Self> {
        Ok(*self)
    }

    fn release(&mut self) {}
}
