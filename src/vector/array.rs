/*!
 * Bounded Array
 * Append-only array with a fenced index space over a pluggable store
 */

use super::storage::{slot_size, HeapStorage, InlineStorage, Storage};
use crate::core::num::{checked_add, checked_mul, msb_position, WORD_BITS};
use crate::core::types::Index;
use crate::memory::{Capacity, GrowthAllocator, MemoryError, MemoryResult};

/// Append-only array of `T` over the store `S`
///
/// The top `fence_bits` bits of the index type are never used for content,
/// so the largest valid index is `usize::MAX >> fence_bits` and capacity
/// growth can be refused before any index arithmetic could wrap.
#[derive(Debug)]
pub struct BoundedArray<T: Copy, S: Storage<T>> {
    storage: S,
    used: usize,
    fence_bits: u32,
    max_index: usize,
    waterfall: usize,
    _marker: std::marker::PhantomData<T>,
}

/// Heap-backed array growing by the allocator's geometric policy
pub type GrowableArray<T> = BoundedArray<T, HeapStorage<T>>;

/// Array with `N` in-place slots
pub type InlineArray<T, const N: usize> = BoundedArray<T, InlineStorage<T, N>>;

impl<T: Copy> BoundedArray<T, HeapStorage<T>> {
    /// Empty heap array using the allocator's growth factor
    pub fn with_allocator(allocator: GrowthAllocator) -> Self {
        Self::from_storage(HeapStorage::new(allocator))
    }

    /// Empty heap array with its own growth factor
    pub fn with_growth_factor(allocator: GrowthAllocator, growth_factor: u32) -> Self {
        Self::from_storage(HeapStorage::with_growth_factor(allocator, growth_factor))
    }
}

impl<T: Copy, const N: usize> BoundedArray<T, InlineStorage<T, N>> {
    pub fn inline() -> Self {
        Self::from_storage(InlineStorage::new())
    }
}

impl<T: Copy, const N: usize> Default for BoundedArray<T, InlineStorage<T, N>> {
    fn default() -> Self {
        Self::inline()
    }
}

impl<T: Copy, S: Storage<T>> BoundedArray<T, S> {
    /// Wrap an empty store
    pub fn from_storage(storage: S) -> Self {
        let fence_bits = msb_position(slot_size::<T>());
        let idx_bits = WORD_BITS - fence_bits;
        Self {
            storage,
            used: 0,
            fence_bits,
            max_index: usize::MAX >> fence_bits,
            waterfall: 1usize << (idx_bits - 1),
            _marker: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn allocated(&self) -> usize {
        self.storage.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        Capacity::new(self.used, self.allocated())
    }

    /// Largest index the fence allows
    #[inline]
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    #[inline]
    pub fn fence_bits(&self) -> u32 {
        self.fence_bits
    }

    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn next_count(&self) -> MemoryResult<usize> {
        if self.used < self.waterfall {
            return Ok(self.used + 1);
        }
        checked_add(self.used, 1)
            .filter(|&n| n <= self.max_index)
            .ok_or(MemoryError::IndexExhausted {
                requested: self.used.saturating_add(1),
                max: self.max_index,
            })
    }

    /// Append `value`, growing when full; returns its index
    ///
    /// On error the array is unchanged.
    pub fn append(&mut self, value: T) -> MemoryResult<Index> {
        let next = self.next_count()?;
        if self.used == self.allocated() {
            self.grow_auto()?;
        }
        self.storage.write(self.used, value)?;

        let index = self.used;
        self.used = next;
        Ok(index)
    }

    /// Make room for one more element without writing it
    pub fn reserve_one(&mut self) -> MemoryResult<()> {
        self.next_count()?;
        if self.used == self.allocated() {
            self.grow_auto()?;
        }
        Ok(())
    }

    /// Element at `index`, bounded by `used()`
    #[inline]
    pub fn get(&self, index: Index) -> Option<T> {
        if index < self.used {
            // SAFETY: every index below `used` was written by append/set.
            Some(unsafe { self.storage.read(index) })
        } else {
            None
        }
    }

    /// Overwrite the element at `index`
    pub fn set(&mut self, index: Index, value: T) -> MemoryResult<()> {
        if index >= self.used {
            return Err(MemoryError::OutOfBounds {
                index,
                used: self.used,
            });
        }
        self.storage.write(index, value)
    }

    /// One automatic growth step
    pub fn grow_auto(&mut self) -> MemoryResult<()> {
        let bytes = self.storage.growth_step()?;
        self.grow_by_bytes(bytes)
    }

    /// Reserve room for `count` more elements
    pub fn grow_by_count(&mut self, count: usize) -> MemoryResult<()> {
        let bytes = checked_mul(count, slot_size::<T>())
            .ok_or(MemoryError::overflow("sizing a growth by element count"))?;
        self.grow_by_bytes(bytes)
    }

    /// Reserve at least `bytes` more bytes, rounded to whole blocks
    pub fn grow_by_bytes(&mut self, bytes: usize) -> MemoryResult<()> {
        // capacity never exceeds max_index slots
        self.storage.grow_bytes(bytes, self.max_index)
    }

    /// Append `count` elements of `other` starting at `begin`
    ///
    /// Stops at the first element that cannot be read or appended and
    /// returns how many were copied. Fewer than `count` is a partial failure.
    pub fn extend_from<S2: Storage<T>>(
        &mut self,
        other: &BoundedArray<T, S2>,
        begin: Index,
        count: usize,
    ) -> usize {
        let mut copied = 0;
        while copied < count {
            let Some(value) = begin.checked_add(copied).and_then(|i| other.get(i)) else {
                break;
            };
            if self.append(value).is_err() {
                break;
            }
            copied += 1;
        }
        copied
    }

    /// Visit `(index, value)` from first to last
    pub fn walk<F: FnMut(Index, T)>(&self, mut visitor: F) {
        for index in 0..self.used {
            // SAFETY: index < used.
            visitor(index, unsafe { self.storage.read(index) });
        }
    }

    /// Visit `(index, value)` from last to first
    pub fn rwalk<F: FnMut(Index, T)>(&self, mut visitor: F) {
        for index in (0..self.used).rev() {
            // SAFETY: index < used.
            visitor(index, unsafe { self.storage.read(index) });
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + '_ {
        // SAFETY: index < used.
        (0..self.used).map(move |index| unsafe { self.storage.read(index) })
    }

    /// Independent copy with the same content
    pub fn try_clone(&self) -> MemoryResult<Self> {
        let storage = self.storage.try_clone(self.used)?;
        Ok(Self {
            storage,
            used: self.used,
            fence_bits: self.fence_bits,
            max_index: self.max_index,
            waterfall: self.waterfall,
            _marker: std::marker::PhantomData,
        })
    }

    /// Release all storage; calling it again is a no-op
    pub fn free(&mut self) {
        self.storage.release();
        self.used = 0;
    }
}
