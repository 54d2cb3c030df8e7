/*!
 * String Vector
 * Append-only byte arena of NUL-terminated tokens plus an offset index
 *
 * Tokens sit back to back in one arena, each followed by a terminator and
 * zero padding up to the next word boundary, so the arena doubles as a
 * sequence of C strings. Content is stable; addresses are not.
 */

use super::array::GrowableArray;
use crate::core::num::{checked_add, checked_mul, round_up};
use crate::core::types::Index;
use crate::memory::{GrowthAllocator, MemoryError, MemoryResult, RawRegion};
use std::ffi::{c_char, CStr};
use std::marker::PhantomData;
use std::mem::size_of;

const WORD: usize = size_of::<usize>();

/// Growable list of byte strings with a contiguous arena
#[derive(Debug)]
pub struct StringVector {
    allocator: GrowthAllocator,
    arena: RawRegion,
    used: usize,
    offsets: GrowableArray<usize>,
}

impl StringVector {
    pub fn new(allocator: GrowthAllocator) -> Self {
        Self {
            allocator,
            arena: RawRegion::empty(),
            used: 0,
            offsets: GrowableArray::with_allocator(allocator),
        }
    }

    /// Build a vector holding `tokens` in order
    pub fn from_tokens<I, B>(allocator: GrowthAllocator, tokens: I) -> MemoryResult<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut vector = Self::new(allocator);
        for token in tokens {
            vector.append(token.as_ref())?;
        }
        Ok(vector)
    }

    /// Arena bytes in use, terminators and padding included
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Arena bytes allocated
    #[inline]
    pub fn allocated(&self) -> usize {
        self.arena.len()
    }

    /// Number of tokens
    #[inline]
    pub fn count(&self) -> usize {
        self.offsets.used()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Argument space this vector needs: arena bytes plus one pointer per token
    pub fn argv_size(&self) -> usize {
        checked_mul(self.count(), WORD)
            .and_then(|pointers| checked_add(self.used, pointers))
            .unwrap_or(usize::MAX)
    }

    /// Append one token; it must not contain a NUL byte
    ///
    /// On error the content is unchanged.
    pub fn append(&mut self, token: &[u8]) -> MemoryResult<Index> {
        if let Some(position) = token.iter().position(|&b| b == 0) {
            return Err(MemoryError::InteriorNul { position });
        }

        let len = token.len();
        let with_nul =
            checked_add(len, 1).ok_or(MemoryError::overflow("sizing a token terminator"))?;
        let end = checked_add(self.used, with_nul)
            .ok_or(MemoryError::overflow("extending the string arena"))?;
        let new_used =
            round_up(end, WORD).ok_or(MemoryError::overflow("word-aligning the string arena"))?;

        self.offsets.reserve_one()?;
        if new_used > self.arena.len() {
            self.allocator.realloc(&mut self.arena, self.used, with_nul)?;
        }

        let start = self.used;
        self.arena.write(start, token)?;
        self.arena.fill(start + len, new_used - start - len, 0)?;
        let index = self.offsets.append(start)?;
        self.used = new_used;
        Ok(index)
    }

    /// Append the first `length` bytes of `bytes`
    ///
    /// A declared length beyond the supplied bytes is rejected.
    pub fn append_prefix(&mut self, bytes: &[u8], length: usize) -> MemoryResult<Index> {
        match bytes.get(..length) {
            Some(prefix) => self.append(prefix),
            None => Err(MemoryError::InvalidLength {
                declared: length,
                available: bytes.len(),
            }),
        }
    }

    /// Append `count` tokens of `other` starting at `begin`
    ///
    /// Returns how many were copied; fewer than `count` is a partial failure.
    pub fn extend_from(&mut self, other: &StringVector, begin: Index, count: usize) -> usize {
        let mut copied = 0;
        while copied < count {
            let Some(token) = begin.checked_add(copied).and_then(|i| other.get(i)) else {
                break;
            };
            if self.append(token).is_err() {
                break;
            }
            copied += 1;
        }
        copied
    }

    fn slot(&self, index: Index) -> Option<&[u8]> {
        let start = self.offsets.get(index)?;
        let end = self.offsets.get(index + 1).unwrap_or(self.used);
        // SAFETY: [start, end) lies below `used`, all of which was written.
        Some(unsafe { self.arena.slice(start, end - start) })
    }

    /// Token bytes at `index`, without the terminator
    pub fn get(&self, index: Index) -> Option<&[u8]> {
        let slot = self.slot(index)?;
        let len = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
        Some(&slot[..len])
    }

    /// Token at `index` as a C string
    pub fn get_cstr(&self, index: Index) -> Option<&CStr> {
        CStr::from_bytes_until_nul(self.slot(index)?).ok()
    }

    /// Visit `(index, token)` from first to last
    pub fn walk<F: FnMut(Index, &[u8])>(&self, mut visitor: F) {
        for (index, token) in self.iter().enumerate() {
            visitor(index, token);
        }
    }

    /// Visit `(index, token)` from last to first
    pub fn rwalk<F: FnMut(Index, &[u8])>(&self, mut visitor: F) {
        for index in (0..self.count()).rev() {
            if let Some(token) = self.get(index) {
                visitor(index, token);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.count()).filter_map(move |index| self.get(index))
    }

    /// Null-terminated pointer list over the current arena
    ///
    /// The list borrows the vector, so it cannot outlive a mutation.
    pub fn to_pointer_list(&self) -> PointerList<'_> {
        let mut pointers = Vec::with_capacity(self.count() + 1);
        let base = self.arena.as_ptr();
        self.offsets.walk(|_, offset| {
            // SAFETY: every offset is inside the arena.
            pointers.push(unsafe { base.add(offset) } as *const c_char);
        });
        pointers.push(std::ptr::null());
        PointerList {
            pointers,
            _owner: PhantomData,
        }
    }

    /// Independent copy of arena and offsets
    ///
    /// On failure nothing is returned and nothing half-built survives.
    pub fn try_clone(&self) -> MemoryResult<Self> {
        let mut arena = self.allocator.alloc(self.used)?;
        // SAFETY: the first `used` bytes are written.
        arena.write(0, unsafe { self.arena.slice(0, self.used) })?;
        let offsets = self.offsets.try_clone()?;

        Ok(Self {
            allocator: self.allocator,
            arena,
            used: self.used,
            offsets,
        })
    }

    /// Release arena and offsets; calling it again is a no-op
    pub fn free(&mut self) {
        self.allocator.free(&mut self.arena);
        self.offsets.free();
        self.used = 0;
    }
}

/// `argv`-style pointer list borrowed from a [`StringVector`]
#[derive(Debug)]
pub struct PointerList<'a> {
    pointers: Vec<*const c_char>,
    _owner: PhantomData<&'a StringVector>,
}

impl PointerList<'_> {
    /// Pointer to the first entry, suitable for `execv`-family calls
    #[inline]
    pub fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }

    /// Entries including the trailing null
    #[inline]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pointers.len() <= 1
    }

    #[inline]
    pub fn as_slice(&self) -> &[*const c_char] {
        &self.pointers
    }
}
