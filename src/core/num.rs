/*!
 * Numeric Primitives
 * Overflow-checked arithmetic, alignment rounding and power-of-two helpers
 *
 * Every size computation in the allocator and the containers goes through
 * these helpers. None of them wraps: overflow is reported as `None`.
 */

/// Width of the working unsigned integer in bits
pub const WORD_BITS: u32 = usize::BITS;

/// Add two sizes, `None` on overflow
#[inline]
#[must_use]
pub const fn checked_add(a: usize, b: usize) -> Option<usize> {
    a.checked_add(b)
}

/// Multiply two sizes, `None` on overflow
#[inline]
#[must_use]
pub const fn checked_mul(a: usize, b: usize) -> Option<usize> {
    a.checked_mul(b)
}

/// Number of set bits
#[inline]
#[must_use]
pub const fn popcount(x: usize) -> u32 {
    x.count_ones()
}

/// Set every bit below the most significant set bit
///
/// `0` stays `0`; `0b1000` becomes `0b1111`.
#[inline]
#[must_use]
pub const fn fill_below_msb(x: usize) -> usize {
    if x == 0 {
        return 0;
    }
    usize::MAX >> x.leading_zeros()
}

/// One-based position of the most significant set bit, `0` for `0`
#[inline]
#[must_use]
pub const fn msb_position(x: usize) -> u32 {
    popcount(fill_below_msb(x))
}

/// Whether `x` is a power of two (zero is not)
#[inline]
#[must_use]
pub const fn is_power_of_two(x: usize) -> bool {
    popcount(x) == 1
}

/// Smallest power of two strictly greater than every bit of `x`
///
/// `next_power_of_two(0) == 1`, `next_power_of_two(4) == 8`,
/// `next_power_of_two(5) == 8`. Returns `None` when the result does not fit.
#[inline]
#[must_use]
pub const fn next_power_of_two(x: usize) -> Option<usize> {
    if x == 0 {
        return Some(1);
    }
    checked_add(fill_below_msb(x), 1)
}

/// Largest power of two not greater than `x`
///
/// `current_power_of_two(0) == 0`, `current_power_of_two(6) == 4`.
#[inline]
#[must_use]
pub const fn current_power_of_two(x: usize) -> usize {
    if x == 0 {
        return 0;
    }
    fill_below_msb(x >> 1) + 1
}

/// Round `value` up to a multiple of `alignment`
///
/// Alignments below two are the identity. Powers of two use masking, any
/// other alignment uses the remainder. `None` if the rounded value would
/// exceed `usize::MAX`.
#[inline]
#[must_use]
pub const fn round_up(value: usize, alignment: usize) -> Option<usize> {
    if alignment < 2 {
        return Some(value);
    }

    let rem = if is_power_of_two(alignment) {
        value & (alignment - 1)
    } else {
        value % alignment
    };

    if rem == 0 {
        return Some(value);
    }

    checked_add(value - rem, alignment)
}

/// Slot size for an item of `item_size` bytes
///
/// Powers of two are kept, sizes above a machine word are rounded to a word
/// multiple and smaller sizes go to the next power of two. Zero maps to zero.
#[inline]
#[must_use]
pub const fn word_align(item_size: usize) -> usize {
    const WORD: usize = std::mem::size_of::<usize>();

    if item_size == 0 {
        return 0;
    }
    if is_power_of_two(item_size) {
        return item_size;
    }
    if item_size > WORD {
        // a multiple of WORD that is > WORD cannot overflow before usize::MAX - WORD
        return match round_up(item_size, WORD) {
            Some(v) => v,
            None => usize::MAX & !(WORD - 1),
        };
    }
    // below one word the next power of two always fits
    fill_below_msb(item_size) + 1
}
