/*!
 * Bounded Array Properties
 * Append/get/clone behaviour over generated inputs
 */

use batch_launcher::memory::{AllocatorConfig, GrowthAllocator, MemoryError};
use batch_launcher::vector::{GrowableArray, InlineArray};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn allocator() -> GrowthAllocator {
    GrowthAllocator::new(AllocatorConfig::default())
}

proptest! {
    /// N appends give N elements, in order, and nothing past the end
    #[test]
    fn appended_values_read_back(values in prop::collection::vec(any::<u64>(), 0..2000)) {
        let mut array = GrowableArray::<u64>::with_allocator(allocator());
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(array.append(value).unwrap(), i);
        }

        prop_assert_eq!(array.used(), values.len());
        prop_assert!(array.allocated() >= array.used());
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(array.get(i), Some(value));
        }
        prop_assert_eq!(array.get(values.len()), None);
    }

    /// Small growth factors still reach any length
    #[test]
    fn growth_factor_does_not_change_content(
        values in prop::collection::vec(any::<u16>(), 1..500),
        factor in 0u32..4,
    ) {
        let mut array = GrowableArray::<u16>::with_growth_factor(allocator(), factor);
        for &value in &values {
            array.append(value).unwrap();
        }
        prop_assert_eq!(array.iter().collect::<Vec<_>>(), values);
    }

    /// A clone is independent of later writes to the original
    #[test]
    fn clone_is_independent(values in prop::collection::vec(any::<i32>(), 1..300)) {
        let mut array = GrowableArray::<i32>::with_allocator(allocator());
        for &value in &values {
            array.append(value).unwrap();
        }
        let copy = array.try_clone().unwrap();
        array.set(0, values[0].wrapping_add(1)).unwrap();
        array.append(7).unwrap();

        prop_assert_eq!(copy.used(), values.len());
        prop_assert_eq!(copy.get(0), Some(values[0]));
    }

    /// extend_from copies exactly the requested window
    #[test]
    fn extend_from_window(
        values in prop::collection::vec(any::<u8>(), 0..200),
        begin in 0usize..220,
        count in 0usize..220,
    ) {
        let mut source = GrowableArray::<u8>::with_allocator(allocator());
        for &value in &values {
            source.append(value).unwrap();
        }

        let mut target = GrowableArray::<u8>::with_allocator(allocator());
        let copied = target.extend_from(&source, begin, count);
        let expected: Vec<u8> = values.iter().copied().skip(begin).take(count).collect();

        prop_assert_eq!(copied, expected.len());
        prop_assert_eq!(target.iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn test_inline_array_is_bounded() {
    let mut array = InlineArray::<u32, 4>::inline();
    for value in 0..4 {
        array.append(value).unwrap();
    }
    let err = array.append(4).unwrap_err();
    assert!(matches!(err, MemoryError::IndexExhausted { .. }));
    assert_eq!(array.used(), 4);
    assert_eq!(array.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn test_walk_orders() {
    let mut array = GrowableArray::<usize>::with_allocator(allocator());
    for value in [10, 20, 30] {
        array.append(value).unwrap();
    }

    let mut forward = Vec::new();
    array.walk(|i, v| forward.push((i, v)));
    let mut backward = Vec::new();
    array.rwalk(|i, v| backward.push((i, v)));

    assert_eq!(forward, vec![(0, 10), (1, 20), (2, 30)]);
    assert_eq!(backward, vec![(2, 30), (1, 20), (0, 10)]);
}

#[test]
fn test_free_twice_is_noop() {
    let mut array = GrowableArray::<u64>::with_allocator(allocator());
    array.append(1).unwrap();
    array.free();
    array.free();
    assert_eq!(array.used(), 0);
    assert_eq!(array.allocated(), 0);
    assert_eq!(array.get(0), None);

    array.append(2).unwrap();
    assert_eq!(array.get(0), Some(2));
}
