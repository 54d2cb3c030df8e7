/*!
 * String Vector Properties
 * Token round trips, argument sizing and pointer lists
 */

use batch_launcher::core::limits::ARG_BUFFER_PAGES;
use batch_launcher::memory::{system_page_size, AllocatorConfig, GrowthAllocator, MemoryError};
use batch_launcher::vector::StringVector;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::ffi::CStr;

const WORD: usize = std::mem::size_of::<usize>();

fn allocator() -> GrowthAllocator {
    GrowthAllocator::new(AllocatorConfig::default())
}

fn token() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=255, 0..64)
}

proptest! {
    /// Tokens read back byte for byte, terminators and padding accounted
    #[test]
    fn tokens_read_back(tokens in prop::collection::vec(token(), 0..300)) {
        let vector = StringVector::from_tokens(allocator(), &tokens).unwrap();

        prop_assert_eq!(vector.count(), tokens.len());
        for (i, expected) in tokens.iter().enumerate() {
            prop_assert_eq!(vector.get(i), Some(expected.as_slice()));
            prop_assert_eq!(vector.get_cstr(i).map(CStr::to_bytes), Some(expected.as_slice()));
        }
        prop_assert_eq!(vector.get(tokens.len()), None);

        let arena: usize = tokens.iter().map(|t| (t.len() + 1).div_ceil(WORD) * WORD).sum();
        prop_assert_eq!(vector.used(), arena);
        prop_assert_eq!(vector.argv_size(), arena + tokens.len() * WORD);
    }

    /// Any token containing a NUL is rejected and leaves the vector unchanged
    #[test]
    fn interior_nul_rejected(prefix in token(), suffix in token()) {
        let mut vector = StringVector::from_tokens(allocator(), ["keep"]).unwrap();
        let used = vector.used();

        let mut bad = prefix.clone();
        bad.push(0);
        bad.extend_from_slice(&suffix);

        let err = vector.append(&bad).unwrap_err();
        prop_assert_eq!(err, MemoryError::InteriorNul { position: prefix.len() });
        prop_assert_eq!(vector.count(), 1);
        prop_assert_eq!(vector.used(), used);
    }
}

#[test]
fn test_lengths_up_to_argument_ceiling() {
    let ceiling = ARG_BUFFER_PAGES * system_page_size();
    let mut vector = StringVector::new(allocator());
    let lengths = [0, 1, WORD - 1, WORD, 4095, 4096, ceiling / 2, ceiling - 1];

    for &len in &lengths {
        vector.append(&vec![b'x'; len]).unwrap();
    }
    for (i, &len) in lengths.iter().enumerate() {
        let token = vector.get(i).unwrap();
        assert_eq!(token.len(), len);
        assert!(token.iter().all(|&b| b == b'x'));
    }
}

#[test]
fn test_pointer_list_matches_tokens() {
    let vector = StringVector::from_tokens(allocator(), ["ls", "-l", "", "/tmp"]).unwrap();
    let list = vector.to_pointer_list();
    assert_eq!(list.len(), 5);
    assert!(list.as_slice()[4].is_null());

    let read: Vec<&[u8]> = list.as_slice()[..4]
        .iter()
        // SAFETY: the list borrows `vector`, whose arena holds terminated strings.
        .map(|&p| unsafe { CStr::from_ptr(p) }.to_bytes())
        .collect();
    assert_eq!(read, vec![&b"ls"[..], b"-l", b"", b"/tmp"]);
}

#[test]
fn test_extend_from_and_clone() {
    let source = StringVector::from_tokens(allocator(), ["a", "b", "c", "d"]).unwrap();
    let mut target = StringVector::from_tokens(allocator(), ["prog"]).unwrap();
    assert_eq!(target.extend_from(&source, 1, 10), 3);

    let copy = target.try_clone().unwrap();
    target.append(b"e").unwrap();

    assert_eq!(
        copy.iter().collect::<Vec<_>>(),
        vec![&b"prog"[..], b"b", b"c", b"d"]
    );
    assert_eq!(target.count(), 5);
}

#[test]
fn test_free_twice_is_noop() {
    let mut vector = StringVector::from_tokens(allocator(), ["x", "y"]).unwrap();
    vector.free();
    vector.free();
    assert_eq!(vector.count(), 0);
    assert_eq!(vector.used(), 0);
    assert_eq!(vector.allocated(), 0);
    assert!(vector.get(0).is_none());
}

#[test]
fn test_secure_wipe_config_round_trip() {
    let config = AllocatorConfig::default()
        .with_secure_free(true)
        .with_zero_fill_alloc(true);
    let mut vector = StringVector::from_tokens(GrowthAllocator::new(config), ["secret"]).unwrap();
    assert_eq!(vector.get(0), Some(&b"secret"[..]));
    vector.free();
    assert!(vector.is_empty());
}
