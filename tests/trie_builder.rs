// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

use icu_codepointtrie_builder::{
    format_version, CodePointTrie, Error, MutableCodePointTrie, ValueWidth,
};

const CODE_POINT_MAX: u32 = 0x10_ffff;
const UNICODE_LIMIT: u32 = 0x11_0000;
const BMP_INDEX_LENGTH: usize = 0x1000;
const NO_DATA_NULL_OFFSET: u32 = 0xf_ffff;
const NO_INDEX2_NULL_OFFSET: u16 = 0xffff;

#[test]
fn empty_trie_32() {
    let builder = MutableCodePointTrie::new(0, 0xbad);
    let trie = builder.freeze(ValueWidth::Bits32).unwrap();

    assert_eq!(trie.header().high_start, 0);
    assert_eq!(trie.index_length(), BMP_INDEX_LENGTH);
    assert_eq!(trie.data_length(), 0x80);
    assert_eq!(trie.header().data_null_offset, 0);
    assert_eq!(trie.header().index2_null_offset, NO_INDEX2_NULL_OFFSET);
    check_trie(&trie, &[UNICODE_LIMIT, 0]);
    assert_eq!(trie.get32(0x11_0000), 0xbad);
    assert_eq!(trie.get32(u32::MAX), 0xbad);
}

#[test]
fn two_points_16() {
    let mut builder = MutableCodePointTrie::new(0, u32::MAX);
    builder.set(0x41, 7).unwrap();
    builder.set(0x61, 8).unwrap();
    let check_ranges = [0x41, 0, 0x42, 7, 0x61, 0, 0x62, 8, UNICODE_LIMIT, 0];
    check_builder(&builder, &check_ranges);

    let trie = builder.freeze(ValueWidth::Bits16).unwrap();
    check_trie(&trie, &check_ranges);
    assert_eq!(trie.get32(0x40), 0);
    assert_eq!(trie.get32(0x41), 7);
    assert_eq!(trie.get32(0x61), 8);
    assert_eq!(trie.get32(0x62), 0);
    // The error value does not fit in 16 bits and is preserved anyway.
    assert_eq!(trie.get32(0x11_0000), u32::MAX);
}

#[test]
fn full_range_16() {
    let mut builder = MutableCodePointTrie::new(0, 0);
    builder.set_range(0, CODE_POINT_MAX, 5, true).unwrap();
    let trie = builder.freeze(ValueWidth::Bits16).unwrap();

    // Everything collapses into the high range.
    assert_eq!(trie.header().high_start, 0);
    assert_eq!(trie.header().high_value, 5);
    assert_eq!(trie.index_length(), BMP_INDEX_LENGTH);
    assert_eq!(trie.data_length(), 0x80);
    // No block of initial values survives, so there is no null block.
    assert_eq!(trie.header().data_null_offset, NO_DATA_NULL_OFFSET);
    assert_eq!(trie.header().index2_null_offset, NO_INDEX2_NULL_OFFSET);
    check_trie(&trie, &[UNICODE_LIMIT, 5]);
}

#[test]
fn cjk_block_16() {
    let mut builder = MutableCodePointTrie::new(0, 0);
    builder.set_range(0x4e00, 0x9fff, 1, true).unwrap();
    let check_ranges = [0x4e00, 0, 0xa000, 1, UNICODE_LIMIT, 0];
    check_builder(&builder, &check_ranges);

    let trie = builder.freeze(ValueWidth::Bits16).unwrap();
    // 0xA000 is already a multiple of the index-1 entry size.
    assert_eq!(trie.header().high_start, 0xa000);
    assert_eq!(trie.index_length(), BMP_INDEX_LENGTH);
    check_trie(&trie, &check_ranges);
}

#[test]
fn last_code_point_32() {
    let mut builder = MutableCodePointTrie::new(0, 0);
    builder.set(0x10_ffff, 0x1234).unwrap();
    let check_ranges = [0x10_ffff, 0, UNICODE_LIMIT, 0x1234];
    check_builder(&builder, &check_ranges);

    let trie = builder.freeze(ValueWidth::Bits32).unwrap();
    assert_eq!(trie.header().high_start, UNICODE_LIMIT);
    assert_eq!(trie.header().high_value, 0);
    // The whole supplementary range is indexed: a 128-entry index-1
    // table plus one compacted index-2 block.
    assert_eq!(trie.index_length(), BMP_INDEX_LENGTH + 128 + 512);
    check_trie(&trie, &check_ranges);
}

#[test]
fn dense_bmp_needs_32_bits() {
    let mut builder = MutableCodePointTrie::new(0, 0);
    for c in 0..0x1_0000 {
        builder.set(c, c).unwrap();
    }
    // Unshifted BMP data offsets do not fit 16-bit index entries.
    let narrow = builder.clone();
    assert_eq!(
        narrow.freeze(ValueWidth::Bits16).unwrap_err(),
        Error::IndexOutOfBounds
    );

    let trie = builder.freeze(ValueWidth::Bits32).unwrap();
    assert_eq!(trie.index_length(), BMP_INDEX_LENGTH);
    assert!(trie.data_length() >= 0x1_0000);
    for c in (0..0x1_0000).step_by(7) {
        assert_eq!(trie.get32(c), c, "distinct value for U+{c:04X}");
    }
    assert_eq!(trie.get32(0x1_0000), 0);
}

#[test]
fn builder_and_frozen_agree() {
    let builder = sample_builder();
    for width in [ValueWidth::Bits16, ValueWidth::Bits32] {
        let trie = builder.clone().freeze(width).unwrap();
        let mut c = 0;
        while c <= CODE_POINT_MAX {
            assert_eq!(
                trie.get32(c),
                builder.get(c),
                "width {width:?}, U+{c:04X}"
            );
            c += 1;
        }
        assert_eq!(trie.get32(UNICODE_LIMIT), builder.get(UNICODE_LIMIT));
    }
}

#[test]
fn masking_16() {
    let mut builder = MutableCodePointTrie::new(0, u32::MAX);
    builder.set_range(0x100, 0x1ff, 0x1_0007, true).unwrap();
    builder.set(0x1_0000, 0xabcd_1234).unwrap();
    let trie = builder.freeze(ValueWidth::Bits16).unwrap();

    assert_eq!(trie.get32(0x100), 7);
    assert_eq!(trie.get32(0x1_0000), 0x1234);
    // The error value is not masked.
    assert_eq!(trie.get32(0x11_0000), u32::MAX);
}

#[test]
fn get_range_is_maximal() {
    let builder = sample_builder();
    let mut c = 0;
    while c < UNICODE_LIMIT {
        let range = builder.get_range(c).unwrap();
        assert_eq!(*range.range.start(), c);
        let end = *range.range.end();
        assert!(c <= end && end <= CODE_POINT_MAX);
        assert_eq!(builder.get(c), range.value);
        assert_eq!(builder.get(end), range.value);
        if end < CODE_POINT_MAX {
            assert_ne!(builder.get(end + 1), range.value, "range end U+{end:04X}");
        }
        c = end + 1;
    }
}

#[test]
fn get_range_handle_value() {
    let mut builder = MutableCodePointTrie::new(1, 0);
    builder.set_range(0x800, 0x8ff, 3, true).unwrap();
    builder.set_range(0x900, 0x9ff, 5, true).unwrap();

    // Identity: three distinct ranges.
    assert_eq!(*builder.get_range(0).unwrap().range.end(), 0x7ff);
    // Folding odd values together merges all of them.
    let folded = builder.get_range_mapped(0, |value| value & 1).unwrap();
    assert_eq!(folded.range, 0..=CODE_POINT_MAX);
    assert_eq!(folded.value, 1);
    // The transformed initial value caps the run before the high range
    // only if it differs there.
    let shifted = builder.get_range_mapped(0x900, |value| value >> 1).unwrap();
    assert_eq!(shifted.range, 0x900..=0x9ff);
    assert_eq!(shifted.value, 2);
}

#[test]
fn iter_ranges_covers_everything() {
    let builder = sample_builder();
    let mut next = 0u32;
    for range in builder.iter_ranges() {
        assert_eq!(*range.range.start(), next);
        assert_eq!(builder.get(next), range.value);
        next = range.range.end() + 1;
    }
    assert_eq!(next, UNICODE_LIMIT);
}

#[test]
fn serialized_round_trip() {
    for width in [ValueWidth::Bits16, ValueWidth::Bits32] {
        let trie = sample_builder().freeze(width).unwrap();
        let bytes = trie.to_bytes();
        assert_eq!(format_version(&bytes), Ok(3));

        let parsed = CodePointTrie::try_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, trie);
        // serialize ∘ parse ∘ serialize is a fixed point.
        assert_eq!(parsed.to_bytes(), bytes);

        for c in (0..UNICODE_LIMIT).step_by(31) {
            assert_eq!(parsed.get32(c), trie.get32(c));
        }
    }
}

#[test]
fn serialization_is_deterministic() {
    // The same mappings built through different write sequences freeze
    // to identical bytes.
    let mut by_range = MutableCodePointTrie::new(0, 9);
    by_range.set_range(0x2460, 0x24ff, 6, true).unwrap();
    let mut by_point = MutableCodePointTrie::new(0, 9);
    for c in 0x2460..=0x24ff {
        by_point.set(c, 6).unwrap();
    }
    let bytes_a = by_range.freeze(ValueWidth::Bits16).unwrap().to_bytes();
    let bytes_b = by_point.freeze(ValueWidth::Bits16).unwrap().to_bytes();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn rejects_malformed_bytes() {
    let trie = sample_builder().freeze(ValueWidth::Bits16).unwrap();
    let bytes = trie.to_bytes();

    let mut wrong_version = bytes.clone();
    wrong_version[..4].copy_from_slice(b"Tri2");
    assert!(CodePointTrie::try_from_bytes(&wrong_version).is_err());

    // Truncations anywhere must be rejected, never read out of bounds.
    assert!(CodePointTrie::try_from_bytes(&bytes[..2]).is_err());
    assert!(CodePointTrie::try_from_bytes(&bytes[..20]).is_err());
    assert!(CodePointTrie::try_from_bytes(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn frozen_clone_and_compare() {
    let trie = sample_builder().freeze(ValueWidth::Bits32).unwrap();
    let clone = trie.clone();
    assert_eq!(clone, trie);
    assert_eq!(clone.get32(0x1_2345), trie.get32(0x1_2345));
}

/// A value distribution with ASCII detail, dense BMP stretches, shared
/// blocks between BMP and supplementary ranges, and a long uniform tail.
fn sample_builder() -> MutableCodePointTrie {
    let mut builder = MutableCodePointTrie::new(1, u32::MAX);
    builder.set_range(0x20, 0x7e, 2, true).unwrap();
    builder.set(0x41, 0x86).unwrap();
    builder.set_range(0x300, 0x36f, 0x30, true).unwrap();
    builder.set_range(0x4e00, 0x9fff, 0x40, true).unwrap();
    // Same block pattern below and above the BMP boundary.
    builder.set_range(0xff00, 0xff7f, 0x50, true).unwrap();
    builder.set_range(0x1_ff00, 0x1_ff7f, 0x50, true).unwrap();
    builder.set_range(0x2_0000, 0x2_a6df, 0x40, true).unwrap();
    // Partial blocks on both ends, non-overwrite writes.
    builder.set_range(0x1_0003, 0x1_0015, 0x60, true).unwrap();
    builder.set_range(0x1_0010, 0x1_0042, 0x61, false).unwrap();
    builder.set_range(0xe_0000, 0xe_01ef, 0x70, true).unwrap();
    builder
}

/// Asserts that every code point maps to the value of its check range,
/// where `check_ranges` is a flat sequence of (limit, value) pairs
/// starting at code point 0.
fn check_trie(trie: &CodePointTrie, check_ranges: &[u32]) {
    assert_eq!(
        0,
        check_ranges.len() % 2,
        "check_ranges must have an even number of 32-bit values in (limit,value) pairs"
    );
    let mut c = 0;
    for pair in check_ranges.chunks(2) {
        let (limit, value) = (pair[0], pair[1]);
        while c < limit {
            assert_eq!(trie.get32(c), value, "frozen trie_get(U+{c:04X})");
            c += 1;
        }
    }
}

/// The builder-side counterpart of [`check_trie`], also cross-checking
/// `get_range` against the expected partition.
fn check_builder(builder: &MutableCodePointTrie, check_ranges: &[u32]) {
    let mut c = 0;
    for pair in check_ranges.chunks(2) {
        let (limit, value) = (pair[0], pair[1]);
        while c < limit {
            assert_eq!(builder.get(c), value, "builder get(U+{c:04X})");
            c += 1;
        }
    }
    let mut range_iter = builder.iter_ranges();
    let mut c = 0;
    for pair in check_ranges.chunks(2) {
        let (limit, value) = (pair[0], pair[1]);
        if limit == c {
            continue;
        }
        let range = range_iter.next().unwrap();
        assert_eq!(*range.range.start(), c);
        assert_eq!(*range.range.end(), limit - 1);
        assert_eq!(range.value, value);
        c = limit;
    }
    assert!(range_iter.next().is_none());
}
