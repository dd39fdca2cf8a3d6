// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! Shape constants of the version-3 code point trie.
//!
//! All sizes are powers of two. `SHIFT_2 <= 7` keeps the top of the linear
//! ASCII data block-aligned, `SHIFT_1` in `10..=16` keeps a single index-2
//! block within one plane, and `INDEX_SHIFT >= 1` makes more than 64k
//! distinct data values representable through 16-bit index entries.

/// Shift size for getting the index-1 table offset. One index-1 entry
/// covers 8192=0x2000 code points.
pub const SHIFT_1: u32 = 13;

/// Shift size for getting the index-2 table offset. One index-2 entry
/// covers one data block of 16=0x10 code points.
pub const SHIFT_2: u32 = 4;

/// Difference between the two shift sizes, for getting an index-2 offset
/// from an index-1 offset. 9=13-4
pub const SHIFT_1_2: u32 = SHIFT_1 - SHIFT_2;

/// Number of entries in a data block. 16=0x10
pub const DATA_BLOCK_LENGTH: u32 = 1 << SHIFT_2;

/// Mask for getting the lower bits for the in-data-block offset.
pub const DATA_MASK: u32 = DATA_BLOCK_LENGTH - 1;

/// Number of code points per index-1 table entry. 8192=0x2000
pub const CP_PER_INDEX_1_ENTRY: u32 = 1 << SHIFT_1;

/// Number of entries in an index-2 block. 512=0x200
pub const INDEX_2_BLOCK_LENGTH: u32 = 1 << SHIFT_1_2;

/// Mask for getting the lower bits for the in-index-2-block offset.
pub const INDEX_2_MASK: u32 = INDEX_2_BLOCK_LENGTH - 1;

/// Shift applied to supplementary data offsets stored in index-2 entries.
pub const INDEX_SHIFT: u32 = 1;

/// Alignment required of data blocks addressed through shifted index-2
/// entries.
pub const DATA_GRANULARITY: u32 = 1 << INDEX_SHIFT;

/// Number of index-1 entries for the BMP. (8)
/// This part of the index-1 table is omitted from the serialized form.
pub const OMITTED_BMP_INDEX_1_LENGTH: u32 = 0x1_0000 >> SHIFT_1;

/// Maximum length of the serialized index-1 table. (128)
pub const MAX_INDEX_1_LENGTH: u32 = (UNICODE_LIMIT - BMP_LIMIT) >> SHIFT_1;

/// The highest code point, U+10FFFF.
pub const CODE_POINT_MAX: u32 = 0x10_ffff;

/// One past the highest code point.
pub const UNICODE_LIMIT: u32 = 0x11_0000;

/// One past the Basic Multilingual Plane.
pub const BMP_LIMIT: u32 = 0x1_0000;

/// One past the linear ASCII range of the data array.
pub const ASCII_LIMIT: u32 = 0x80;

/// Maximum number of index-2 entries. 69632=0x11000
pub const I_LIMIT: u32 = UNICODE_LIMIT >> SHIFT_2;

/// Number of BMP index-2 entries. 4096=0x1000
pub const BMP_I_LIMIT: u32 = BMP_LIMIT >> SHIFT_2;

/// Number of ASCII index-2 entries. (8)
pub const ASCII_I_LIMIT: u32 = ASCII_LIMIT >> SHIFT_2;

/// Sentinel for "no data null block".
pub const NO_DATA_NULL_OFFSET: u32 = 0xf_ffff;

/// Sentinel for "no index-2 null block".
pub const NO_INDEX2_NULL_OFFSET: u32 = 0xffff;

/// Initial capacity of the build-time data store, in values.
pub const INITIAL_DATA_LENGTH: u32 = 1 << 14;

/// Second-stage capacity of the build-time data store, in values.
pub const MEDIUM_DATA_LENGTH: u32 = 1 << 17;

/// Final capacity cap of the build-time data store: one value per code
/// point.
pub const MAX_DATA_LENGTH: u32 = UNICODE_LIMIT;

/// Serialized signature of the version-1 format.
pub const SIG_V1: [u8; 4] = *b"Trie";

/// Serialized signature of the reserved version-2 format.
pub const SIG_V2: [u8; 4] = *b"Tri2";

/// Serialized signature of the version-3 format.
pub const SIG_V3: [u8; 4] = *b"Tri3";

/// Byte length of the serialized header.
pub const HEADER_LENGTH: usize = 24;
