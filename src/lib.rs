// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! Building compact tries over the Unicode code point space.
//!
//! A code point trie maps every code point in `0..=0x10FFFF` to an
//! unsigned integer value in a handful of array reads. This crate
//! provides the mutable build path for version-3 tries:
//! [`MutableCodePointTrie`] accepts arbitrary point and range
//! assignments, and [`MutableCodePointTrie::freeze`] deduplicates and
//! overlaps data blocks until the structure fits its final two-stage
//! form, [`CodePointTrie`]. The frozen trie serializes as a header
//! followed by a 16-bit index array and a 16- or 32-bit data array.
//!
//! This is the builder counterpart of the frozen-trie readers used for
//! Unicode character property lookup (normalization, case mapping,
//! script, general category and similar per-code-point attributes).
//!
//! # Examples
//!
//! ```
//! use icu_codepointtrie_builder::{MutableCodePointTrie, ValueWidth};
//!
//! // Map the Cherokee block to 1, everything else to 0.
//! let mut builder = MutableCodePointTrie::new(0, u32::MAX);
//! builder.set_range(0x13A0, 0x13FF, 1, true).unwrap();
//!
//! let trie = builder.freeze(ValueWidth::Bits16).unwrap();
//! assert_eq!(trie.get('Ꮃ'), 1);
//! assert_eq!(trie.get('W'), 0);
//!
//! // The frozen form round-trips through its serialized bytes.
//! use icu_codepointtrie_builder::CodePointTrie;
//! let bytes = trie.to_bytes();
//! let parsed = CodePointTrie::try_from_bytes(&bytes).unwrap();
//! assert_eq!(parsed, trie);
//! ```

// https://github.com/unicode-org/icu4x/blob/main/documents/process/boilerplate.md#library-annotations
#![cfg_attr(not(any(test, doc)), no_std)]
#![cfg_attr(
    not(test),
    deny(
        clippy::indexing_slicing,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic
    )
)]
#![warn(missing_docs)]

extern crate alloc;

mod builder;
mod error;
mod impl_const;
mod trie;

pub use builder::CodePointMapRange;
pub use builder::CodePointMapRangeIterator;
pub use builder::MutableCodePointTrie;
pub use error::Error;
pub use trie::format_version;
pub use trie::CodePointTrie;
pub use trie::CodePointTrieData;
pub use trie::CodePointTrieHeader;
pub use trie::ValueWidth;
