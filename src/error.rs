// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! Custom error type(s) for this crate.

use displaydoc::Display;

/// An error for the mutable trie, the freeze pipeline, and the
/// serialized-form parser.
#[derive(Copy, Clone, Display, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A code point argument was greater than U+10FFFF.
    #[displaydoc("code point {0:#x} is greater than 0x10ffff")]
    CodePointOutOfRange(u32),
    /// A range started after its end.
    #[displaydoc("range start {start:#x} is greater than range end {end:#x}")]
    InvalidRange {
        /// First code point of the rejected range.
        start: u32,
        /// Last code point of the rejected range.
        end: u32,
    },
    /// The build-time data store reached its final capacity of one value
    /// per code point and cannot grow further.
    #[displaydoc("build-time data store cannot grow past one value per code point")]
    StoreOverflow,
    /// After compaction, a required data offset does not fit in a 16-bit
    /// index entry. The data set cannot be frozen with the chosen value
    /// width.
    #[displaydoc("compacted data offsets do not fit in 16 bits")]
    IndexOutOfBounds,
    /// Could not parse a [`CodePointTrie`](crate::CodePointTrie) from
    /// serialized bytes.
    #[displaydoc("not a recognized serialized code point trie: {reason}")]
    InvalidFormat {
        /// Reason for rejecting the serialized bytes.
        reason: &'static str,
    },
}

impl core::error::Error for Error {}
