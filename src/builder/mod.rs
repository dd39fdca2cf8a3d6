// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! The mutable, build-time form of a code point trie.
//!
//! A [`MutableCodePointTrie`] accepts arbitrary point and range
//! assignments over the whole code point space and answers queries
//! directly from its dense representation. [`MutableCodePointTrie::freeze`]
//! compacts it into the immutable two-stage form,
//! [`CodePointTrie`](crate::CodePointTrie).

mod compact;
mod store;

use alloc::vec::Vec;
use core::ops::RangeInclusive;

use crate::builder::store::DataBlockStore;
use crate::error::Error;
use crate::impl_const::*;
use crate::trie::{CodePointTrie, CodePointTrieData, CodePointTrieHeader, ValueWidth};
use zerovec::ZeroVec;

/// The state of one index slot, covering one data block of 16 code points.
///
/// During building only the first two variants occur. The compactor
/// temporarily rewrites slots through all four, ending with every slot
/// `Moved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    /// All code points of this block share the value.
    AllSame(u32),
    /// The block's 16 values start at this offset in the build-time store.
    Mixed(u32),
    /// Same contents as the block of the referenced earlier slot.
    SameAs(u32),
    /// The block was placed at this offset in the compacted data array.
    Moved(u32),
}

/// A range of consecutive code points sharing the same value in a code
/// point map.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CodePointMapRange {
    /// Range of code points from start to end (inclusive).
    pub range: RangeInclusive<u32>,
    /// Value associated with this range.
    pub value: u32,
}

/// A mutable trie mapping code points in `0..=0x10FFFF` to 32-bit values.
///
/// Code points that were never written read as the `initial_value`;
/// queries outside the Unicode range read as the `error_value`.
///
/// # Examples
///
/// ```
/// use icu_codepointtrie_builder::{MutableCodePointTrie, ValueWidth};
///
/// let mut builder = MutableCodePointTrie::new(0, 0xffff_ffff);
/// builder.set(0x41, 7).unwrap();
/// builder.set_range(0x4e00, 0x9fff, 2, true).unwrap();
/// assert_eq!(builder.get(0x41), 7);
/// assert_eq!(builder.get(0x4e00), 2);
/// assert_eq!(builder.get(0x40), 0);
///
/// let trie = builder.freeze(ValueWidth::Bits16).unwrap();
/// assert_eq!(trie.get32(0x41), 7);
/// assert_eq!(trie.get32(0x9fff), 2);
/// ```
#[derive(Clone, Debug)]
pub struct MutableCodePointTrie {
    initial_value: u32,
    error_value: u32,
    /// Block-aligned boundary above which all slots are implicit and read
    /// as `high_value`. Grows monotonically while building; the compactor
    /// may move it down to the start of the last uniform range.
    high_start: u32,
    /// Equal to `initial_value` until the compactor pins it.
    high_value: u32,
    /// One slot per data block below `high_start`.
    slots: Vec<Slot>,
    store: DataBlockStore,
}

#[allow(clippy::indexing_slicing)] // slots has exactly high_start >> SHIFT_2 entries while building
impl MutableCodePointTrie {
    /// Creates an empty trie: every code point maps to `initial_value`,
    /// every out-of-range query to `error_value`.
    pub fn new(initial_value: u32, error_value: u32) -> Self {
        MutableCodePointTrie {
            initial_value,
            error_value,
            high_start: 0,
            high_value: initial_value,
            slots: Vec::new(),
            store: DataBlockStore::new(),
        }
    }

    /// The value returned for code points that were never written.
    pub fn initial_value(&self) -> u32 {
        self.initial_value
    }

    /// The value returned for queries outside the Unicode range.
    pub fn error_value(&self) -> u32 {
        self.error_value
    }

    /// Returns the value of `c`, or the error value if `c > U+10FFFF`.
    pub fn get(&self, c: u32) -> u32 {
        if c > CODE_POINT_MAX {
            return self.error_value;
        }
        if c >= self.high_start {
            return self.high_value;
        }
        match self.slots[(c >> SHIFT_2) as usize] {
            Slot::AllSame(value) => value,
            Slot::Mixed(offset) => self.store.value(offset + (c & DATA_MASK)),
            Slot::SameAs(_) | Slot::Moved(_) => {
                debug_assert!(false, "query during compaction");
                self.error_value
            }
        }
    }

    /// Returns the longest range of consecutive code points starting at
    /// `start` that all map to the same value, or `None` if
    /// `start > U+10FFFF`.
    pub fn get_range(&self, start: u32) -> Option<CodePointMapRange> {
        self.get_range_mapped(start, |value| value)
    }

    /// Like [`Self::get_range`], but compares values after passing them
    /// through `handle_value`.
    ///
    /// The initial value is first folded to `handle_value(initial_value)`,
    /// so never-written stretches coalesce with explicitly written ones
    /// that map to the same transformed value.
    pub fn get_range_mapped(
        &self,
        start: u32,
        handle_value: impl Fn(u32) -> u32,
    ) -> Option<CodePointMapRange> {
        if start > CODE_POINT_MAX {
            return None;
        }
        if start >= self.high_start {
            return Some(CodePointMapRange {
                range: start..=CODE_POINT_MAX,
                value: handle_value(self.high_value),
            });
        }
        let initial_value = self.initial_value;
        let null_value = handle_value(initial_value);
        let handle = |value: u32| {
            if value == initial_value {
                null_value
            } else {
                handle_value(value)
            }
        };
        let mut c = start;
        let mut i = (c >> SHIFT_2) as usize;
        let mut value = 0;
        let mut have_value = false;
        loop {
            match self.slots[i] {
                Slot::AllSame(block_value) => {
                    let value2 = handle(block_value);
                    if have_value {
                        if value2 != value {
                            return Some(CodePointMapRange {
                                range: start..=c - 1,
                                value,
                            });
                        }
                    } else {
                        value = value2;
                        have_value = true;
                    }
                    c = (c + DATA_BLOCK_LENGTH) & !DATA_MASK;
                }
                Slot::Mixed(offset) => {
                    let mut di = offset + (c & DATA_MASK);
                    let value2 = handle(self.store.value(di));
                    if have_value {
                        if value2 != value {
                            return Some(CodePointMapRange {
                                range: start..=c - 1,
                                value,
                            });
                        }
                    } else {
                        value = value2;
                        have_value = true;
                    }
                    loop {
                        c += 1;
                        if c & DATA_MASK == 0 {
                            break;
                        }
                        di += 1;
                        if handle(self.store.value(di)) != value {
                            return Some(CodePointMapRange {
                                range: start..=c - 1,
                                value,
                            });
                        }
                    }
                }
                Slot::SameAs(_) | Slot::Moved(_) => {
                    debug_assert!(false, "query during compaction");
                    return None;
                }
            }
            i += 1;
            if c >= self.high_start {
                break;
            }
        }
        debug_assert!(have_value);
        if handle(self.high_value) != value {
            Some(CodePointMapRange {
                range: start..=c - 1,
                value,
            })
        } else {
            Some(CodePointMapRange {
                range: start..=CODE_POINT_MAX,
                value,
            })
        }
    }

    /// Yields the ranges of [`Self::get_range`] over the whole code point
    /// space, in order.
    pub fn iter_ranges(&self) -> CodePointMapRangeIterator<'_> {
        CodePointMapRangeIterator {
            trie: self,
            cpm_range: Some(CodePointMapRange {
                range: u32::MAX..=u32::MAX,
                value: self.error_value,
            }),
        }
    }

    /// Maps `c` to `value`.
    pub fn set(&mut self, c: u32, value: u32) -> Result<(), Error> {
        if c > CODE_POINT_MAX {
            return Err(Error::CodePointOutOfRange(c));
        }
        self.ensure_high_start(c);
        let block = self.data_block(c)?;
        self.store.set_value(block + (c & DATA_MASK), value);
        Ok(())
    }

    /// Maps each code point in `start..=end` to `value`.
    ///
    /// If `overwrite` is false, only code points still carrying the
    /// initial value are written.
    pub fn set_range(
        &mut self,
        start: u32,
        end: u32,
        value: u32,
        overwrite: bool,
    ) -> Result<(), Error> {
        if start > CODE_POINT_MAX {
            return Err(Error::CodePointOutOfRange(start));
        }
        if end > CODE_POINT_MAX {
            return Err(Error::CodePointOutOfRange(end));
        }
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        if !overwrite && value == self.initial_value {
            return Ok(());
        }
        self.ensure_high_start(end);

        let mut start = start;
        let mut limit = end + 1;
        if start & DATA_MASK != 0 {
            // Partial block at [start..following block boundary).
            let block = self.data_block(start)?;
            let next_start = (start + DATA_MASK) & !DATA_MASK;
            if next_start <= limit {
                self.fill_block(block, start & DATA_MASK, DATA_BLOCK_LENGTH, value, overwrite);
                start = next_start;
            } else {
                self.fill_block(block, start & DATA_MASK, limit & DATA_MASK, value, overwrite);
                return Ok(());
            }
        }

        // Number of positions in the last, partial block.
        let rest = limit & DATA_MASK;
        limit &= !DATA_MASK;

        while start < limit {
            match self.slots[(start >> SHIFT_2) as usize] {
                Slot::AllSame(current) => {
                    if overwrite || current == self.initial_value {
                        self.slots[(start >> SHIFT_2) as usize] = Slot::AllSame(value);
                    }
                }
                Slot::Mixed(offset) => {
                    self.fill_block(offset, 0, DATA_BLOCK_LENGTH, value, overwrite)
                }
                Slot::SameAs(_) | Slot::Moved(_) => {
                    debug_assert!(false, "mutation during compaction")
                }
            }
            start += DATA_BLOCK_LENGTH;
        }

        if rest > 0 {
            // Partial block at [last block boundary..limit).
            let block = self.data_block(start)?;
            self.fill_block(block, 0, rest, value, overwrite);
        }
        Ok(())
    }

    /// Compacts the trie and serializes it with the requested value width.
    ///
    /// 16-bit freezing first masks the initial value, the high value and
    /// every data value with `0xFFFF`; the error value is preserved
    /// verbatim. Freezing is one-shot: callers that may want to retry with
    /// a different width clone the builder first.
    pub fn freeze(mut self, value_width: ValueWidth) -> Result<CodePointTrie<'static>, Error> {
        if value_width == ValueWidth::Bits16 {
            self.mask_values(0xffff);
        }
        let compaction = compact::compact(&mut self);

        if compaction.index_length > 0xffff {
            // The serialized header stores the index length in 16 bits.
            return Err(Error::IndexOutOfBounds);
        }
        let data_move: u32 = match value_width {
            ValueWidth::Bits16 => compaction.index_length as u32,
            ValueWidth::Bits32 => 0,
        };

        // Are all shifted supplementary indexes within limits?
        if (data_move as usize + compaction.data.len()) >> INDEX_SHIFT > 0xffff {
            return Err(Error::IndexOutOfBounds);
        }
        // Are all unshifted BMP indexes within limits?
        for &offset in &compaction.index[..BMP_I_LIMIT as usize] {
            if data_move + offset > 0xffff {
                return Err(Error::IndexOutOfBounds);
            }
        }

        let mut index16: Vec<u16> = Vec::with_capacity(compaction.index_length);
        // BMP index-2 values, not right-shifted.
        index16.extend(
            compaction.index[..BMP_I_LIMIT as usize]
                .iter()
                .map(|&offset| (data_move + offset) as u16),
        );
        if compaction.high_start > BMP_LIMIT {
            index16.extend_from_slice(&compaction.index1);
            // Supplementary index-2 values, right-shifted by INDEX_SHIFT.
            index16.extend(
                compaction.index[BMP_I_LIMIT as usize..]
                    .iter()
                    .map(|&offset| ((data_move + offset) >> INDEX_SHIFT) as u16),
            );
        }
        debug_assert_eq!(index16.len(), compaction.index_length);

        let header = CodePointTrieHeader {
            high_start: compaction.high_start,
            shifted_high_start: (compaction.high_start >> SHIFT_1) as u16,
            index2_null_offset: compaction.index2_null_offset as u16,
            data_null_offset: if compaction.data_null_offset == NO_DATA_NULL_OFFSET {
                NO_DATA_NULL_OFFSET
            } else {
                compaction.data_null_offset + data_move
            },
            high_value: compaction.high_value,
            error_value: self.error_value,
            value_width,
        };
        let index = ZeroVec::alloc_from_slice(&index16);
        let data = match value_width {
            ValueWidth::Bits16 => CodePointTrieData::Bits16(
                compaction
                    .data
                    .iter()
                    .map(|&value| value as u16)
                    .collect::<ZeroVec<u16>>(),
            ),
            ValueWidth::Bits32 => {
                CodePointTrieData::Bits32(ZeroVec::alloc_from_slice(&compaction.data))
            }
        };
        Ok(CodePointTrie::from_parts(header, index, data))
    }

    /// Lazily materializes implicit slots so that `c` is below
    /// `high_start`.
    fn ensure_high_start(&mut self, c: u32) {
        if c >= self.high_start {
            // Round up to a full block.
            let new_high_start = (c + DATA_BLOCK_LENGTH) & !DATA_MASK;
            self.slots.resize(
                (new_high_start >> SHIFT_2) as usize,
                Slot::AllSame(self.initial_value),
            );
            debug_assert!(self.slots.len() <= I_LIMIT as usize);
            self.high_start = new_high_start;
        }
    }

    /// The store offset of the data block for `c`, materializing an
    /// all-same slot into a fresh block if needed.
    fn data_block(&mut self, c: u32) -> Result<u32, Error> {
        let i = (c >> SHIFT_2) as usize;
        match self.slots[i] {
            Slot::Mixed(offset) => Ok(offset),
            Slot::AllSame(value) => {
                let offset = self.store.alloc_block(value)?;
                self.slots[i] = Slot::Mixed(offset);
                Ok(offset)
            }
            Slot::SameAs(_) | Slot::Moved(_) => {
                unreachable!("mutation during compaction")
            }
        }
    }

    fn fill_block(&mut self, block: u32, start: u32, limit: u32, value: u32, overwrite: bool) {
        let initial_value = self.initial_value;
        for v in &mut self.store.block_mut(block)[start as usize..limit as usize] {
            if overwrite || *v == initial_value {
                *v = value;
            }
        }
    }

    fn mask_values(&mut self, mask: u32) {
        self.initial_value &= mask;
        self.high_value &= mask;
        // Leave the error value as is: it is not stored in the data array,
        // and an error value outside the normal value range can be useful.
        for slot in self.slots.iter_mut() {
            if let Slot::AllSame(value) = slot {
                *value &= mask;
            }
        }
        self.store.mask_values(mask);
    }
}

/// An [`Iterator`] over the value ranges of a [`MutableCodePointTrie`].
#[derive(Debug)]
pub struct CodePointMapRangeIterator<'a> {
    trie: &'a MutableCodePointTrie,
    // `u32::MAX` as the range start means iteration has not begun;
    // `None` means it has ended.
    cpm_range: Option<CodePointMapRange>,
}

impl Iterator for CodePointMapRangeIterator<'_> {
    type Item = CodePointMapRange;

    fn next(&mut self) -> Option<Self::Item> {
        self.cpm_range = match &self.cpm_range {
            Some(cpmr) => {
                if *cpmr.range.start() == u32::MAX {
                    self.trie.get_range(0)
                } else {
                    self.trie.get_range(cpmr.range.end() + 1)
                }
            }
            None => None,
        };
        self.cpm_range.clone()
    }
}
