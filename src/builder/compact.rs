// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! Freeze-time compaction.
//!
//! The compaction
//! - removes data blocks that are identical with earlier ones,
//! - overlaps each new non-duplicate block as much as possible with the
//!   previously-written one,
//! - moves supplementary data blocks in steps of the data granularity,
//! - compacts the supplementary index-2 table the same way.
//!
//! It does not try to find an optimal order of writing, deduplicating,
//! and overlapping blocks.

use alloc::vec::Vec;

use crate::builder::{MutableCodePointTrie, Slot};
use crate::impl_const::*;

/// Everything the serializer needs, produced by [`compact`].
pub(crate) struct Compaction {
    pub high_start: u32,
    pub high_value: u32,
    /// Compacted data values.
    pub data: Vec<u32>,
    /// Raw data offsets per index-2 entry: the linear BMP part in
    /// `[0, BMP_I_LIMIT)`, the compacted supplementary part (including
    /// padding entries) after it.
    pub index: Vec<u32>,
    /// Index-1 entries, already final index positions.
    pub index1: Vec<u16>,
    /// Final length of the serialized index: BMP index-2 + index-1 +
    /// supplementary index-2.
    pub index_length: usize,
    /// Raw offset of the null data block, or the sentinel.
    pub data_null_offset: u32,
    /// Index position of the null index-2 block, or the sentinel.
    pub index2_null_offset: u32,
}

/// Compacts a build-time trie. On return, every slot is `Moved`.
#[allow(clippy::indexing_slicing)] // slot vector is resized to every limit used below
pub(crate) fn compact(trie: &mut MutableCodePointTrie) -> Compaction {
    // Find the start of the last range and round it up to an index-1
    // boundary, so that supplementary index blocks above it can be
    // omitted entirely.
    let mut high_value = trie.get(CODE_POINT_MAX);
    let mut high_start = find_high_start(trie, high_value);
    if high_start & (CP_PER_INDEX_1_ENTRY - 1) != 0 {
        let rounded = (high_start + CP_PER_INDEX_1_ENTRY - 1) & !(CP_PER_INDEX_1_ENTRY - 1);
        let i = (high_start >> SHIFT_2) as usize;
        let i_rounded = (rounded >> SHIFT_2) as usize;
        if trie.slots.len() < i_rounded {
            trie.slots.resize(i_rounded, Slot::AllSame(high_value));
        }
        for slot in &mut trie.slots[i..i_rounded] {
            *slot = Slot::AllSame(high_value);
        }
        high_start = rounded;
    }
    if high_start == UNICODE_LIMIT {
        high_value = trie.initial_value;
    }
    trie.high_start = high_start;
    trie.high_value = high_value;

    // Indexes and data values for the BMP are always stored.
    let supp_high_start = if high_start <= BMP_LIMIT {
        if trie.slots.len() < BMP_I_LIMIT as usize {
            trie.slots
                .resize(BMP_I_LIMIT as usize, Slot::AllSame(high_value));
        }
        for slot in &mut trie.slots[(high_start >> SHIFT_2) as usize..BMP_I_LIMIT as usize] {
            *slot = Slot::AllSame(high_value);
        }
        BMP_LIMIT
    } else {
        high_start
    };

    // Capture the linear ASCII prefix before whole-block deduplication
    // rewrites any slot.
    let mut ascii = [0u32; ASCII_LIMIT as usize];
    for (c, value) in ascii.iter_mut().enumerate() {
        *value = trie.get(c as u32);
    }

    let i_limit = (supp_high_start >> SHIFT_2) as usize;
    let mut supp = alloc::vec![false; i_limit];
    let (new_data_length, data_null_index) = compact_whole_data_blocks(trie, i_limit, &mut supp);
    let (data, data_null_offset) =
        compact_data(trie, &supp, &ascii, i_limit, new_data_length, data_null_index);

    let mut index: Vec<u32> = trie.slots[..i_limit]
        .iter()
        .map(|slot| match slot {
            Slot::Moved(offset) => *offset,
            _ => {
                debug_assert!(false, "unplaced slot after data compaction");
                0
            }
        })
        .collect();
    let (index1, index2_null_offset, index_length) =
        compact_index2(&mut index, supp_high_start, data_null_offset);

    Compaction {
        high_start,
        high_value,
        data,
        index,
        index1,
        index_length,
        data_null_offset,
        index2_null_offset,
    }
}

/// Finds the start of the last range in the trie by enumerating backward
/// from `high_start`. Returns a multiple of the data block length.
#[allow(clippy::indexing_slicing)] // i stays below the slot count
fn find_high_start(trie: &MutableCodePointTrie, high_value: u32) -> u32 {
    let mut i = (trie.high_start >> SHIFT_2) as usize;
    while i > 0 {
        i -= 1;
        let matches = match trie.slots[i] {
            Slot::AllSame(value) => value == high_value,
            Slot::Mixed(offset) => trie.store.block(offset).iter().all(|&v| v == high_value),
            Slot::SameAs(_) | Slot::Moved(_) => {
                debug_assert!(false, "compaction started twice");
                false
            }
        };
        if !matches {
            return (i as u32 + 1) << SHIFT_2;
        }
    }
    0
}

/// Outcome of [`AllSameBlocks::find_or_add`].
enum FindOrAdd {
    /// An entry with this value exists; its representative slot.
    Found(usize),
    /// The value is new and was recorded.
    New,
    /// The table is full and does not contain the value.
    Overflow,
}

/// Bounded reference-counted table of all-same blocks seen so far, keyed
/// by value. Overflow falls back to a linear scan over earlier slots;
/// it does not fail.
struct AllSameBlocks {
    length: usize,
    most_recent: Option<usize>,
    indexes: [usize; Self::CAPACITY],
    values: [u32; Self::CAPACITY],
    ref_counts: [u32; Self::CAPACITY],
}

#[allow(clippy::indexing_slicing)] // entries below self.length are initialized
impl AllSameBlocks {
    const CAPACITY: usize = 32;

    fn new() -> Self {
        AllSameBlocks {
            length: 0,
            most_recent: None,
            indexes: [0; Self::CAPACITY],
            values: [0; Self::CAPACITY],
            ref_counts: [0; Self::CAPACITY],
        }
    }

    fn find_or_add(&mut self, index: usize, value: u32) -> FindOrAdd {
        if let Some(r) = self.most_recent {
            if self.values[r] == value {
                self.ref_counts[r] += 1;
                return FindOrAdd::Found(self.indexes[r]);
            }
        }
        for i in 0..self.length {
            if self.values[i] == value {
                self.most_recent = Some(i);
                self.ref_counts[i] += 1;
                return FindOrAdd::Found(self.indexes[i]);
            }
        }
        if self.length == Self::CAPACITY {
            return FindOrAdd::Overflow;
        }
        self.most_recent = Some(self.length);
        self.indexes[self.length] = index;
        self.values[self.length] = value;
        self.ref_counts[self.length] = 1;
        self.length += 1;
        FindOrAdd::New
    }

    /// Replaces the entry which has the lowest reference count.
    fn replace_least_used(&mut self, index: usize, value: u32) {
        debug_assert_eq!(self.length, Self::CAPACITY);
        let mut least = 0;
        let mut least_count = u32::MAX;
        for i in 0..self.length {
            debug_assert!(self.values[i] != value);
            if self.ref_counts[i] < least_count {
                least = i;
                least_count = self.ref_counts[i];
            }
        }
        self.most_recent = Some(least);
        self.indexes[least] = index;
        self.values[least] = value;
        self.ref_counts[least] = 1;
    }

    /// The representative slot and value of the entry with the highest
    /// reference count.
    fn most_used(&self) -> Option<(usize, u32)> {
        let mut max: Option<usize> = None;
        let mut max_count = 0;
        for i in 0..self.length {
            if self.ref_counts[i] > max_count {
                max = Some(i);
                max_count = self.ref_counts[i];
            }
        }
        max.map(|i| (self.indexes[i], self.values[i]))
    }
}

/// First compaction pass: normalizes blocks and finds whole-block
/// duplicates.
///
/// Mixed blocks that turned out uniform are flattened to `AllSame`;
/// duplicates become `SameAs` their earlier representative. A
/// representative whose block is also used by a supplementary slot is
/// marked in `supp`, which defers its placement to the
/// granularity-aligned pass.
///
/// Returns an upper bound for the compacted data length, and the
/// representative of the most-used all-same block if its value is the
/// initial value.
#[allow(clippy::indexing_slicing)] // i and j stay below i_limit == supp.len()
fn compact_whole_data_blocks(
    trie: &mut MutableCodePointTrie,
    i_limit: usize,
    supp: &mut [bool],
) -> (usize, Option<usize>) {
    let initial_value = trie.initial_value;
    let slots = &mut trie.slots;
    let store = &trie.store;
    let mut all_same_blocks = AllSameBlocks::new();
    let mut new_data_length = 0usize;
    for i in 0..i_limit {
        let value = match slots[i] {
            Slot::AllSame(value) => value,
            Slot::Mixed(offset) => {
                let block = store.block(offset);
                let value = block.first().copied().unwrap_or(0);
                if block.iter().all(|&v| v == value) {
                    // Really mixed? Fall through to all-same handling.
                    slots[i] = Slot::AllSame(value);
                    value
                } else {
                    // Is there another whole mixed block with the same data?
                    let mut same: Option<usize> = None;
                    for j in 0..i {
                        if let Slot::Mixed(other) = slots[j] {
                            if store.block(other) == block {
                                same = Some(j);
                                break;
                            }
                        }
                    }
                    if let Some(j) = same {
                        if i >= BMP_I_LIMIT as usize {
                            supp[j] = true;
                        }
                        slots[i] = Slot::SameAs(j as u32);
                    } else {
                        // Unique mixed-value block.
                        new_data_length += DATA_BLOCK_LENGTH as usize;
                    }
                    continue;
                }
            }
            Slot::SameAs(_) | Slot::Moved(_) => {
                debug_assert!(false, "compaction started twice");
                continue;
            }
        };
        // Is there another all-same block with the same value?
        let other = match all_same_blocks.find_or_add(i, value) {
            FindOrAdd::Found(other) => Some(other),
            FindOrAdd::New => None,
            FindOrAdd::Overflow => {
                // The fixed-size table overflowed. Slow check for a
                // duplicate block.
                let mut found: Option<usize> = None;
                for j in 0..i {
                    if let Slot::AllSame(v) = slots[j] {
                        if v == value {
                            found = Some(j);
                            break;
                        }
                    }
                }
                match found {
                    Some(j) => {
                        all_same_blocks.replace_least_used(j, value);
                        Some(j)
                    }
                    None => {
                        all_same_blocks.replace_least_used(i, value);
                        None
                    }
                }
            }
        };
        if let Some(other) = other {
            if i >= BMP_I_LIMIT as usize {
                supp[other] = true;
            }
            slots[i] = Slot::SameAs(other as u32);
        } else {
            // New unique same-value block.
            new_data_length += DATA_BLOCK_LENGTH as usize;
        }
    }
    let data_null_index = all_same_blocks
        .most_used()
        .and_then(|(index, value)| (value == initial_value).then_some(index));
    (new_data_length, data_null_index)
}

/// Second compaction pass: writes the compacted data array.
///
/// Returns the array and the raw offset of the null data block (or the
/// sentinel).
#[allow(clippy::indexing_slicing)] // slot references were validated in the first pass
fn compact_data(
    trie: &mut MutableCodePointTrie,
    supp: &[bool],
    ascii: &[u32; ASCII_LIMIT as usize],
    i_limit: usize,
    new_data_length: usize,
    data_null_index: Option<usize>,
) -> (Vec<u32>, u32) {
    let mut data: Vec<u32> = Vec::with_capacity(ASCII_LIMIT as usize + new_data_length);
    data.extend_from_slice(ascii);

    // The linear ASCII blocks stay in place.
    for (i, slot) in trie
        .slots
        .iter_mut()
        .take(ASCII_I_LIMIT as usize)
        .enumerate()
    {
        *slot = Slot::Moved(i as u32 * DATA_BLOCK_LENGTH);
    }

    // Write all BMP-only data before data shared with supplementary code
    // points, to maximize the chance that unshifted BMP indexes work.
    place_blocks(
        trie,
        &mut data,
        ASCII_I_LIMIT as usize..BMP_I_LIMIT as usize,
        1,
        Some(supp),
    );

    // Supplementary data needs the bigger granularity for shifted
    // indexes, so that more than 64k values are supported. Repeating the
    // last value across the padding keeps overlap possible, and the
    // padding also makes the final data length a multiple of the
    // granularity.
    while data.len() & (DATA_GRANULARITY as usize - 1) != 0 {
        let last = data.last().copied().unwrap_or(0);
        data.push(last);
    }
    place_blocks(
        trie,
        &mut data,
        ASCII_I_LIMIT as usize..i_limit,
        DATA_GRANULARITY as usize,
        None,
    );

    // Resolve SAME_AS references now that every representative is placed.
    for i in ASCII_I_LIMIT as usize..i_limit {
        if let Slot::SameAs(j) = trie.slots[i] {
            let offset = match trie.slots[j as usize] {
                Slot::Moved(offset) => offset,
                _ => {
                    debug_assert!(false, "SAME_AS target was not placed");
                    0
                }
            };
            trie.slots[i] = Slot::Moved(offset);
        } else {
            debug_assert!(matches!(trie.slots[i], Slot::Moved(_)));
        }
    }

    let data_null_offset = match data_null_index.map(|i| trie.slots[i]) {
        Some(Slot::Moved(offset)) => offset,
        _ => NO_DATA_NULL_OFFSET,
    };
    (data, data_null_offset)
}

/// Appends every still-unplaced block in `range` to `data`, reusing an
/// existing run or overlapping with the tail where possible. With
/// `bmp_only`, blocks that are also used by supplementary code points are
/// left for the later granularity-aligned pass.
#[allow(clippy::indexing_slicing)] // range and supp are sized by the caller
fn place_blocks(
    trie: &mut MutableCodePointTrie,
    data: &mut Vec<u32>,
    range: core::ops::Range<usize>,
    granularity: usize,
    bmp_only: Option<&[bool]>,
) {
    let slots = &mut trie.slots;
    let store = &trie.store;
    for i in range {
        if let Some(supp) = bmp_only {
            if supp[i] {
                continue;
            }
        }
        match slots[i] {
            Slot::AllSame(value) => {
                if let Some(n) = find_all_same_block(data, value, granularity) {
                    slots[i] = Slot::Moved(n as u32);
                } else {
                    let overlap = all_same_overlap(data, value, granularity);
                    slots[i] = Slot::Moved((data.len() - overlap) as u32);
                    for _ in overlap..DATA_BLOCK_LENGTH as usize {
                        data.push(value);
                    }
                }
            }
            Slot::Mixed(offset) => {
                let block = store.block(offset);
                if let Some(n) = find_same_block(data, block, granularity) {
                    slots[i] = Slot::Moved(n as u32);
                } else {
                    let overlap = get_overlap(data, block, granularity);
                    slots[i] = Slot::Moved((data.len() - overlap) as u32);
                    data.extend_from_slice(&block[overlap..]);
                }
            }
            Slot::SameAs(_) | Slot::Moved(_) => {}
        }
    }
}

/// Searches `p` in steps of `granularity` for a run identical to `block`.
#[allow(clippy::indexing_slicing)] // i + block.len() <= p.len() by the range bound
fn find_same_block(p: &[u32], block: &[u32], granularity: usize) -> Option<usize> {
    // Ensure that we do not even partially get past the end of `p`.
    let length = p.len().checked_sub(block.len())?;
    let first = *block.first()?;
    (0..=length)
        .step_by(granularity)
        .find(|&i| p[i] == first && p[i..i + block.len()] == *block)
}

/// Searches `p` in steps of `granularity` for a data block's worth of
/// entries all equal to `value`.
#[allow(clippy::indexing_slicing)] // i + block length <= p.len() by the range bound
fn find_all_same_block(p: &[u32], value: u32, granularity: usize) -> Option<usize> {
    let block_length = DATA_BLOCK_LENGTH as usize;
    let length = p.len().checked_sub(block_length)?;
    (0..=length)
        .step_by(granularity)
        .find(|&i| p[i..i + block_length].iter().all(|&v| v == value))
}

/// Largest overlap (modulo granularity) of the beginning of `block` with
/// the end of `p`.
#[allow(clippy::indexing_slicing)] // overlap <= block.len() and overlap <= p.len()
fn get_overlap(p: &[u32], block: &[u32], granularity: usize) -> usize {
    let mut overlap = block.len() - granularity;
    debug_assert!(overlap <= p.len());
    while overlap > 0 && p[p.len() - overlap..] != block[..overlap] {
        overlap -= granularity;
    }
    overlap
}

/// Length of the longest suffix of `p` (aligned down to `granularity`)
/// whose entries all equal `value`, capped below one data block.
#[allow(clippy::indexing_slicing)] // i stays in min..=p.len(), and min < p.len()
fn all_same_overlap(p: &[u32], value: u32, granularity: usize) -> usize {
    let min = p.len() - (DATA_BLOCK_LENGTH as usize - granularity);
    let mut i = p.len();
    while i > min && p[i - 1] == value {
        i -= 1;
    }
    (p.len() - i) & !(granularity - 1)
}

/// Compacts the supplementary part of the index-2 table and computes the
/// final index layout.
///
/// On input, `index` holds raw data offsets for every index-2 entry below
/// `supp_high_start`. On output, its supplementary part is compacted in
/// place and padded; entries of the returned index-1 table are final
/// positions in the serialized index (BMP index-2, then index-1, then
/// supplementary index-2).
#[allow(clippy::indexing_slicing)] // chunk positions stay below the vector length
fn compact_index2(
    index: &mut Vec<u32>,
    supp_high_start: u32,
    data_null_offset: u32,
) -> (Vec<u16>, u32, usize) {
    // The BMP index is linear, and the index-1 table is used only for
    // supplementary code points.
    if supp_high_start <= BMP_LIMIT {
        index.truncate(BMP_I_LIMIT as usize);
        return (Vec::new(), NO_INDEX2_NULL_OFFSET, BMP_I_LIMIT as usize);
    }

    let i_limit = (supp_high_start >> SHIFT_2) as usize;
    debug_assert_eq!(index.len(), i_limit);
    let block_length = INDEX_2_BLOCK_LENGTH as usize;
    let bmp_i_limit = BMP_I_LIMIT as usize;
    // The index-1 table is inserted between the BMP and supplementary
    // index-2 parts when writing the final structure; index-1 entries are
    // offset by its length.
    let offset = ((supp_high_start - BMP_LIMIT) >> SHIFT_1) as usize;
    debug_assert!(offset <= MAX_INDEX_1_LENGTH as usize);
    let mut index1: Vec<u16> = Vec::with_capacity(offset);
    let mut new_start = bmp_i_limit;
    let mut null_offset: Option<usize> = None;

    let mut start = bmp_i_limit;
    while start < i_limit {
        let chunk: Vec<u32> = index[start..start + block_length].to_vec();
        let chunk_is_null = data_null_offset != NO_DATA_NULL_OFFSET
            && chunk.iter().all(|&v| v == data_null_offset);
        let i2 = if let (true, Some(n)) = (chunk_is_null, null_offset) {
            // Same as the index-2 null block.
            n
        } else {
            let i2 = if let Some(n) = find_same_block(&index[..bmp_i_limit], &chunk, 1) {
                // Matches a BMP index block.
                n
            } else if let Some(n) = find_same_block(&index[bmp_i_limit..new_start], &chunk, 1) {
                bmp_i_limit + offset + n
            } else {
                let n = if new_start == bmp_i_limit {
                    // No overlap across the BMP boundary: index shifting
                    // differs there, and the index-1 table will be
                    // inserted in between.
                    0
                } else {
                    get_overlap(&index[bmp_i_limit..new_start], &chunk, 1)
                };
                let i2 = offset + new_start - n;
                if n > 0 || new_start != start {
                    let mut k = n;
                    while k < block_length {
                        index[new_start] = chunk[k];
                        new_start += 1;
                        k += 1;
                    }
                } else {
                    new_start += block_length;
                }
                i2
            };
            if chunk_is_null && null_offset.is_none() {
                // The first index-2 block with all dataNullOffset.
                null_offset = Some(i2);
            }
            i2
        };
        index1.push(i2 as u16);
        start += block_length;
    }

    let index2_null_offset = null_offset.map_or(NO_INDEX2_NULL_OFFSET, |n| n as u32);

    // Ensure data table alignment: granularity-aligned for a 16-bit trie
    // (so that the data start will be down-shiftable), and 2-aligned for
    // 32-bit data.
    index.truncate(new_start);
    let mut length = new_start + offset;
    while length & ((DATA_GRANULARITY as usize - 1) | 1) != 0 {
        // Arbitrary value, impossible for real data.
        index.push(0xffffu32 << INDEX_SHIFT);
        length += 1;
    }

    (index1, index2_null_offset, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_same_block_granularity() {
        let p = [1, 2, 3, 4, 5, 1, 2, 3, 4, 5];
        assert_eq!(find_same_block(&p, &[2, 3, 4], 1), Some(1));
        // Step 2 skips the odd-offset match at 1 and finds the one at 6.
        assert_eq!(find_same_block(&p, &[2, 3, 4], 2), Some(6));
        assert_eq!(find_same_block(&p, &[9, 9], 1), None);
    }

    #[test]
    fn test_find_all_same_block() {
        let mut p = [7u32; 40];
        p[0] = 1;
        p[33] = 1;
        assert_eq!(find_all_same_block(&p, 7, 1), Some(1));
        assert_eq!(find_all_same_block(&p, 7, 2), Some(2));
        assert_eq!(find_all_same_block(&p, 1, 1), None);
    }

    #[test]
    fn test_get_overlap() {
        let mut p = [9u32; 20];
        p[17] = 1;
        p[18] = 2;
        p[19] = 3;
        let block = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        assert_eq!(get_overlap(&p, &block, 1), 3);
        // No granularity-aligned overlap exists for this suffix.
        assert_eq!(get_overlap(&p, &block, 2), 0);
        assert_eq!(get_overlap(&p, &[8u32; 16], 1), 0);
    }

    #[test]
    fn test_all_same_overlap() {
        let mut p = [3u32; 32];
        p[26] = 9;
        assert_eq!(all_same_overlap(&p, 3, 1), 5);
        assert_eq!(all_same_overlap(&p, 3, 2), 4);
        assert_eq!(all_same_overlap(&p, 9, 1), 0);
    }

    #[test]
    fn test_all_same_blocks_mru() {
        let mut mru = AllSameBlocks::new();
        assert!(matches!(mru.find_or_add(0, 100), FindOrAdd::New));
        assert!(matches!(mru.find_or_add(1, 100), FindOrAdd::Found(0)));
        assert!(matches!(mru.find_or_add(2, 200), FindOrAdd::New));
        assert!(matches!(mru.find_or_add(3, 100), FindOrAdd::Found(0)));
        // Value 100 was referenced three times, 200 once.
        assert_eq!(mru.most_used(), Some((0, 100)));
    }

    #[test]
    fn test_all_same_blocks_overflow() {
        let mut mru = AllSameBlocks::new();
        for v in 0..AllSameBlocks::CAPACITY {
            assert!(matches!(mru.find_or_add(v, v as u32), FindOrAdd::New));
        }
        assert!(matches!(mru.find_or_add(99, 999), FindOrAdd::Overflow));
        // Eviction replaces a least-used entry; the newcomer is then found.
        mru.replace_least_used(99, 999);
        assert!(matches!(mru.find_or_add(100, 999), FindOrAdd::Found(99)));
    }
}
