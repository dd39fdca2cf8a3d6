// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

//! The frozen, immutable form of a code point trie and its serialized
//! layout.

use alloc::vec::Vec;
use core::convert::TryFrom;

use crate::error::Error;
use crate::impl_const::*;
use yoke::Yokeable;
use zerofrom::ZeroFrom;
use zerovec::ZeroVec;

/// The width of the values stored in the data array of a frozen
/// [`CodePointTrie`].
///
/// The builder always works with 32-bit values; freezing with
/// [`Bits16`](ValueWidth::Bits16) masks them to their low 16 bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueWidth {
    /// 16 bits per data value; the data array shares the serialized
    /// 16-bit array with the index.
    Bits16 = 0,
    /// 32 bits per data value; the data array is serialized separately
    /// after the index.
    Bits32 = 1,
}

impl TryFrom<u8> for ValueWidth {
    type Error = Error;

    fn try_from(value_width_int: u8) -> Result<ValueWidth, Error> {
        match value_width_int {
            0 => Ok(ValueWidth::Bits16),
            1 => Ok(ValueWidth::Bits32),
            _ => Err(Error::InvalidFormat {
                reason: "unrecognized value width",
            }),
        }
    }
}

/// The fixed-length header fields of a [`CodePointTrie`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Yokeable, ZeroFrom)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodePointTrieHeader {
    /// The first code point of the high range: all code points from here
    /// to U+10FFFF map to [`Self::high_value`]. Always a multiple of
    /// 8192.
    pub high_start: u32,
    /// `high_start >> 13`, as stored in the serialized form.
    pub shifted_high_start: u16,
    /// Position of the null block in the index-2 part of the index
    /// array, or `0xFFFF` if there is no dedicated index-2 null block.
    pub index2_null_offset: u16,
    /// Position of the data null block in the serialized value space
    /// (including the data-move offset of a 16-bit trie), or `0xFFFFF`
    /// if there is no dedicated data null block.
    pub data_null_offset: u32,
    /// The value of all code points at or above [`Self::high_start`].
    pub high_value: u32,
    /// The value returned for out-of-range queries. Never masked.
    pub error_value: u32,
    /// Width of the data values.
    pub value_width: ValueWidth,
}

/// The data array of a frozen [`CodePointTrie`], at its serialized width.
#[derive(Clone, Debug, Eq, PartialEq, Yokeable, ZeroFrom)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodePointTrieData<'trie> {
    /// 16-bit data values.
    Bits16(#[cfg_attr(feature = "serde", serde(borrow))] ZeroVec<'trie, u16>),
    /// 32-bit data values.
    Bits32(#[cfg_attr(feature = "serde", serde(borrow))] ZeroVec<'trie, u32>),
}

impl CodePointTrieData<'_> {
    /// Number of data values.
    pub fn len(&self) -> usize {
        match self {
            CodePointTrieData::Bits16(data) => data.len(),
            CodePointTrieData::Bits32(data) => data.len(),
        }
    }

    /// Whether there are no data values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `i`, widened to 32 bits.
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            CodePointTrieData::Bits16(data) => data.get(i).map(u32::from),
            CodePointTrieData::Bits32(data) => data.get(i),
        }
    }

    /// The little-endian bytes of the data array.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CodePointTrieData::Bits16(data) => data.as_bytes(),
            CodePointTrieData::Bits32(data) => data.as_bytes(),
        }
    }
}

/// A frozen code point trie: the compact two-stage lookup structure
/// produced by [`MutableCodePointTrie::freeze`].
///
/// A lookup is a handful of shifts, masks and array reads: BMP code
/// points take one index read and one data read; supplementary code
/// points take two additional index reads. Code points at or above
/// `high_start` short-circuit to `high_value`, and out-of-range queries
/// return `error_value`.
///
/// # Examples
///
/// ```
/// use icu_codepointtrie_builder::{MutableCodePointTrie, ValueWidth};
///
/// let mut builder = MutableCodePointTrie::new(0, 0xff);
/// builder.set_range(0x1_0000, 0x1_ffff, 1, true).unwrap();
/// let trie = builder.freeze(ValueWidth::Bits32).unwrap();
///
/// assert_eq!(trie.get32(0x41), 0);
/// assert_eq!(trie.get32(0x1_0044), 1);
/// assert_eq!(trie.get('𐁄'), 1);
/// assert_eq!(trie.get32(0x11_0000), 0xff);
/// ```
///
/// [`MutableCodePointTrie::freeze`]: crate::MutableCodePointTrie::freeze
#[derive(Clone, Debug, Eq, PartialEq, Yokeable, ZeroFrom)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodePointTrie<'trie> {
    pub(crate) header: CodePointTrieHeader,
    #[cfg_attr(feature = "serde", serde(borrow))]
    pub(crate) index: ZeroVec<'trie, u16>,
    #[cfg_attr(feature = "serde", serde(borrow))]
    pub(crate) data: CodePointTrieData<'trie>,
}

impl<'trie> CodePointTrie<'trie> {
    pub(crate) fn from_parts(
        header: CodePointTrieHeader,
        index: ZeroVec<'trie, u16>,
        data: CodePointTrieData<'trie>,
    ) -> Self {
        CodePointTrie {
            header,
            index,
            data,
        }
    }

    /// The header fields.
    pub fn header(&self) -> &CodePointTrieHeader {
        &self.header
    }

    /// Number of 16-bit index entries.
    pub fn index_length(&self) -> usize {
        self.index.len()
    }

    /// Number of data values.
    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    /// The index array.
    pub fn index(&self) -> &ZeroVec<'trie, u16> {
        &self.index
    }

    /// The data array.
    pub fn data(&self) -> &CodePointTrieData<'trie> {
        &self.data
    }

    /// Returns the value that is associated with `code_point`, or the
    /// error value if `code_point` is not a code point.
    pub fn get32(&self, code_point: u32) -> u32 {
        if code_point > CODE_POINT_MAX {
            return self.header.error_value;
        }
        if code_point >= self.header.high_start {
            return self.header.high_value;
        }
        self.data_position(code_point)
            .and_then(|di| self.data.get(di))
            .unwrap_or(self.header.error_value)
    }

    /// Returns the value that is associated with `c`.
    pub fn get(&self, c: char) -> u32 {
        self.get32(u32::from(c))
    }

    /// Position of `code_point`'s value in the data array.
    ///
    /// Index entries address the serialized value space: for a 16-bit
    /// trie the data array follows the index in the same 16-bit array,
    /// so the index length is subtracted again here.
    fn data_position(&self, code_point: u32) -> Option<usize> {
        let data_move = match self.header.value_width {
            ValueWidth::Bits16 => self.index.len() as u32,
            ValueWidth::Bits32 => 0,
        };
        let pos = if code_point < BMP_LIMIT {
            let index_val = self.index.get((code_point >> SHIFT_2) as usize)?;
            u32::from(index_val) + (code_point & DATA_MASK)
        } else {
            let i1 = BMP_I_LIMIT - OMITTED_BMP_INDEX_1_LENGTH + (code_point >> SHIFT_1);
            let i2 = u32::from(self.index.get(i1 as usize)?);
            let i2_entry_pos = i2 + ((code_point >> SHIFT_2) & INDEX_2_MASK);
            let entry = u32::from(self.index.get(i2_entry_pos as usize)?);
            // Index-2 blocks reused from the BMP region hold unshifted
            // entries; entries in the supplementary region are shifted.
            let offset = if i2 < BMP_I_LIMIT {
                entry
            } else {
                entry << INDEX_SHIFT
            };
            offset + (code_point & DATA_MASK)
        };
        pos.checked_sub(data_move).map(|di| di as usize)
    }

    /// Serializes the trie: header, 16-bit index array, then the data
    /// array at its value width, all little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let index_bytes = self.index.as_bytes();
        let data_bytes = self.data.as_bytes();
        let mut bytes = Vec::with_capacity(HEADER_LENGTH + index_bytes.len() + data_bytes.len());
        bytes.extend_from_slice(&SIG_V3);
        let options = (self.header.data_null_offset << 12) | self.header.value_width as u32;
        bytes.extend_from_slice(&options.to_le_bytes());
        bytes.extend_from_slice(&(self.index.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&((self.data.len() >> INDEX_SHIFT) as u16).to_le_bytes());
        bytes.extend_from_slice(&self.header.index2_null_offset.to_le_bytes());
        bytes.extend_from_slice(&self.header.shifted_high_start.to_le_bytes());
        bytes.extend_from_slice(&self.header.high_value.to_le_bytes());
        bytes.extend_from_slice(&self.header.error_value.to_le_bytes());
        bytes.extend_from_slice(index_bytes);
        bytes.extend_from_slice(data_bytes);
        bytes
    }

    /// Parses a serialized trie, borrowing the index and data arrays
    /// from `bytes`. Trailing bytes are ignored.
    pub fn try_from_bytes(bytes: &'trie [u8]) -> Result<Self, Error> {
        if format_version(bytes)? != 3 {
            return Err(Error::InvalidFormat {
                reason: "only version 3 data can be parsed",
            });
        }
        let options = read_u32(bytes, 4).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let index_length = read_u16(bytes, 8).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let shifted_data_length = read_u16(bytes, 10).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let index2_null_offset = read_u16(bytes, 12).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let shifted_high_start = read_u16(bytes, 14).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let high_value = read_u32(bytes, 16).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;
        let error_value = read_u32(bytes, 20).ok_or(Error::InvalidFormat {
            reason: "header too short",
        })?;

        let value_width = ValueWidth::try_from((options & 0xf) as u8)?;
        let data_null_offset = options >> 12;
        let data_length = usize::from(shifted_data_length) << INDEX_SHIFT;

        let index_start = HEADER_LENGTH;
        let index_end = index_start + usize::from(index_length) * 2;
        let index_bytes = bytes
            .get(index_start..index_end)
            .ok_or(Error::InvalidFormat {
                reason: "truncated index array",
            })?;
        let index: ZeroVec<u16> =
            ZeroVec::parse_bytes(index_bytes).map_err(|_| Error::InvalidFormat {
                reason: "malformed index array",
            })?;

        let value_size = match value_width {
            ValueWidth::Bits16 => 2,
            ValueWidth::Bits32 => 4,
        };
        let data_end = index_end + data_length * value_size;
        let data_bytes = bytes.get(index_end..data_end).ok_or(Error::InvalidFormat {
            reason: "truncated data array",
        })?;
        let data = match value_width {
            ValueWidth::Bits16 => CodePointTrieData::Bits16(
                ZeroVec::parse_bytes(data_bytes).map_err(|_| Error::InvalidFormat {
                    reason: "malformed data array",
                })?,
            ),
            ValueWidth::Bits32 => CodePointTrieData::Bits32(
                ZeroVec::parse_bytes(data_bytes).map_err(|_| Error::InvalidFormat {
                    reason: "malformed data array",
                })?,
            ),
        };

        Ok(CodePointTrie {
            header: CodePointTrieHeader {
                high_start: u32::from(shifted_high_start) << SHIFT_1,
                shifted_high_start,
                index2_null_offset,
                data_null_offset,
                high_value,
                error_value,
                value_width,
            },
            index,
            data,
        })
    }
}

/// Reads the format version of serialized code point trie data from its
/// leading signature, without parsing the rest.
///
/// Versions 1 and 3 are recognized; version 2 is reserved and rejected,
/// as is any unknown signature.
pub fn format_version(bytes: &[u8]) -> Result<u8, Error> {
    let signature: [u8; 4] = bytes
        .get(..4)
        .and_then(|sig| sig.try_into().ok())
        .ok_or(Error::InvalidFormat {
            reason: "missing signature",
        })?;
    match signature {
        SIG_V1 => Ok(1),
        SIG_V3 => Ok(3),
        SIG_V2 => Err(Error::InvalidFormat {
            reason: "version 2 is reserved",
        }),
        _ => Err(Error::InvalidFormat {
            reason: "unknown signature",
        }),
    }
}

fn read_u16(bytes: &[u8], pos: usize) -> Option<u16> {
    bytes
        .get(pos..pos + 2)
        .and_then(|b| <[u8; 2]>::try_from(b).ok())
        .map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], pos: usize) -> Option<u32> {
    bytes
        .get(pos..pos + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(b"Trie????"), Ok(1));
        assert_eq!(format_version(b"Tri3????"), Ok(3));
        assert_eq!(
            format_version(b"Tri2????"),
            Err(Error::InvalidFormat {
                reason: "version 2 is reserved"
            })
        );
        assert!(format_version(b"Axolotl?").is_err());
        assert!(format_version(b"Tr").is_err());
    }

    #[test]
    fn test_value_width_round_trip() {
        for width in [ValueWidth::Bits16, ValueWidth::Bits32] {
            assert_eq!(ValueWidth::try_from(width as u8), Ok(width));
        }
        assert!(ValueWidth::try_from(2).is_err());
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_serde_with_postcard_roundtrip() {
        let mut builder = crate::MutableCodePointTrie::new(0, 1);
        builder.set_range(0x100, 0x1ff, 3, true).unwrap();
        builder.set(0x1_0000, 5).unwrap();
        let trie = builder.freeze(ValueWidth::Bits16).unwrap();

        let trie_serialized = postcard::to_allocvec(&trie).unwrap();
        let trie_deserialized =
            postcard::from_bytes::<CodePointTrie>(&trie_serialized).unwrap();
        assert_eq!(trie_deserialized, trie);
        assert_eq!(trie_deserialized.get32(0x1_0000), 5);
    }
}
