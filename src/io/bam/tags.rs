//! BAM optional tags (auxiliary data).
//!
//! # Format
//!
//! The tag region fills the rest of a record after the quality scores. Each
//! tag is encoded as:
//! - 2 bytes: tag name (e.g., "CB")
//! - 1 byte: value type
//! - N bytes: value
//!
//! | Type        | Value                                          |
//! |-------------|------------------------------------------------|
//! | `A` `c` `C` | 1 byte                                         |
//! | `s` `S`     | 2 bytes                                        |
//! | `i` `I` `f` | 4 bytes                                        |
//! | `Z` `H`     | NUL-terminated string                          |
//! | `B`         | subtype byte, `u32` count, count × subtype width |
//!
//! Only the barcode tag is consumed by the decoder, so tags are kept raw and
//! scanned on demand. A type code outside the table has no known width;
//! scanning stops there and the remaining bytes are treated as opaque.

use crate::error::{BamError, Result};
use std::borrow::Cow;

/// Fixed width of a scalar type code, or of an array element subtype.
fn scalar_width(type_code: u8) -> Option<usize> {
    match type_code {
        b'A' | b'c' | b'C' => Some(1),
        b's' | b'S' => Some(2),
        b'i' | b'I' | b'f' => Some(4),
        _ => None,
    }
}

/// Raw tag region of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    data: Vec<u8>,
    /// Logical stream offset of the region, for error reporting
    offset: u64,
}

impl Tags {
    /// Create an empty tag region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw tag bytes found at logical `offset`.
    pub fn from_raw(data: Vec<u8>, offset: u64) -> Self {
        Self { data, offset }
    }

    /// Raw tag bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the region in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Logical stream offset of the region.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Iterate over tags in stored order.
    pub fn iter(&self) -> TagIter<'_> {
        TagIter {
            data: &self.data,
            pos: 0,
            offset: self.offset,
        }
    }

    /// First tag named `key`, if present before any unrecognised type code.
    pub fn get(&self, key: &[u8; 2]) -> Result<Option<Tag<'_>>> {
        for tag in self.iter() {
            let tag = tag?;
            if &tag.key == key {
                return Ok(Some(tag));
            }
        }
        Ok(None)
    }
}

/// One tag, with its value still encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Two-character tag name
    pub key: [u8; 2],
    /// Value type code
    pub type_code: u8,
    /// Encoded value bytes (for `Z`/`H`, without the NUL)
    raw: &'a [u8],
}

impl<'a> Tag<'a> {
    /// Decode the value.
    pub fn value(&self) -> TagValue<'a> {
        let raw = self.raw;
        match self.type_code {
            b'A' => TagValue::Char(raw[0]),
            b'c' => TagValue::Int(raw[0] as i8 as i64),
            b'C' => TagValue::Int(raw[0] as i64),
            b's' => TagValue::Int(i16::from_le_bytes([raw[0], raw[1]]) as i64),
            b'S' => TagValue::Int(u16::from_le_bytes([raw[0], raw[1]]) as i64),
            b'i' => TagValue::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64),
            b'I' => TagValue::Int(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64),
            b'f' => TagValue::Float(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            b'Z' => TagValue::String(raw),
            b'H' => TagValue::Hex(raw),
            // TagIter only yields the types above and B
            _ => TagValue::Array(ArrayValue {
                subtype: raw[0],
                data: &raw[5..],
            }),
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagValue<'a> {
    /// Printable character (`A`)
    Char(u8),
    /// Any integer type (`cCsSiI`)
    Int(i64),
    /// Single-precision float (`f`)
    Float(f32),
    /// Text (`Z`)
    String(&'a [u8]),
    /// Hex-encoded byte array (`H`)
    Hex(&'a [u8]),
    /// Numeric array (`B`)
    Array(ArrayValue<'a>),
}

impl<'a> TagValue<'a> {
    /// Textual view of a `Z`, `H` or `A` value; `None` for numbers and arrays.
    pub fn as_text(&self) -> Option<Cow<'a, str>> {
        match *self {
            Self::String(bytes) | Self::Hex(bytes) => Some(String::from_utf8_lossy(bytes)),
            Self::Char(c) => Some(Cow::Owned(char::from(c).to_string())),
            _ => None,
        }
    }
}

/// Numeric array value, still little-endian encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayValue<'a> {
    /// Element type code (`cCsSiIf`)
    pub subtype: u8,
    data: &'a [u8],
}

impl ArrayValue<'_> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        scalar_width(self.subtype).map_or(0, |w| self.data.len() / w)
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer elements widened to `i64`; `None` for float arrays.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        let d = self.data;
        let values = match self.subtype {
            b'c' => d.iter().map(|&b| b as i8 as i64).collect(),
            b'C' => d.iter().map(|&b| b as i64).collect(),
            b's' => d
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as i64)
                .collect(),
            b'S' => d
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as i64)
                .collect(),
            b'i' => d
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
            b'I' => d
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
            _ => return None,
        };
        Some(values)
    }

    /// Elements as packed `u32` values for `i`/`I` arrays.
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        matches!(self.subtype, b'i' | b'I').then(|| {
            self.data
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }
}

/// Iterator over the tags of a region.
///
/// Yields an error if a tag of a known type overruns the region, then stops.
/// Stops silently at an unrecognised type code.
pub struct TagIter<'a> {
    data: &'a [u8],
    pos: usize,
    offset: u64,
}

impl<'a> TagIter<'a> {
    fn overrun(&mut self, at: usize, key: [u8; 2], need: usize) -> Option<Result<Tag<'a>>> {
        let err = BamError::malformed(
            self.offset + at as u64,
            format!(
                "tag {}{} needs {} bytes, {} remain in record",
                key[0] as char,
                key[1] as char,
                need,
                self.data.len().saturating_sub(at)
            ),
        );
        self.pos = self.data.len();
        Some(Err(err))
    }

    fn stop_unknown(&mut self, at: usize, key: [u8; 2], code: u8) -> Option<Result<Tag<'a>>> {
        log::trace!(
            "Unrecognised type code {:?} for tag {}{} at offset {}; ignoring rest of tag region",
            code as char,
            key[0] as char,
            key[1] as char,
            self.offset + at as u64
        );
        self.pos = self.data.len();
        None
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = Result<Tag<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let remaining = self.data.len() - start;
        if remaining == 0 {
            return None;
        }
        if remaining < 3 {
            let key = [self.data[start], *self.data.get(start + 1).unwrap_or(&b'?')];
            return self.overrun(start, key, 3);
        }

        let key = [self.data[start], self.data[start + 1]];
        let type_code = self.data[start + 2];
        let value_at = start + 3;
        let rest = &self.data[value_at..];

        let (raw, consumed) = match type_code {
            b'Z' | b'H' => match rest.iter().position(|&b| b == 0) {
                Some(nul) => (&rest[..nul], nul + 1),
                None => return self.overrun(value_at, key, rest.len() + 1),
            },
            b'B' => {
                if rest.len() < 5 {
                    return self.overrun(value_at, key, 5);
                }
                let subtype = rest[0];
                let Some(width) = scalar_width(subtype).filter(|_| subtype != b'A') else {
                    return self.stop_unknown(value_at, key, subtype);
                };
                let count = u32::from_le_bytes([rest[1], rest[2], rest[3], rest[4]]) as usize;
                let need = count
                    .checked_mul(width)
                    .and_then(|n| n.checked_add(5))
                    .unwrap_or(usize::MAX);
                if rest.len() < need {
                    return self.overrun(value_at, key, need);
                }
                (&rest[..need], need)
            }
            code => match scalar_width(code) {
                Some(width) if rest.len() >= width => (&rest[..width], width),
                Some(width) => return self.overrun(value_at, key, width),
                None => return self.stop_unknown(start + 2, key, code),
            },
        };

        self.pos = value_at + consumed;
        Some(Ok(Tag {
            key,
            type_code,
            raw,
        }))
    }
}

/// Wrap and validate a record's tag region.
///
/// Every tag up to the end of the region (or the first unrecognised type
/// code) is framed; a known-type value running past the region is an error.
pub fn parse_tags(data: &[u8], offset: u64) -> Result<Tags> {
    let tags = Tags::from_raw(data.to_vec(), offset);
    for tag in tags.iter() {
        tag?;
    }
    Ok(tags)
}
