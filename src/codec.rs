//! Conversions between pairs of 16-bit register words and the values they carry.
//!
//! The CPA1110 stores 32-bit values across two input registers, low word first, with each
//! word's bytes in little-endian order.

use std::collections::HashMap;

use strum::IntoEnumIterator;

/// Decode a register pair into an IEEE-754 single-precision float.
///
/// The bit pattern is not validated, NaN and infinities are returned as-is.
#[inline]
pub fn decode_float(low: u16, high: u16) -> f32 {
    f32::from_le_bytes(pack(low, high))
}

/// Decode a register pair into a signed 32-bit integer.
#[inline]
pub fn decode_int32(low: u16, high: u16) -> i32 {
    i32::from_le_bytes(pack(low, high))
}

/// Split a float into the `(low, high)` register pair the device would report for it.
#[inline]
pub fn encode_float(value: f32) -> (u16, u16) {
    unpack(value.to_le_bytes())
}

/// Split an integer into its `(low, high)` register pair.
#[inline]
pub fn encode_int32(value: i32) -> (u16, u16) {
    unpack(value.to_le_bytes())
}

fn pack(low: u16, high: u16) -> [u8; 4] {
    let [b0, b1] = low.to_le_bytes();
    let [b2, b3] = high.to_le_bytes();
    [b0, b1, b2, b3]
}

fn unpack(bytes: [u8; 4]) -> (u16, u16) {
    let [b0, b1, b2, b3] = bytes;
    (u16::from_le_bytes([b0, b1]), u16::from_le_bytes([b2, b3]))
}

/// An enumeration reported by the device as an integer code.
///
/// Every implementor has a "not applicable" member that stands in for codes the client does
/// not know about, so newer firmware never makes decoding fail.
pub trait RegisterCode: Copy + IntoEnumIterator + 'static {
    /// Member returned for unrecognised codes.
    const NA: Self;

    /// The raw code of this member.
    fn code(self) -> i32;

    /// Lookup table for this enumeration, built on first use.
    fn code_table() -> &'static CodeTable<Self>;

    /// Map a raw code onto a member, falling back to [`Self::NA`].
    fn from_code(raw: i32) -> Self {
        Self::code_table().lookup(raw)
    }
}

/// Scan `candidates` for a member whose code equals `raw`.
///
/// Returns the first match, or `fallback` when nothing matches.
pub fn coerce_enum<T: RegisterCode>(raw: i32, candidates: &[T], fallback: T) -> T {
    candidates
        .iter()
        .copied()
        .find(|candidate| candidate.code() == raw)
        .unwrap_or(fallback)
}

/// Code to member map for one [`RegisterCode`] enumeration.
#[derive(Debug)]
pub struct CodeTable<T> {
    entries: HashMap<i32, T>,
    fallback: T,
}

impl<T: RegisterCode> CodeTable<T> {
    /// Build the table from every member of `T`.
    pub fn build() -> Self {
        let mut entries = HashMap::new();
        for member in T::iter() {
            // Keep the first member for a code, like a linear scan would.
            entries.entry(member.code()).or_insert(member);
        }
        Self {
            entries,
            fallback: T::NA,
        }
    }

    pub fn lookup(&self, raw: i32) -> T {
        self.entries.get(&raw).copied().unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
