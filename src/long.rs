//! 64-bit values as `{low, high}` word pairs.
//!
//! Defaults of 64-bit fields are carried as two 32-bit halves. Comparing a
//! value against such a default goes through [`long_ne`] rather than plain
//! equality.

/// A 64-bit value split into its low and high 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LongBits {
    pub low: u32,
    pub high: u32,
}

impl LongBits {
    #[inline]
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    #[inline]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            low: value as u32,
            high: (value >> 32) as u32,
        }
    }

    #[inline]
    pub const fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    #[inline]
    pub const fn to_u64(self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

impl From<u64> for LongBits {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<i64> for LongBits {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

/// Returns true when `value` differs from the 64-bit number made of `low` and `high`.
#[inline]
pub fn long_ne(value: impl Into<LongBits>, low: u32, high: u32) -> bool {
    let bits = value.into();
    bits.low != low || bits.high != high
}
