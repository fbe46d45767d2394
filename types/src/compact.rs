//! 256-bit unsigned arithmetic and the 32-bit compact ("bits") target encoding.
//!
//! A compact target packs a 256-bit value into a one-byte exponent (the size of
//! the value in bytes) and a 23-bit mantissa, with bit 23 of the mantissa acting
//! as a sign flag. Decoding reports the sign and overflow conditions instead of
//! silently producing a wrapped value, so consensus code can reject them.

use serde::{Deserialize, Serialize};
use std::fmt;

uint::construct_uint! {
    /// Fixed-width 256-bit unsigned integer used for targets and chain work.
    pub struct U256(4);
}

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// A difficulty target in its compact 32-bit form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CompactTarget(u32);

/// Result of decoding a [`CompactTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedTarget {
    pub value: U256,
    /// The sign bit was set on a non-zero mantissa.
    pub negative: bool,
    /// The encoded value does not fit in 256 bits.
    pub overflow: bool,
}

impl DecodedTarget {
    /// A usable target: positive, not overflowed, non-zero.
    pub fn is_valid(&self) -> bool {
        !self.negative && !self.overflow && !self.value.is_zero()
    }
}

impl CompactTarget {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Decode the compact form into a 256-bit value plus sign/overflow flags.
    pub fn decode(self) -> DecodedTarget {
        let size = self.0 >> 24;
        let mut word = self.0 & MANTISSA_MASK;

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            U256::from(word)
        } else if size - 3 >= 32 {
            U256::zero()
        } else {
            U256::from(word) << (8 * (size - 3))
        };

        let negative = word != 0 && (self.0 & SIGN_BIT) != 0;
        let overflow =
            word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        DecodedTarget {
            value,
            negative,
            overflow,
        }
    }

    /// Encode a 256-bit value into its (normalised, non-negative) compact form.
    pub fn from_target(target: &U256) -> Self {
        let mut size = target.bits().div_ceil(8) as u32;
        let mut compact = if size <= 3 {
            (target.low_u64() << (8 * (3 - size))) as u32
        } else {
            (*target >> (8 * (size - 3))).low_u64() as u32
        };

        // The mantissa would be read back as negative; move one byte into the exponent.
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        Self(compact | (size << 24))
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget({:08x})", self.0)
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
