//! Block hash type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::compact::U256;
use crate::TypesError;

/// A 32-byte block header hash.
///
/// The bytes are interpreted as a big-endian 256-bit number when compared
/// against a proof-of-work target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl Default for BlockHash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Numeric value of the hash for target comparison.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    pub fn from_u256(value: &U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }
}

impl FromStr for BlockHash {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypesError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_value_is_big_endian() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x01;
        assert_eq!(BlockHash::new(bytes).to_u256(), U256::one());

        bytes = [0u8; 32];
        bytes[0] = 0x80;
        assert_eq!(BlockHash::new(bytes).to_u256(), U256::one() << 255);
    }

    #[test]
    fn parses_display_output() {
        let hash = BlockHash::new([0xab; 32]);
        let parsed: BlockHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        let prefixed: BlockHash = format!("0x{hash}").parse().unwrap();
        assert_eq!(prefixed, hash);
    }

    #[test]
    fn rejects_short_hex() {
        let err = "abcd".parse::<BlockHash>().unwrap_err();
        assert_eq!(
            err,
            TypesError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert!(matches!(
            "zz".parse::<BlockHash>(),
            Err(TypesError::InvalidHex(_))
        ));
    }
}
