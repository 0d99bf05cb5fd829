//! Transaction identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// A 32-byte transaction identifier, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Txid([u8; 32]);

impl Txid {
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

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|_| TypeError::InvalidTxid(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidTxid(s.to_string()))?;
        Ok(Self(arr))
    }

    /// Lowercase hex rendering (the canonical external form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for Txid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let txid = Txid::new([0xAB; 32]);
        let hex = txid.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Txid::from_hex(&hex).unwrap(), txid);
    }

    #[test]
    fn from_hex_rejects_bad_length() {
        assert!(Txid::from_hex("abcd").is_err());
        assert!(Txid::from_hex(&"ff".repeat(33)).is_err());
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        assert!(Txid::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let txid = Txid::new([0xFF; 32]);
        assert_eq!(txid.to_string(), "ff".repeat(32));
    }

    #[test]
    fn parse_via_fromstr() {
        let txid: Txid = "11".repeat(32).parse().unwrap();
        assert_eq!(txid, Txid::new([0x11; 32]));
    }
}
