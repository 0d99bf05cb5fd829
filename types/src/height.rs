//! Chain height of a transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Where a transaction sits relative to the chain.
///
/// Persisted as a signed integer: a confirmed block height is `>= 0`,
/// the mempool sentinel is `-1`, and an unknown height is absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Height {
    /// Confirmed in a block at this height.
    Confirmed(u64),
    /// Seen in the mempool, not yet confirmed.
    Mempool,
    /// Height not yet known (announced but neither confirmed nor parsed).
    Unknown,
}

impl Height {
    /// The mempool sentinel value used in the persisted representation.
    pub const MEMPOOL_SENTINEL: i64 = -1;

    /// Whether this is a confirmed height strictly above `h`.
    pub fn is_above(&self, h: u64) -> bool {
        matches!(self, Height::Confirmed(c) if *c > h)
    }

    pub fn is_mempool(&self) -> bool {
        matches!(self, Height::Mempool)
    }

    /// The persisted signed representation; `None` for an unknown height.
    pub fn to_raw(&self) -> Option<i64> {
        match self {
            Height::Confirmed(h) => Some(*h as i64),
            Height::Mempool => Some(Self::MEMPOOL_SENTINEL),
            Height::Unknown => None,
        }
    }

    /// Decode the persisted representation.
    pub fn from_raw(raw: Option<i64>) -> Result<Self, TypeError> {
        match raw {
            None => Ok(Height::Unknown),
            Some(Self::MEMPOOL_SENTINEL) => Ok(Height::Mempool),
            Some(h) if h >= 0 => Ok(Height::Confirmed(h as u64)),
            Some(h) => Err(TypeError::InvalidHeight(h)),
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Height::Confirmed(h) => write!(f, "{h}"),
            Height::Mempool => write!(f, "mempool"),
            Height::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        for h in [Height::Confirmed(0), Height::Confirmed(812_345), Height::Mempool, Height::Unknown] {
            assert_eq!(Height::from_raw(h.to_raw()).unwrap(), h);
        }
    }

    #[test]
    fn negative_non_sentinel_is_invalid() {
        assert!(Height::from_raw(Some(-2)).is_err());
    }

    #[test]
    fn is_above_only_for_confirmed() {
        assert!(Height::Confirmed(100).is_above(99));
        assert!(!Height::Confirmed(100).is_above(100));
        assert!(!Height::Mempool.is_above(0));
        assert!(!Height::Unknown.is_above(0));
    }
}
