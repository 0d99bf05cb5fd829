//! State locations.
//!
//! A location names one piece of program-derived state: `<txid>_o<n>` for the
//! n-th output of a transaction, `<txid>_d<n>` for the n-th derivative emitted
//! by the executor. Only the txid prefix is load-bearing for the indexer — it
//! drives cascading deletes — but the full form is parsed so malformed
//! executor output is rejected at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TypeError, Txid};

/// The kind of state a location points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// `<txid>_o<n>` — the n-th output.
    Output,
    /// `<txid>_d<n>` — the n-th derivative.
    Derivative,
}

/// A parsed state location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub txid: Txid,
    pub kind: LocationKind,
    pub index: u32,
}

impl Location {
    pub fn output(txid: Txid, index: u32) -> Self {
        Self {
            txid,
            kind: LocationKind::Output,
            index,
        }
    }

    pub fn derivative(txid: Txid, index: u32) -> Self {
        Self {
            txid,
            kind: LocationKind::Derivative,
            index,
        }
    }

    /// The txid prefix shared by every location of the producing transaction.
    pub fn txid_prefix(&self) -> String {
        self.txid.to_hex()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            LocationKind::Output => 'o',
            LocationKind::Derivative => 'd',
        };
        write!(f, "{}_{}{}", self.txid, tag, self.index)
    }
}

impl FromStr for Location {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TypeError::InvalidLocation(s.to_string());
        let (txid_part, rest) = s.split_once('_').ok_or_else(bad)?;
        let txid = Txid::from_hex(txid_part).map_err(|_| bad())?;
        let kind = match rest.as_bytes().first() {
            Some(b'o') => LocationKind::Output,
            Some(b'd') => LocationKind::Derivative,
            _ => return Err(bad()),
        };
        let index: u32 = rest[1..].parse().map_err(|_| bad())?;
        Ok(Self { txid, kind, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_roundtrip() {
        let loc = Location::output(Txid::new([0x11; 32]), 3);
        let s = loc.to_string();
        assert!(s.ends_with("_o3"));
        assert_eq!(s.parse::<Location>().unwrap(), loc);
    }

    #[test]
    fn derivative_roundtrip() {
        let loc = Location::derivative(Txid::new([0x22; 32]), 0);
        assert_eq!(loc.to_string().parse::<Location>().unwrap(), loc);
    }

    #[test]
    fn rejects_malformed() {
        assert!("nounderscoreanywhere".parse::<Location>().is_err());
        assert!(format!("{}_x1", Txid::ZERO).parse::<Location>().is_err());
        assert!(format!("{}_o", Txid::ZERO).parse::<Location>().is_err());
        assert!("shorthex_o1".parse::<Location>().is_err());
    }
}
