use proptest::prelude::*;

use jigdex_types::{Height, Location, Timestamp, Txid};
use jigdex_types::location::LocationKind;

proptest! {
    /// Txid roundtrip: new -> as_bytes -> new produces identical id.
    #[test]
    fn txid_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let txid = Txid::new(bytes);
        prop_assert_eq!(txid.as_bytes(), &bytes);
    }

    /// Txid hex roundtrip through the canonical external form.
    #[test]
    fn txid_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let txid = Txid::new(bytes);
        prop_assert_eq!(Txid::from_hex(&txid.to_hex()).unwrap(), txid);
    }

    /// Txid::is_zero is true only for all-zero bytes.
    #[test]
    fn txid_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let txid = Txid::new(bytes);
        prop_assert_eq!(txid.is_zero(), bytes == [0u8; 32]);
    }

    /// Txid bincode serialization roundtrip.
    #[test]
    fn txid_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let txid = Txid::new(bytes);
        let encoded = bincode::serialize(&txid).unwrap();
        let decoded: Txid = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.as_bytes(), txid.as_bytes());
    }

    /// Height raw-representation roundtrip for confirmed heights.
    #[test]
    fn height_raw_roundtrip(h in 0u64..=i64::MAX as u64) {
        let height = Height::Confirmed(h);
        prop_assert_eq!(Height::from_raw(height.to_raw()).unwrap(), height);
    }

    /// Location string roundtrip for both kinds and any index.
    #[test]
    fn location_roundtrip(
        bytes in prop::array::uniform32(0u8..),
        index in 0u32..,
        derivative in any::<bool>(),
    ) {
        let txid = Txid::new(bytes);
        let loc = if derivative {
            Location::derivative(txid, index)
        } else {
            Location::output(txid, index)
        };
        let parsed: Location = loc.to_string().parse().unwrap();
        prop_assert_eq!(parsed, loc);
    }

    /// A location string always begins with the producing txid's hex — the
    /// property cascading deletes rely on.
    #[test]
    fn location_starts_with_txid_prefix(
        bytes in prop::array::uniform32(0u8..),
        index in 0u32..,
    ) {
        let txid = Txid::new(bytes);
        let loc = Location::output(txid, index);
        prop_assert!(loc.to_string().starts_with(&txid.to_hex()));
        prop_assert_eq!(loc.txid_prefix(), txid.to_hex());
    }

    /// LocationKind is preserved through parsing.
    #[test]
    fn location_kind_preserved(bytes in prop::array::uniform32(0u8..), index in 0u32..) {
        let loc = Location::derivative(Txid::new(bytes), index);
        let parsed: Location = loc.to_string().parse().unwrap();
        prop_assert_eq!(parsed.kind, LocationKind::Derivative);
    }

    /// Timestamp ordering matches the underlying seconds.
    #[test]
    fn timestamp_ordering(a in 0u64.., b in 0u64..) {
        prop_assert_eq!(Timestamp::new(a) < Timestamp::new(b), a < b);
    }

    /// An eviction cutoff rewound by `secs` classifies exactly the records
    /// strictly older than `now - secs` as stale.
    #[test]
    fn timestamp_rewound_cutoff(now in 0u64..2_000_000, expiry in 0u64..1_000_000, t in 0u64..2_000_000) {
        let cutoff = Timestamp::new(now).rewound_by(expiry);
        prop_assert_eq!(Timestamp::new(t) < cutoff, t < now.saturating_sub(expiry));
    }

    /// Rewinding never goes below the epoch.
    #[test]
    fn timestamp_rewound_saturates(base in 0u64..1_000_000, secs in 0u64..) {
        prop_assert_eq!(
            Timestamp::new(base).rewound_by(secs).as_secs(),
            base.saturating_sub(secs)
        );
    }
}
