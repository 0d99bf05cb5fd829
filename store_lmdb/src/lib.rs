//! LMDB storage backend for the jigdex indexer.
//!
//! Implements all storage traits from `jigdex-store` using the `heed` LMDB
//! bindings. Each logical table maps to one LMDB database within a single
//! environment; atomic multi-table mutation goes through [`WriteBatch`].

pub mod dep;
pub mod environment;
pub mod error;
pub mod meta;
pub mod migration;
pub mod spend;
pub mod state;
pub mod trust;
pub mod tx;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use write_batch::WriteBatch;

use std::ops::Bound;

/// Increment a byte prefix in place to form the exclusive upper bound of a
/// prefix range scan. Trailing `0xFF` bytes are dropped; an empty result
/// means the prefix has no finite upper bound.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last == 0xFF {
            prefix.pop();
        } else {
            *last += 1;
            return;
        }
    }
}

/// Range bounds covering every key that starts with `prefix`. The returned
/// upper vector must outlive the borrowed bounds.
pub(crate) fn prefix_range<'a>(
    prefix: &'a [u8],
    upper: &'a mut Vec<u8>,
) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    upper.clear();
    upper.extend_from_slice(prefix);
    increment_prefix(upper);
    if upper.is_empty() {
        (Bound::Included(prefix), Bound::Unbounded)
    } else {
        (Bound::Included(prefix), Bound::Excluded(upper.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_simple() {
        let mut p = vec![0x01, 0x02];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x01, 0x03]);
    }

    #[test]
    fn increment_carries_past_ff() {
        let mut p = vec![0x01, 0xFF, 0xFF];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x02]);
    }

    #[test]
    fn increment_all_ff_is_unbounded() {
        let mut p = vec![0xFF, 0xFF];
        increment_prefix(&mut p);
        assert!(p.is_empty());
        let mut upper = Vec::new();
        let (_, hi) = prefix_range(&[0xFF, 0xFF], &mut upper);
        assert!(matches!(hi, Bound::Unbounded));
    }
}
