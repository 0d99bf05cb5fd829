//! Chain-tip tracking.

use jigdex_store::{MetaStore, StoreError};
use jigdex_types::BlockHash;

/// Cached copy of the persisted `(height, hash)` tip.
pub struct TipTracker {
    current: Option<(u64, BlockHash)>,
}

impl TipTracker {
    /// Load the tip from the meta store on open.
    pub fn load(meta: &impl MetaStore) -> Result<Self, StoreError> {
        Ok(Self {
            current: meta.get_tip()?,
        })
    }

    pub fn get(&self) -> Option<(u64, BlockHash)> {
        self.current
    }

    pub fn height(&self) -> Option<u64> {
        self.current.map(|(h, _)| h)
    }

    pub fn hash(&self) -> Option<BlockHash> {
        self.current.map(|(_, hh)| hh)
    }

    /// Update the cached tip after the store write has committed.
    pub fn set(&mut self, height: u64, hash: BlockHash) {
        self.current = Some((height, hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMeta(Option<(u64, BlockHash)>);

    impl MetaStore for FakeMeta {
        fn put_meta(&self, _: &str, _: &[u8]) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }
        fn delete_meta(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_schema_version(&self) -> Result<u32, StoreError> {
            Ok(0)
        }
        fn set_schema_version(&self, _: u32) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_tip(&self) -> Result<Option<(u64, BlockHash)>, StoreError> {
            Ok(self.0)
        }
        fn set_tip(&self, _: u64, _: &BlockHash) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn loads_absent_tip() {
        let tracker = TipTracker::load(&FakeMeta(None)).unwrap();
        assert_eq!(tracker.get(), None);
        assert_eq!(tracker.height(), None);
    }

    #[test]
    fn set_updates_cache() {
        let mut tracker = TipTracker::load(&FakeMeta(None)).unwrap();
        let hash = BlockHash::new([1; 32]);
        tracker.set(100, hash);
        assert_eq!(tracker.get(), Some((100, hash)));
        assert_eq!(tracker.hash(), Some(hash));
    }
}
