//! Metadata storage trait.

use crate::StoreError;
use jigdex_types::BlockHash;

/// Trait for storing database metadata: schema version, chain tip, and any
/// other internal bookkeeping that doesn't belong in a domain table.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a metadata entry.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;

    /// Get the current database schema version (0 for a fresh database).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;

    /// The current chain tip, or `None` before the first block.
    fn get_tip(&self) -> Result<Option<(u64, BlockHash)>, StoreError>;

    /// Persist the chain tip.
    fn set_tip(&self, height: u64, hash: &BlockHash) -> Result<(), StoreError>;
}
