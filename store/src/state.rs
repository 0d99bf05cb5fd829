//! Jig and berry state storage traits.

use crate::StoreError;
use jigdex_types::Txid;
use serde::{Deserialize, Serialize};

/// One row of the jig table: serialized state plus the annotations the
/// unspent index filters on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JigRecord {
    pub location: String,
    /// Serialized state object (JSON text; opaque to the indexer).
    pub state: String,
    pub class: Option<String>,
    pub lock: Option<String>,
    pub scripthash: Option<String>,
}

/// One row of the berry table — same shape as a jig without annotations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BerryRecord {
    pub location: String,
    pub state: String,
}

/// Trait for jig state storage.
pub trait JigStore {
    fn put_jig(&self, record: &JigRecord) -> Result<(), StoreError>;

    fn get_jig(&self, location: &str) -> Result<JigRecord, StoreError>;

    /// Delete every jig whose location starts with the txid's hex prefix
    /// (all state produced by that transaction).
    fn delete_jigs_of(&self, txid: &Txid) -> Result<(), StoreError>;

    fn jig_count(&self) -> Result<u64, StoreError>;
}

/// Trait for berry state storage.
pub trait BerryStore {
    fn put_berry(&self, record: &BerryRecord) -> Result<(), StoreError>;

    fn get_berry(&self, location: &str) -> Result<BerryRecord, StoreError>;

    /// Delete every berry whose location starts with the txid's hex prefix.
    fn delete_berries_of(&self, txid: &Txid) -> Result<(), StoreError>;

    fn berry_count(&self) -> Result<u64, StoreError>;
}
