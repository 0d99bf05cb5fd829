//! Transaction record storage trait.

use crate::StoreError;
use jigdex_types::{Timestamp, TxRecord, Txid};

/// Trait for the transaction table.
pub trait TxStore {
    /// Store a record, replacing any existing row for the same txid.
    fn put(&self, record: &TxRecord) -> Result<(), StoreError>;

    /// Retrieve a record by txid.
    fn get(&self, txid: &Txid) -> Result<TxRecord, StoreError>;

    /// Check if a record exists.
    fn exists(&self, txid: &Txid) -> Result<bool, StoreError>;

    /// Delete a record.
    fn delete(&self, txid: &Txid) -> Result<(), StoreError>;

    /// Txids whose records satisfy the unexecuted-graph membership
    /// predicate: `(executable ∧ ¬executed) ∨ bytes IS NULL`. Used to
    /// rebuild the in-memory graph on open.
    fn unexecuted_txids(&self) -> Result<Vec<Txid>, StoreError>;

    /// Txids confirmed strictly above the given height (reorg rewind).
    fn transactions_above_height(&self, height: u64) -> Result<Vec<Txid>, StoreError>;

    /// Mempool txids received before the given time (mempool eviction).
    fn mempool_transactions_before_time(&self, time: Timestamp) -> Result<Vec<Txid>, StoreError>;

    /// Total number of records.
    fn count(&self) -> Result<u64, StoreError>;
}
