//! Spend/unspent storage trait.

use crate::StoreError;
use jigdex_types::Txid;

/// Trait for the spends table and the unspent index built on it.
///
/// Each row maps an output location to the txid that spent it; a row with no
/// spender marks a known-unspent output. The unspent queries join against the
/// jig table on location, so only outputs with jig metadata are returned.
pub trait SpendStore {
    /// Record that `location` was consumed by `spend_txid`.
    fn set_spend(&self, location: &str, spend_txid: &Txid) -> Result<(), StoreError>;

    /// Record `location` as a known, currently-unspent output.
    fn set_unspent(&self, location: &str) -> Result<(), StoreError>;

    /// The txid that spent `location`, or `None` if unspent or unknown.
    fn get_spend(&self, location: &str) -> Result<Option<Txid>, StoreError>;

    /// Delete the spend rows for every output location of `txid`.
    fn delete_spends_of(&self, txid: &Txid) -> Result<(), StoreError>;

    /// Reset to unspent every location whose recorded spender is `txid`
    /// (spend attribution cleanup when `txid` is deleted).
    fn clear_spends_by(&self, txid: &Txid) -> Result<(), StoreError>;

    /// All unspent locations that have jig metadata.
    fn all_unspent(&self) -> Result<Vec<String>, StoreError>;

    /// Unspent locations with jig metadata matching every supplied filter.
    /// Passing all `None` is equivalent to [`SpendStore::all_unspent`].
    fn unspent_where(
        &self,
        class: Option<&str>,
        lock: Option<&str>,
        scripthash: Option<&str>,
    ) -> Result<Vec<String>, StoreError>;

    /// Number of unspent locations with jig metadata.
    fn num_unspent(&self) -> Result<u64, StoreError>;
}
