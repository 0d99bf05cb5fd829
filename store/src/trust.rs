//! Trust and ban set storage traits.

use crate::StoreError;
use jigdex_types::Txid;

/// Trait for the persistent trust set.
///
/// Rows carry an explicit value byte rather than bare membership so that the
/// default seed can be applied insert-or-ignore: a user's explicit untrust of
/// a seeded txid survives restarts.
pub trait TrustStore {
    /// Set the trust value for a txid, creating the row if needed.
    fn set_trusted(&self, txid: &Txid, trusted: bool) -> Result<(), StoreError>;

    /// Insert `txid` as trusted only if no row exists yet.
    fn seed_trusted(&self, txid: &Txid) -> Result<(), StoreError>;

    fn is_trusted(&self, txid: &Txid) -> Result<bool, StoreError>;

    /// All txids with a positive trust value.
    fn trusted_txids(&self) -> Result<Vec<Txid>, StoreError>;
}

/// Trait for the persistent ban set. Ban dominates trust.
pub trait BanStore {
    fn set_banned(&self, txid: &Txid, banned: bool) -> Result<(), StoreError>;

    fn is_banned(&self, txid: &Txid) -> Result<bool, StoreError>;

    fn banned_txids(&self) -> Result<Vec<Txid>, StoreError>;
}
