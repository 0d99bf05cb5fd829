//! Dependency edge storage trait.

use crate::StoreError;
use jigdex_types::Txid;

/// Trait for the persistent dependency edge table.
///
/// An edge `(up, down)` asserts that executing `down` requires `up` to be
/// indexed first. The table has `UNIQUE(up, down)` semantics: inserting an
/// existing edge is a no-op.
pub trait DepStore {
    /// Insert an edge.
    fn add_dep(&self, up: &Txid, down: &Txid) -> Result<(), StoreError>;

    /// All upstream endpoints of edges whose downstream endpoint is `down`.
    fn upstream_of(&self, down: &Txid) -> Result<Vec<Txid>, StoreError>;

    /// All downstream endpoints of edges whose upstream endpoint is `up`.
    fn downstream_of(&self, up: &Txid) -> Result<Vec<Txid>, StoreError>;

    /// Delete every edge touching `txid`, in either direction.
    fn delete_deps_of(&self, txid: &Txid) -> Result<(), StoreError>;

    /// Total number of edges.
    fn dep_count(&self) -> Result<u64, StoreError>;
}
