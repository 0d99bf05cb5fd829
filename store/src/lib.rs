//! Abstract storage traits for the jigdex indexer.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits; atomic
//! multi-table mutation goes through the backend's write-batch primitive.

pub mod dep;
pub mod error;
pub mod meta;
pub mod spend;
pub mod state;
pub mod trust;
pub mod tx;

pub use dep::DepStore;
pub use error::StoreError;
pub use meta::MetaStore;
pub use spend::SpendStore;
pub use state::{BerryRecord, BerryStore, JigRecord, JigStore};
pub use trust::{BanStore, TrustStore};
pub use tx::TxStore;

/// Opaque transaction handle for atomic multi-store operations.
/// Implementations can downcast to their specific transaction type.
pub trait ReadTxn {}
/// Writable transaction handle (extends ReadTxn).
pub trait WriteTxn: ReadTxn {}
