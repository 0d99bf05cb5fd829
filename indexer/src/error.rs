use jigdex_types::Txid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("store error: {0}")]
    Store(#[from] jigdex_store::StoreError),

    #[error("storage backend error: {0}")]
    Backend(#[from] jigdex_store_lmdb::LmdbError),

    #[error("type error: {0}")]
    Type(#[from] jigdex_types::TypeError),

    #[error("unknown transaction: {0}")]
    UnknownTransaction(Txid),

    #[error("state serialization error: {0}")]
    State(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("chain source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
