//! Shared error type for the core types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid txid: {0}")]
    InvalidTxid(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid height: {0}")]
    InvalidHeight(i64),
}
