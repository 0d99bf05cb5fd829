//! LMDB implementation of DepStore.
//!
//! Edges are stored twice with 64-byte composite keys so that both endpoints
//! support prefix scans: `deps_up` keyed `up ++ down`, `deps_down` keyed
//! `down ++ up`. Values are empty; the key is the row. Re-inserting an
//! existing edge overwrites it, which gives `UNIQUE(up, down)` semantics.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use jigdex_store::dep::DepStore;
use jigdex_store::StoreError;
use jigdex_types::Txid;

use crate::{prefix_range, LmdbError};

pub struct LmdbDepStore {
    pub(crate) env: Arc<Env>,
    pub(crate) deps_up_db: Database<Bytes, Bytes>,
    pub(crate) deps_down_db: Database<Bytes, Bytes>,
}

/// Build the composite key `first(32) ++ second(32)`.
pub(crate) fn dep_key(first: &Txid, second: &Txid) -> [u8; 64] {
    let mut key = [0u8; 64];
    key[..32].copy_from_slice(first.as_bytes());
    key[32..].copy_from_slice(second.as_bytes());
    key
}

/// Decode the second txid of a 64-byte composite key.
pub(crate) fn second_of(key: &[u8]) -> Result<Txid, LmdbError> {
    let arr: [u8; 32] = key
        .get(32..64)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbError::Serialization("dep key is not 64 bytes".to_string()))?;
    Ok(Txid::new(arr))
}

/// Collect the second components of every composite key starting with
/// `prefix`, inside an open transaction.
pub(crate) fn scan_peers_in(
    txn: &RoTxn<'_>,
    db: &Database<Bytes, Bytes>,
    prefix: &Txid,
) -> Result<Vec<Txid>, LmdbError> {
    let mut upper = Vec::new();
    let bounds = prefix_range(prefix.as_bytes(), &mut upper);
    let iter = db.range(txn, &bounds)?;
    let mut peers = Vec::new();
    for result in iter {
        let (key, _val) = result?;
        peers.push(second_of(key)?);
    }
    Ok(peers)
}

impl LmdbDepStore {
    fn scan_peers(
        &self,
        db: &Database<Bytes, Bytes>,
        prefix: &Txid,
    ) -> Result<Vec<Txid>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(scan_peers_in(&rtxn, db, prefix)?)
    }
}

impl DepStore for LmdbDepStore {
    fn add_dep(&self, up: &Txid, down: &Txid) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.deps_up_db
            .put(&mut wtxn, &dep_key(up, down), &[])
            .map_err(LmdbError::from)?;
        self.deps_down_db
            .put(&mut wtxn, &dep_key(down, up), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn upstream_of(&self, down: &Txid) -> Result<Vec<Txid>, StoreError> {
        self.scan_peers(&self.deps_down_db, down)
    }

    fn downstream_of(&self, up: &Txid) -> Result<Vec<Txid>, StoreError> {
        self.scan_peers(&self.deps_up_db, up)
    }

    fn delete_deps_of(&self, txid: &Txid) -> Result<(), StoreError> {
        let ups = self.upstream_of(txid)?;
        let downs = self.downstream_of(txid)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for up in &ups {
            self.deps_up_db
                .delete(&mut wtxn, &dep_key(up, txid))
                .map_err(LmdbError::from)?;
            self.deps_down_db
                .delete(&mut wtxn, &dep_key(txid, up))
                .map_err(LmdbError::from)?;
        }
        for down in &downs {
            self.deps_up_db
                .delete(&mut wtxn, &dep_key(txid, down))
                .map_err(LmdbError::from)?;
            self.deps_down_db
                .delete(&mut wtxn, &dep_key(down, txid))
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn dep_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.deps_up_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
