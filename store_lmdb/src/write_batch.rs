//! Write batching — groups every mutation of one ingestion operation into a
//! single LMDB write transaction, amortising the cost of the fsync that each
//! commit performs.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.put_tx(&record)?;
//! batch.add_dep(&dep, &txid)?;
//! batch.set_unspent(&location)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).
//! Nested batches are forbidden; LMDB serialises writers, so opening a
//! second batch while one is live on the same thread would deadlock.

use heed::RwTxn;

use jigdex_store::state::{BerryRecord, JigRecord};
use jigdex_store::StoreError;
use jigdex_types::{BlockHash, TxRecord, Txid};

use crate::dep::{dep_key, scan_peers_in};
use crate::environment::LmdbEnvironment;
use crate::state::delete_prefix_in;
use crate::LmdbError;

/// A write batch over every table of the environment.
pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    // ── Transaction records ─────────────────────────────────────────────

    /// Read a record through the open transaction (sees earlier batch puts).
    pub fn get_tx(&self, txid: &Txid) -> Result<Option<TxRecord>, StoreError> {
        let val = self
            .env
            .tx_db
            .get(&self.txn, txid.as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(
                bincode::deserialize(bytes).map_err(LmdbError::from)?,
            )),
            None => Ok(None),
        }
    }

    pub fn tx_exists(&self, txid: &Txid) -> Result<bool, StoreError> {
        let found = self
            .env
            .tx_db
            .get(&self.txn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }

    pub fn put_tx(&mut self, record: &TxRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .tx_db
            .put(&mut self.txn, record.txid.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn delete_tx(&mut self, txid: &Txid) -> Result<(), StoreError> {
        self.env
            .tx_db
            .delete(&mut self.txn, txid.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Dependency edges ────────────────────────────────────────────────

    /// Insert the edge `(up, down)` into both direction indexes.
    pub fn add_dep(&mut self, up: &Txid, down: &Txid) -> Result<(), StoreError> {
        self.env
            .deps_up_db
            .put(&mut self.txn, &dep_key(up, down), &[])
            .map_err(LmdbError::from)?;
        self.env
            .deps_down_db
            .put(&mut self.txn, &dep_key(down, up), &[])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Upstream endpoints of `down`, read through the open transaction.
    pub fn upstream_of(&self, down: &Txid) -> Result<Vec<Txid>, StoreError> {
        Ok(scan_peers_in(&self.txn, &self.env.deps_down_db, down)?)
    }

    /// Downstream endpoints of `up`, read through the open transaction.
    pub fn downstream_of(&self, up: &Txid) -> Result<Vec<Txid>, StoreError> {
        Ok(scan_peers_in(&self.txn, &self.env.deps_up_db, up)?)
    }

    /// Delete every edge touching `txid`, in either direction.
    pub fn delete_deps_of(&mut self, txid: &Txid) -> Result<(), StoreError> {
        let ups = self.upstream_of(txid)?;
        let downs = self.downstream_of(txid)?;
        for up in &ups {
            self.env
                .deps_up_db
                .delete(&mut self.txn, &dep_key(up, txid))
                .map_err(LmdbError::from)?;
            self.env
                .deps_down_db
                .delete(&mut self.txn, &dep_key(txid, up))
                .map_err(LmdbError::from)?;
        }
        for down in &downs {
            self.env
                .deps_up_db
                .delete(&mut self.txn, &dep_key(txid, down))
                .map_err(LmdbError::from)?;
            self.env
                .deps_down_db
                .delete(&mut self.txn, &dep_key(down, txid))
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    // ── Jig / berry state ───────────────────────────────────────────────

    pub fn put_jig(&mut self, record: &JigRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .jig_db
            .put(&mut self.txn, record.location.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_berry(&mut self, record: &BerryRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.env
            .berry_db
            .put(&mut self.txn, record.location.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Delete every jig and berry produced by `txid` (location prefix scan).
    pub fn delete_states_of(&mut self, txid: &Txid) -> Result<(), StoreError> {
        let prefix = txid.to_hex();
        delete_prefix_in(&mut self.txn, &self.env.jig_db, prefix.as_bytes())?;
        delete_prefix_in(&mut self.txn, &self.env.berry_db, prefix.as_bytes())?;
        Ok(())
    }

    // ── Spends ──────────────────────────────────────────────────────────

    pub fn set_spend(&mut self, location: &str, spend_txid: &Txid) -> Result<(), StoreError> {
        self.env
            .spends_db
            .put(&mut self.txn, location.as_bytes(), spend_txid.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn set_unspent(&mut self, location: &str) -> Result<(), StoreError> {
        self.env
            .spends_db
            .put(&mut self.txn, location.as_bytes(), &[])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Delete the spend rows for every output location of `txid`.
    pub fn delete_spends_of(&mut self, txid: &Txid) -> Result<(), StoreError> {
        delete_prefix_in(&mut self.txn, &self.env.spends_db, txid.to_hex().as_bytes())?;
        Ok(())
    }

    /// Reset to unspent every location whose recorded spender is `txid`.
    pub fn clear_spends_by(&mut self, txid: &Txid) -> Result<(), StoreError> {
        let keys: Vec<Vec<u8>> = {
            let iter = self
                .env
                .spends_db
                .iter(&self.txn)
                .map_err(LmdbError::from)?;
            let mut keys = Vec::new();
            for result in iter {
                let (key, val) = result.map_err(LmdbError::from)?;
                if val == txid.as_bytes() {
                    keys.push(key.to_vec());
                }
            }
            keys
        };
        for key in &keys {
            self.env
                .spends_db
                .put(&mut self.txn, key, &[])
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    // ── Trust / ban ─────────────────────────────────────────────────────

    pub fn set_trusted(&mut self, txid: &Txid, trusted: bool) -> Result<(), StoreError> {
        self.env
            .trust_db
            .put(&mut self.txn, txid.as_bytes(), &[trusted as u8])
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn set_banned(&mut self, txid: &Txid, banned: bool) -> Result<(), StoreError> {
        if banned {
            self.env
                .ban_db
                .put(&mut self.txn, txid.as_bytes(), &[])
                .map_err(LmdbError::from)?;
        } else {
            self.env
                .ban_db
                .delete(&mut self.txn, txid.as_bytes().as_slice())
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    // ── Meta ────────────────────────────────────────────────────────────

    pub fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.env
            .meta_db
            .put(&mut self.txn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn set_tip(&mut self, height: u64, hash: &BlockHash) -> Result<(), StoreError> {
        let mut val = [0u8; 40];
        val[..8].copy_from_slice(&height.to_be_bytes());
        val[8..].copy_from_slice(hash.as_bytes());
        self.env
            .meta_db
            .put(&mut self.txn, b"tip", &val)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Commit / rollback ───────────────────────────────────────────────

    /// Commit all batched operations in a single write transaction.
    ///
    /// This is the only fsync in the entire batch.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
