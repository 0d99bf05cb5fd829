//! LMDB implementation of TxStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use jigdex_store::tx::TxStore;
use jigdex_store::StoreError;
use jigdex_types::{Timestamp, TxRecord, Txid};

use crate::LmdbError;

pub struct LmdbTxStore {
    pub(crate) env: Arc<Env>,
    pub(crate) tx_db: Database<Bytes, Bytes>,
}

impl LmdbTxStore {
    /// Scan the whole table, keeping txids whose decoded record satisfies
    /// the predicate. The table is the primary index; the height/time
    /// queries run rarely (reorg, eviction) and on open, so a scan beats
    /// maintaining three secondary indexes.
    fn scan_filter(
        &self,
        predicate: impl Fn(&TxRecord) -> bool,
    ) -> Result<Vec<Txid>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.tx_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut txids = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let record: TxRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if predicate(&record) {
                txids.push(record.txid);
            }
        }
        Ok(txids)
    }
}

impl TxStore for LmdbTxStore {
    fn put(&self, record: &TxRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.tx_db
            .put(&mut wtxn, record.txid.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, txid: &Txid) -> Result<TxRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .tx_db
            .get(&rtxn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("transaction {txid}")))?;
        let record: TxRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn exists(&self, txid: &Txid) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .tx_db
            .get(&rtxn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }

    fn delete(&self, txid: &Txid) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.tx_db
            .delete(&mut wtxn, txid.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn unexecuted_txids(&self) -> Result<Vec<Txid>, StoreError> {
        self.scan_filter(|record| record.is_unexecuted())
    }

    fn transactions_above_height(&self, height: u64) -> Result<Vec<Txid>, StoreError> {
        self.scan_filter(|record| record.height.is_above(height))
    }

    fn mempool_transactions_before_time(&self, time: Timestamp) -> Result<Vec<Txid>, StoreError> {
        self.scan_filter(|record| record.height.is_mempool() && record.time < time)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.tx_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
