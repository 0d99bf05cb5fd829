//! LMDB implementations of JigStore and BerryStore.
//!
//! Both tables are keyed by location string bytes. Locations begin with the
//! producing transaction's hex txid, so "delete everything this transaction
//! produced" is a prefix range scan.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use jigdex_store::state::{BerryRecord, BerryStore, JigRecord, JigStore};
use jigdex_store::StoreError;
use jigdex_types::Txid;

use crate::{prefix_range, LmdbError};

pub struct LmdbJigStore {
    pub(crate) env: Arc<Env>,
    pub(crate) jig_db: Database<Bytes, Bytes>,
}

pub struct LmdbBerryStore {
    pub(crate) env: Arc<Env>,
    pub(crate) berry_db: Database<Bytes, Bytes>,
}

/// Delete every row whose key starts with `prefix`, inside an open write
/// transaction.
pub(crate) fn delete_prefix_in(
    wtxn: &mut RwTxn<'_>,
    db: &Database<Bytes, Bytes>,
    prefix: &[u8],
) -> Result<(), LmdbError> {
    let mut upper = Vec::new();
    let bounds = prefix_range(prefix, &mut upper);
    let keys: Vec<Vec<u8>> = {
        let iter = db.range(wtxn, &bounds)?;
        let mut keys = Vec::new();
        for result in iter {
            let (key, _val) = result?;
            keys.push(key.to_vec());
        }
        keys
    };
    for key in &keys {
        db.delete(wtxn, key)?;
    }
    Ok(())
}

/// Delete every row whose key starts with the txid's lowercase hex.
pub(crate) fn delete_prefix(
    env: &Env,
    db: &Database<Bytes, Bytes>,
    txid: &Txid,
) -> Result<(), StoreError> {
    let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
    delete_prefix_in(&mut wtxn, db, txid.to_hex().as_bytes())?;
    wtxn.commit().map_err(LmdbError::from)?;
    Ok(())
}

impl JigStore for LmdbJigStore {
    fn put_jig(&self, record: &JigRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.jig_db
            .put(&mut wtxn, record.location.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_jig(&self, location: &str) -> Result<JigRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .jig_db
            .get(&rtxn, location.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("jig {location}")))?;
        let record: JigRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn delete_jigs_of(&self, txid: &Txid) -> Result<(), StoreError> {
        delete_prefix(&self.env, &self.jig_db, txid)
    }

    fn jig_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.jig_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

impl BerryStore for LmdbBerryStore {
    fn put_berry(&self, record: &BerryRecord) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.berry_db
            .put(&mut wtxn, record.location.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_berry(&self, location: &str) -> Result<BerryRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .berry_db
            .get(&rtxn, location.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("berry {location}")))?;
        let record: BerryRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn delete_berries_of(&self, txid: &Txid) -> Result<(), StoreError> {
        delete_prefix(&self.env, &self.berry_db, txid)
    }

    fn berry_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.berry_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use jigdex_types::Location;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    fn jig(location: String) -> JigRecord {
        JigRecord {
            location,
            state: r#"{"kind":"token"}"#.to_string(),
            class: Some("class_loc".to_string()),
            lock: None,
            scripthash: None,
        }
    }

    #[test]
    fn put_get_jig() {
        let (_dir, env) = temp_env();
        let store = env.jig_store();
        let loc = Location::output(Txid::new([9; 32]), 0).to_string();

        store.put_jig(&jig(loc.clone())).unwrap();
        let loaded = store.get_jig(&loc).unwrap();
        assert_eq!(loaded.location, loc);
        assert_eq!(loaded.class.as_deref(), Some("class_loc"));
    }

    #[test]
    fn prefix_delete_only_touches_own_txid() {
        let (_dir, env) = temp_env();
        let store = env.jig_store();
        let mine = Txid::new([0xAA; 32]);
        let other = Txid::new([0xAB; 32]);

        for i in 0..3 {
            store
                .put_jig(&jig(Location::output(mine, i).to_string()))
                .unwrap();
        }
        let other_loc = Location::output(other, 0).to_string();
        store.put_jig(&jig(other_loc.clone())).unwrap();

        store.delete_jigs_of(&mine).unwrap();
        assert_eq!(store.jig_count().unwrap(), 1);
        assert!(store.get_jig(&other_loc).is_ok());
    }

    #[test]
    fn berry_roundtrip_and_prefix_delete() {
        let (_dir, env) = temp_env();
        let store = env.berry_store();
        let txid = Txid::new([3; 32]);
        let loc = Location::derivative(txid, 2).to_string();

        store
            .put_berry(&BerryRecord {
                location: loc.clone(),
                state: "\"leaf\"".to_string(),
            })
            .unwrap();
        assert_eq!(store.get_berry(&loc).unwrap().state, "\"leaf\"");

        store.delete_berries_of(&txid).unwrap();
        assert!(store.get_berry(&loc).is_err());
    }
}
