//! LMDB implementation of SpendStore.
//!
//! Row values are either empty (known, unspent) or the 32-byte spender txid.
//! The unspent queries are the inner join of unspent rows against the jig
//! table on location, so only outputs with jig metadata are reported.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use jigdex_store::spend::SpendStore;
use jigdex_store::state::JigRecord;
use jigdex_store::StoreError;
use jigdex_types::Txid;

use crate::state::delete_prefix;
use crate::LmdbError;

pub struct LmdbSpendStore {
    pub(crate) env: Arc<Env>,
    pub(crate) spends_db: Database<Bytes, Bytes>,
    pub(crate) jig_db: Database<Bytes, Bytes>,
}

fn decode_spender(val: &[u8]) -> Result<Option<Txid>, LmdbError> {
    if val.is_empty() {
        return Ok(None);
    }
    let arr: [u8; 32] = val
        .try_into()
        .map_err(|_| LmdbError::Serialization("spend value is not 32 bytes".to_string()))?;
    Ok(Some(Txid::new(arr)))
}

impl LmdbSpendStore {
    /// Iterate unspent locations, yielding those whose jig row passes the
    /// filter. `filter = None` means "any jig row".
    fn unspent_join(
        &self,
        filter: Option<(Option<&str>, Option<&str>, Option<&str>)>,
    ) -> Result<Vec<String>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.spends_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut locations = Vec::new();
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            if !val.is_empty() {
                continue;
            }
            let Some(jig_bytes) = self.jig_db.get(&rtxn, key).map_err(LmdbError::from)? else {
                continue;
            };
            if let Some((class, lock, scripthash)) = filter {
                let jig: JigRecord = bincode::deserialize(jig_bytes).map_err(LmdbError::from)?;
                if class.is_some_and(|c| jig.class.as_deref() != Some(c))
                    || lock.is_some_and(|l| jig.lock.as_deref() != Some(l))
                    || scripthash.is_some_and(|s| jig.scripthash.as_deref() != Some(s))
                {
                    continue;
                }
            }
            let location = String::from_utf8(key.to_vec())
                .map_err(|_| LmdbError::Serialization("non-utf8 location key".to_string()))?;
            locations.push(location);
        }
        Ok(locations)
    }
}

impl SpendStore for LmdbSpendStore {
    fn set_spend(&self, location: &str, spend_txid: &Txid) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.spends_db
            .put(&mut wtxn, location.as_bytes(), spend_txid.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn set_unspent(&self, location: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.spends_db
            .put(&mut wtxn, location.as_bytes(), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_spend(&self, location: &str) -> Result<Option<Txid>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .spends_db
            .get(&rtxn, location.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(val) => Ok(decode_spender(val)?),
            None => Ok(None),
        }
    }

    fn delete_spends_of(&self, txid: &Txid) -> Result<(), StoreError> {
        delete_prefix(&self.env, &self.spends_db, txid)
    }

    fn clear_spends_by(&self, txid: &Txid) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let keys: Vec<Vec<u8>> = {
            let iter = self.spends_db.iter(&wtxn).map_err(LmdbError::from)?;
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
            self.spends_db
                .put(&mut wtxn, key, &[])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn all_unspent(&self) -> Result<Vec<String>, StoreError> {
        self.unspent_join(None)
    }

    fn unspent_where(
        &self,
        class: Option<&str>,
        lock: Option<&str>,
        scripthash: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.unspent_join(Some((class, lock, scripthash)))
    }

    fn num_unspent(&self) -> Result<u64, StoreError> {
        Ok(self.unspent_join(None)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use jigdex_store::state::JigStore;
    use jigdex_types::Location;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    fn put_jig(env: &LmdbEnvironment, location: &str, class: Option<&str>, lock: Option<&str>) {
        env.jig_store()
            .put_jig(&JigRecord {
                location: location.to_string(),
                state: "{}".to_string(),
                class: class.map(str::to_string),
                lock: lock.map(str::to_string),
                scripthash: None,
            })
            .unwrap();
    }

    #[test]
    fn spend_and_unspend_roundtrip() {
        let (_dir, env) = temp_env();
        let spends = env.spend_store();
        let loc = Location::output(Txid::new([1; 32]), 0).to_string();
        let spender = Txid::new([2; 32]);

        spends.set_unspent(&loc).unwrap();
        assert_eq!(spends.get_spend(&loc).unwrap(), None);

        spends.set_spend(&loc, &spender).unwrap();
        assert_eq!(spends.get_spend(&loc).unwrap(), Some(spender));
    }

    #[test]
    fn unknown_location_reads_as_unspent() {
        let (_dir, env) = temp_env();
        assert_eq!(env.spend_store().get_spend("nowhere_o0").unwrap(), None);
    }

    #[test]
    fn unspent_requires_jig_metadata() {
        let (_dir, env) = temp_env();
        let spends = env.spend_store();
        let with_jig = Location::output(Txid::new([1; 32]), 0).to_string();
        let without_jig = Location::output(Txid::new([2; 32]), 0).to_string();

        spends.set_unspent(&with_jig).unwrap();
        spends.set_unspent(&without_jig).unwrap();
        put_jig(&env, &with_jig, None, None);

        assert_eq!(spends.all_unspent().unwrap(), vec![with_jig]);
        assert_eq!(spends.num_unspent().unwrap(), 1);
    }

    #[test]
    fn filtered_unspent_queries() {
        let (_dir, env) = temp_env();
        let spends = env.spend_store();
        let a = Location::output(Txid::new([1; 32]), 0).to_string();
        let b = Location::output(Txid::new([2; 32]), 0).to_string();

        spends.set_unspent(&a).unwrap();
        spends.set_unspent(&b).unwrap();
        put_jig(&env, &a, Some("classA"), Some("lock1"));
        put_jig(&env, &b, Some("classB"), Some("lock1"));

        assert_eq!(
            spends.unspent_where(Some("classA"), None, None).unwrap(),
            vec![a.clone()]
        );
        let mut by_lock = spends.unspent_where(None, Some("lock1"), None).unwrap();
        by_lock.sort();
        let mut both = vec![a.clone(), b.clone()];
        both.sort();
        assert_eq!(by_lock, both);
        assert!(spends
            .unspent_where(Some("classA"), Some("lockX"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn clear_spends_by_resets_attribution() {
        let (_dir, env) = temp_env();
        let spends = env.spend_store();
        let loc = Location::output(Txid::new([1; 32]), 0).to_string();
        let spender = Txid::new([9; 32]);

        spends.set_spend(&loc, &spender).unwrap();
        spends.clear_spends_by(&spender).unwrap();
        assert_eq!(spends.get_spend(&loc).unwrap(), None);
    }
}
