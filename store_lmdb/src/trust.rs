//! LMDB implementations of TrustStore and BanStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use jigdex_store::trust::{BanStore, TrustStore};
use jigdex_store::StoreError;
use jigdex_types::Txid;

use crate::LmdbError;

pub struct LmdbTrustStore {
    pub(crate) env: Arc<Env>,
    pub(crate) trust_db: Database<Bytes, Bytes>,
}

pub struct LmdbBanStore {
    pub(crate) env: Arc<Env>,
    pub(crate) ban_db: Database<Bytes, Bytes>,
}

fn key_txid(key: &[u8]) -> Result<Txid, LmdbError> {
    let arr: [u8; 32] = key
        .try_into()
        .map_err(|_| LmdbError::Serialization("txid key is not 32 bytes".to_string()))?;
    Ok(Txid::new(arr))
}

impl TrustStore for LmdbTrustStore {
    fn set_trusted(&self, txid: &Txid, trusted: bool) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.trust_db
            .put(&mut wtxn, txid.as_bytes(), &[trusted as u8])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn seed_trusted(&self, txid: &Txid) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let present = self
            .trust_db
            .get(&wtxn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        if !present {
            self.trust_db
                .put(&mut wtxn, txid.as_bytes(), &[1])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn is_trusted(&self, txid: &Txid) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let trusted = self
            .trust_db
            .get(&rtxn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .is_some_and(|val| matches!(val, [1]));
        Ok(trusted)
    }

    fn trusted_txids(&self) -> Result<Vec<Txid>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.trust_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut txids = Vec::new();
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            if matches!(val, [1]) {
                txids.push(key_txid(key)?);
            }
        }
        Ok(txids)
    }
}

impl BanStore for LmdbBanStore {
    fn set_banned(&self, txid: &Txid, banned: bool) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if banned {
            self.ban_db
                .put(&mut wtxn, txid.as_bytes(), &[])
                .map_err(LmdbError::from)?;
        } else {
            self.ban_db
                .delete(&mut wtxn, txid.as_bytes().as_slice())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn is_banned(&self, txid: &Txid) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let banned = self
            .ban_db
            .get(&rtxn, txid.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(banned)
    }

    fn banned_txids(&self) -> Result<Vec<Txid>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.ban_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut txids = Vec::new();
        for result in iter {
            let (key, _val) = result.map_err(LmdbError::from)?;
            txids.push(key_txid(key)?);
        }
        Ok(txids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    #[test]
    fn trust_set_and_clear() {
        let (_dir, env) = temp_env();
        let trust = env.trust_store();
        let txid = Txid::new([1; 32]);

        assert!(!trust.is_trusted(&txid).unwrap());
        trust.set_trusted(&txid, true).unwrap();
        assert!(trust.is_trusted(&txid).unwrap());
        trust.set_trusted(&txid, false).unwrap();
        assert!(!trust.is_trusted(&txid).unwrap());
    }

    #[test]
    fn seed_does_not_override_user_untrust() {
        let (_dir, env) = temp_env();
        let trust = env.trust_store();
        let txid = Txid::new([2; 32]);

        trust.set_trusted(&txid, false).unwrap();
        trust.seed_trusted(&txid).unwrap();
        assert!(!trust.is_trusted(&txid).unwrap());

        let fresh = Txid::new([3; 32]);
        trust.seed_trusted(&fresh).unwrap();
        assert!(trust.is_trusted(&fresh).unwrap());
    }

    #[test]
    fn ban_roundtrip() {
        let (_dir, env) = temp_env();
        let bans = env.ban_store();
        let txid = Txid::new([4; 32]);

        bans.set_banned(&txid, true).unwrap();
        assert!(bans.is_banned(&txid).unwrap());
        assert_eq!(bans.banned_txids().unwrap(), vec![txid]);
        bans.set_banned(&txid, false).unwrap();
        assert!(!bans.is_banned(&txid).unwrap());
    }
}
