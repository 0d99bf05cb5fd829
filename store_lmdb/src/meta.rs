//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use jigdex_store::meta::MetaStore;
use jigdex_store::StoreError;
use jigdex_types::BlockHash;

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const TIP_KEY: &[u8] = b"tip";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key '{}'", key)))?;
        Ok(val.to_vec())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) if bytes.len() == 4 => {
                let arr: [u8; 4] = bytes.try_into().expect("checked length");
                Ok(u32::from_le_bytes(arr))
            }
            Some(_) => Err(LmdbError::Serialization(
                "schema_version has unexpected byte length".to_string(),
            ))?,
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_tip(&self) -> Result<Option<(u64, BlockHash)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, TIP_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) if bytes.len() == 40 => {
                let height = u64::from_be_bytes(bytes[..8].try_into().expect("checked length"));
                let hash: [u8; 32] = bytes[8..].try_into().expect("checked length");
                Ok(Some((height, BlockHash::new(hash))))
            }
            Some(_) => Err(LmdbError::Serialization(
                "tip has unexpected byte length".to_string(),
            ))?,
            None => Ok(None),
        }
    }

    fn set_tip(&self, height: u64, hash: &BlockHash) -> Result<(), StoreError> {
        let mut val = [0u8; 40];
        val[..8].copy_from_slice(&height.to_be_bytes());
        val[8..].copy_from_slice(hash.as_bytes());
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, TIP_KEY, &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
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
    fn schema_version_defaults_to_zero() {
        let (_dir, env) = temp_env();
        let meta = env.meta_store();
        assert_eq!(meta.get_schema_version().unwrap(), 0);
        meta.set_schema_version(2).unwrap();
        assert_eq!(meta.get_schema_version().unwrap(), 2);
    }

    #[test]
    fn tip_roundtrip() {
        let (_dir, env) = temp_env();
        let meta = env.meta_store();
        assert_eq!(meta.get_tip().unwrap(), None);

        let hash = BlockHash::new([7; 32]);
        meta.set_tip(812_000, &hash).unwrap();
        assert_eq!(meta.get_tip().unwrap(), Some((812_000, hash)));
    }
}
