//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{CompactionOption, Database, Env, EnvOpenOptions};

use crate::dep::LmdbDepStore;
use crate::meta::LmdbMetaStore;
use crate::spend::LmdbSpendStore;
use crate::state::{LmdbBerryStore, LmdbJigStore};
use crate::trust::{LmdbBanStore, LmdbTrustStore};
use crate::tx::LmdbTxStore;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Number of named databases the environment opens.
const MAX_DBS: u32 = 10;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,

    // Transaction table
    pub(crate) tx_db: Database<Bytes, Bytes>,

    // Dependency edges, indexed from both endpoints.
    /// Key `up(32) ++ down(32)` — downstream scans.
    pub(crate) deps_up_db: Database<Bytes, Bytes>,
    /// Key `down(32) ++ up(32)` — upstream scans.
    pub(crate) deps_down_db: Database<Bytes, Bytes>,

    // State tables, keyed by location string bytes.
    pub(crate) jig_db: Database<Bytes, Bytes>,
    pub(crate) berry_db: Database<Bytes, Bytes>,

    // Spend table, keyed by location string bytes; empty value = unspent.
    pub(crate) spends_db: Database<Bytes, Bytes>,

    // Trust / ban sets
    pub(crate) trust_db: Database<Bytes, Bytes>,
    pub(crate) ban_db: Database<Bytes, Bytes>,

    // Meta store (schema version, chain tip)
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("failed to create directory: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(MAX_DBS)
                .map_size(map_size)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;

        let tx_db = env.create_database(&mut wtxn, Some("tx"))?;
        let deps_up_db = env.create_database(&mut wtxn, Some("deps_up"))?;
        let deps_down_db = env.create_database(&mut wtxn, Some("deps_down"))?;
        let jig_db = env.create_database(&mut wtxn, Some("jig"))?;
        let berry_db = env.create_database(&mut wtxn, Some("berry"))?;
        let spends_db = env.create_database(&mut wtxn, Some("spends"))?;
        let trust_db = env.create_database(&mut wtxn, Some("trust"))?;
        let ban_db = env.create_database(&mut wtxn, Some("ban"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;

        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            tx_db,
            deps_up_db,
            deps_down_db,
            jig_db,
            berry_db,
            spends_db,
            trust_db,
            ban_db,
            meta_db,
        })
    }

    /// Get a shared reference to the underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Begin a write batch for grouping the mutations of one ingestion
    /// operation into a single LMDB write transaction.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, jigdex_store::StoreError> {
        WriteBatch::new(self)
    }

    /// Create a transaction store backed by this environment.
    pub fn tx_store(&self) -> LmdbTxStore {
        LmdbTxStore {
            env: Arc::clone(&self.env),
            tx_db: self.tx_db,
        }
    }

    /// Create a dependency edge store backed by this environment.
    pub fn dep_store(&self) -> LmdbDepStore {
        LmdbDepStore {
            env: Arc::clone(&self.env),
            deps_up_db: self.deps_up_db,
            deps_down_db: self.deps_down_db,
        }
    }

    /// Create a jig state store backed by this environment.
    pub fn jig_store(&self) -> LmdbJigStore {
        LmdbJigStore {
            env: Arc::clone(&self.env),
            jig_db: self.jig_db,
        }
    }

    /// Create a berry state store backed by this environment.
    pub fn berry_store(&self) -> LmdbBerryStore {
        LmdbBerryStore {
            env: Arc::clone(&self.env),
            berry_db: self.berry_db,
        }
    }

    /// Create a spend store backed by this environment.
    pub fn spend_store(&self) -> LmdbSpendStore {
        LmdbSpendStore {
            env: Arc::clone(&self.env),
            spends_db: self.spends_db,
            jig_db: self.jig_db,
        }
    }

    /// Create a trust store backed by this environment.
    pub fn trust_store(&self) -> LmdbTrustStore {
        LmdbTrustStore {
            env: Arc::clone(&self.env),
            trust_db: self.trust_db,
        }
    }

    /// Create a ban store backed by this environment.
    pub fn ban_store(&self) -> LmdbBanStore {
        LmdbBanStore {
            env: Arc::clone(&self.env),
            ban_db: self.ban_db,
        }
    }

    /// Create a meta store backed by this environment.
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }

    /// Write a compacted copy of the environment to `path`.
    ///
    /// LMDB never reclaims freed pages in place, so the post-migration
    /// compaction step is a copy: the operator (or the migration driver)
    /// swaps the compacted file in before the next open.
    pub fn compact_to(&self, path: &Path) -> Result<(), LmdbError> {
        self.env.copy_to_file(path, CompactionOption::Enabled)?;
        Ok(())
    }

    /// Force an `fsync` of the LMDB memory-mapped file to disk.
    ///
    /// LMDB ensures durability on every write-transaction commit. This
    /// method is an extra safety measure to call during graceful shutdown,
    /// ensuring the OS has flushed all dirty pages before the process exits.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        let wtxn = self.env.write_txn()?;
        wtxn.commit()?;
        Ok(())
    }
}
