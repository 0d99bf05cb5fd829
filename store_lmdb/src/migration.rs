//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta store and
//! runs sequential migration functions to bring an older database up to date.
//! Each step runs inside a single write transaction; a crash mid-migration
//! rolls back to the previous version.

use serde::{Deserialize, Serialize};

use jigdex_store::MetaStore;
use jigdex_types::{Height, Timestamp, TxRecord, Txid};

use crate::{LmdbEnvironment, LmdbError};

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// The v1 transaction row: raw bytes were stored hex-encoded.
#[derive(Serialize, Deserialize)]
pub(crate) struct TxRecordV1 {
    pub txid: Txid,
    pub height: Height,
    pub time: Timestamp,
    pub bytes: Option<String>,
    pub has_code: Option<bool>,
    pub executable: bool,
    pub executed: bool,
    pub indexed: bool,
}

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - If the stored version matches `CURRENT_SCHEMA_VERSION`, this is a no-op.
    /// - If the stored version is *higher* than what this code supports,
    ///   the database was written by a newer build and we refuse to open it.
    ///
    /// After a real migration a compacted copy of the environment is written
    /// next to the data file; LMDB never shrinks in place, so the operator
    /// swaps the copy in to reclaim the space freed by the rewrite.
    pub fn run(env: &LmdbEnvironment) -> Result<(), LmdbError> {
        let meta = env.meta_store();
        let current = meta
            .get_schema_version()
            .map_err(|e| LmdbError::Heed(e.to_string()))?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::info!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Heed(format!(
                "database schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(env, version, version + 1)?;
        }

        meta.set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Heed(e.to_string()))?;

        if current > 0 {
            let compact_path = env.env().path().join("data.compacted.mdb");
            env.compact_to(&compact_path)?;
            tracing::info!(path = %compact_path.display(), "wrote compacted copy");
        }

        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn run_migration(env: &LmdbEnvironment, from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        (0, 1) => {
            // Initial schema — nothing to migrate from a blank slate.
            Ok(())
        }
        (1, 2) => migrate_hex_bytes_to_binary(env),
        _ => Err(LmdbError::Heed(format!(
            "unknown migration: {} -> {}",
            from, to
        ))),
    }
}

/// Schema v2: the transaction row stores raw bytes in a binary column
/// instead of hex text. Re-encodes every row in one write transaction.
fn migrate_hex_bytes_to_binary(env: &LmdbEnvironment) -> Result<(), LmdbError> {
    let mut wtxn = env.env().write_txn()?;

    let rows: Vec<(Vec<u8>, TxRecordV1)> = {
        let iter = env.tx_db.iter(&wtxn)?;
        let mut rows = Vec::new();
        for result in iter {
            let (key, val) = result?;
            let record: TxRecordV1 = bincode::deserialize(val)?;
            rows.push((key.to_vec(), record));
        }
        rows
    };

    let total = rows.len();
    for (key, v1) in rows {
        let bytes = match v1.bytes {
            Some(hex_text) => Some(hex::decode(&hex_text).map_err(|e| {
                LmdbError::Serialization(format!("v1 record {} has bad hex bytes: {e}", v1.txid))
            })?),
            None => None,
        };
        let record = TxRecord {
            txid: v1.txid,
            height: v1.height,
            time: v1.time,
            bytes,
            has_code: v1.has_code,
            executable: v1.executable,
            executed: v1.executed,
            indexed: v1.indexed,
        };
        let encoded = bincode::serialize(&record)?;
        env.tx_db.put(&mut wtxn, &key, &encoded)?;
    }

    wtxn.commit()?;
    tracing::info!(rows = total, "re-encoded transaction bytes as binary");
    Ok(())
}
