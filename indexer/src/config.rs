//! Indexer configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::IndexerError;

/// Configuration for the indexer.
///
/// Can be loaded from a TOML file via [`IndexerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes. The map is sparse; a generous ceiling costs
    /// nothing on disk.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Mempool transactions older than this many seconds are evicted.
    #[serde(default = "default_mempool_expiry_secs")]
    pub mempool_expiry_secs: u64,

    /// Additional txids to seed into the trust set, on top of the built-in
    /// defaults. Hex strings.
    #[serde(default)]
    pub trust: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./jigdex_data")
}

fn default_map_size() -> usize {
    8 * 1024 * 1024 * 1024
}

fn default_mempool_expiry_secs() -> u64 {
    24 * 60 * 60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            mempool_expiry_secs: default_mempool_expiry_secs(),
            trust: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, IndexerError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| IndexerError::Config(e.to_string()))
    }

    /// Initialize tracing from the `log_level`/`log_format` fields.
    pub fn init_logging(&self) {
        jigdex_utils::init_tracing(&self.log_level, &self.log_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = IndexerConfig::default();
        assert_eq!(config.mempool_expiry_secs, 86_400);
        assert!(config.trust.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: IndexerConfig =
            toml::from_str("data_dir = \"/tmp/idx\"\n").expect("parse config");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn trust_list_parses() {
        let config: IndexerConfig = toml::from_str(
            "trust = [\"aa\", \"bb\"]\nlog_level = \"debug\"\n",
        )
        .expect("parse config");
        assert_eq!(config.trust, vec!["aa", "bb"]);
        assert_eq!(config.log_level, "debug");
    }
}
