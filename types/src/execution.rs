//! The result bundle handed back by the external executor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Location, TypeError};

/// Which state table a cache entry lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateKind {
    Jig,
    Berry,
}

/// Everything a successful replay produces: new object states plus the
/// class/lock/scripthash annotations used by the unspent index.
///
/// `cache` keys are URIs: `jig://<location>` and `berry://<location>`.
/// Entries with any other scheme belong to the executor's own bookkeeping
/// and are ignored by the indexer. The annotation maps are keyed by bare
/// location strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub cache: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub classes: HashMap<String, String>,
    #[serde(default)]
    pub locks: HashMap<String, String>,
    #[serde(default)]
    pub scripthashes: HashMap<String, String>,
}

impl ExecutionResult {
    /// Parse the cache into `(kind, location, state)` entries, skipping
    /// foreign URI schemes. A malformed location under a known scheme is an
    /// executor bug and is surfaced as an error.
    pub fn state_entries(
        &self,
    ) -> Result<Vec<(StateKind, Location, &serde_json::Value)>, TypeError> {
        let mut entries = Vec::new();
        for (key, state) in &self.cache {
            let (kind, loc_str) = if let Some(rest) = key.strip_prefix("jig://") {
                (StateKind::Jig, rest)
            } else if let Some(rest) = key.strip_prefix("berry://") {
                (StateKind::Berry, rest)
            } else {
                continue;
            };
            entries.push((kind, loc_str.parse::<Location>()?, state));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Txid;
    use serde_json::json;

    #[test]
    fn parses_jig_and_berry_entries() {
        let loc = Location::output(Txid::new([7; 32]), 1);
        let mut result = ExecutionResult::default();
        result.cache.insert(format!("jig://{loc}"), json!({"n": 1}));
        result.cache.insert(format!("berry://{loc}"), json!("leaf"));
        result.cache.insert("tx://ignored".into(), json!(null));

        let mut entries = result.state_entries().unwrap();
        entries.sort_by_key(|(kind, ..)| *kind == StateKind::Berry);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, StateKind::Jig);
        assert_eq!(entries[0].1, loc);
        assert_eq!(entries[1].0, StateKind::Berry);
    }

    #[test]
    fn malformed_location_is_an_error() {
        let mut result = ExecutionResult::default();
        result.cache.insert("jig://not-a-location".into(), serde_json::json!(0));
        assert!(result.state_entries().is_err());
    }
}
