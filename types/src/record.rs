//! The persisted transaction record.

use serde::{Deserialize, Serialize};

use crate::{Height, Timestamp, Txid};

/// One row of the transaction table.
///
/// Field invariants (checked by [`TxRecord::invariants_hold`]):
/// `executed ⇒ (indexed ∨ !executable)`, `indexed ⇒ executed`, and
/// `bytes = None ⇒ !executable ∧ !executed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txid: Txid,
    pub height: Height,
    pub time: Timestamp,
    /// Raw transaction bytes; absent until downloaded.
    pub bytes: Option<Vec<u8>>,
    /// Tri-state: `None` until parsed.
    pub has_code: Option<bool>,
    /// True iff the transaction carries indexable program metadata.
    pub executable: bool,
    /// True iff execution has terminated (success or permanent failure).
    pub executed: bool,
    /// True iff execution succeeded and state outputs are recorded.
    pub indexed: bool,
}

impl TxRecord {
    /// A bare record as created by `add_transaction`: nothing downloaded,
    /// nothing parsed.
    pub fn new(txid: Txid, height: Height, time: Timestamp) -> Self {
        Self {
            txid,
            height,
            time,
            bytes: None,
            has_code: None,
            executable: false,
            executed: false,
            indexed: false,
        }
    }

    pub fn downloaded(&self) -> bool {
        self.bytes.is_some()
    }

    /// Membership predicate for the in-memory unexecuted graph:
    /// `(executable ∧ ¬executed) ∨ bytes = None`.
    pub fn is_unexecuted(&self) -> bool {
        (self.executable && !self.executed) || self.bytes.is_none()
    }

    /// Whether the record satisfies the table invariants.
    pub fn invariants_hold(&self) -> bool {
        (!self.executed || self.indexed || !self.executable)
            && (!self.indexed || self.executed)
            && (self.bytes.is_some() || (!self.executable && !self.executed))
    }
}
