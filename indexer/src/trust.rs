//! In-memory trust/ban registry, mirrored to the persistent store.
//!
//! Membership queries are O(1); every mutation is written through the same
//! write batch as the rest of its ingestion operation. Ban dominates trust.

use std::collections::HashSet;

use jigdex_types::Txid;

/// Transactions trusted out of the box on first open. Seeded with
/// insert-or-ignore semantics so a user's explicit untrust survives
/// restarts. These are the well-known class definition transactions most
/// deployments depend on.
pub const DEFAULT_TRUST_SEED: &[&str] = &[
    "71fba386341b932380ec5bfedc3a40bce43d4974decdc94c419a94a8ce5dfc23",
    "61e1265acb3d93f1bf24a593d70b2a6b1c650ec1df90ddece8d6954ae3cdd915",
    "49145693676af7567ebe20671c5cb01369ac788c20f3b1c804f624a1eda18f3f",
    "284ce17fd34c0f41835435b03eed149c4e0479361f40132312b4001093bb158f",
    "312985bd24722bc2d9812149e29ccacad0b1b3b74301f318e868df0825c40ce2",
    "05f67252e696160a7c0099ae8d1ec23c39592378773b3a5a32f110fb19ec9fd6",
];

/// In-memory mirror of the trust and ban tables.
pub struct TrustRegistry {
    trusted: HashSet<Txid>,
    banned: HashSet<Txid>,
}

impl TrustRegistry {
    pub fn new(trusted: HashSet<Txid>, banned: HashSet<Txid>) -> Self {
        Self { trusted, banned }
    }

    pub fn empty() -> Self {
        Self {
            trusted: HashSet::new(),
            banned: HashSet::new(),
        }
    }

    pub fn is_trusted(&self, txid: &Txid) -> bool {
        self.trusted.contains(txid)
    }

    pub fn is_banned(&self, txid: &Txid) -> bool {
        self.banned.contains(txid)
    }

    pub fn insert_trusted(&mut self, txid: Txid) {
        self.trusted.insert(txid);
    }

    pub fn remove_trusted(&mut self, txid: &Txid) {
        self.trusted.remove(txid);
    }

    pub fn insert_banned(&mut self, txid: Txid) {
        self.banned.insert(txid);
    }

    pub fn remove_banned(&mut self, txid: &Txid) {
        self.banned.remove(txid);
    }

    pub fn num_trusted(&self) -> usize {
        self.trusted.len()
    }

    pub fn num_banned(&self) -> usize {
        self.banned.len()
    }
}
