//! The ingestion operations over the store, the unexecuted graph, and the
//! trust registry.
//!
//! Every public mutator follows the same protocol: plan against committed
//! state, write everything through one [`WriteBatch`], commit, apply the
//! in-memory graph/registry changes, re-evaluate readiness, and only then
//! emit events. Nothing observable happens before the commit.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use jigdex_store::state::{BerryRecord, JigRecord};
use jigdex_store::{
    BanStore, BerryStore, DepStore, JigStore, SpendStore, TrustStore, TxStore,
};
use jigdex_store_lmdb::{LmdbEnvironment, Migrator, WriteBatch};
use jigdex_types::execution::StateKind;
use jigdex_types::{metadata, ExecutionResult, Height, Location, Timestamp, TxRecord, Txid};
use jigdex_utils::StatsCounter;

use crate::config::IndexerConfig;
use crate::events::{EventBus, IndexerEvent};
use crate::graph::{RemovedNode, UnexecutedGraph};
use crate::tip::TipTracker;
use crate::trust::{TrustRegistry, DEFAULT_TRUST_SEED};
use crate::IndexerError;

/// Counter names registered with the stats collector.
const STAT_NAMES: &[&str] = &[
    "transactions_added",
    "transactions_executed",
    "executions_failed",
    "transactions_deleted",
    "transactions_unindexed",
    "trust_changes",
    "ready_fires",
];

/// Everything needed to resurrect one node during `unindex`.
struct ResurrectPlan {
    txid: Txid,
    has_code: Option<bool>,
    ups: Vec<Txid>,
    downs: Vec<Txid>,
}

/// The transaction dependency engine.
///
/// Single-threaded cooperative: all mutators run on one logical owner of the
/// graph. The store serialises its own writes; exposing the graph to other
/// threads requires snapshots or message passing.
pub struct Indexer {
    env: LmdbEnvironment,
    graph: UnexecutedGraph,
    trust: TrustRegistry,
    tip: TipTracker,
    events: EventBus,
    stats: StatsCounter,
}

impl Indexer {
    /// Open (or create) the store at `config.data_dir`, run migrations, seed
    /// the default trust list, and rebuild the unexecuted graph.
    pub fn open(config: &IndexerConfig) -> Result<Self, IndexerError> {
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        Migrator::run(&env)?;

        let trust_store = env.trust_store();
        for hex in DEFAULT_TRUST_SEED {
            let txid = Txid::from_hex(hex)?;
            trust_store.seed_trusted(&txid)?;
        }
        for hex in &config.trust {
            let txid = Txid::from_hex(hex)?;
            trust_store.seed_trusted(&txid)?;
        }

        let trusted: HashSet<Txid> = trust_store.trusted_txids()?.into_iter().collect();
        let banned: HashSet<Txid> = env.ban_store().banned_txids()?.into_iter().collect();
        let trust = TrustRegistry::new(trusted, banned);

        let tip = TipTracker::load(&env.meta_store())?;

        let mut indexer = Self {
            env,
            graph: UnexecutedGraph::new(),
            trust,
            tip,
            events: EventBus::new(),
            stats: StatsCounter::new(STAT_NAMES),
        };
        indexer.rebuild_graph()?;
        tracing::info!(
            unexecuted = indexer.graph.len(),
            queued = indexer.graph.num_queued(),
            "indexer opened"
        );
        Ok(indexer)
    }

    /// Open with defaults at an explicit path (tests, tools).
    pub fn open_at(path: &Path) -> Result<Self, IndexerError> {
        let config = IndexerConfig {
            data_dir: path.to_path_buf(),
            map_size: 64 * 1024 * 1024,
            ..IndexerConfig::default()
        };
        Self::open(&config)
    }

    /// Rebuild the in-memory graph from the persistent tables: every record
    /// satisfying the unexecuted predicate, plus the edges whose endpoints
    /// are both in that set.
    fn rebuild_graph(&mut self) -> Result<(), IndexerError> {
        let tx_store = self.env.tx_store();
        let dep_store = self.env.dep_store();
        let txids = tx_store.unexecuted_txids()?;
        for txid in &txids {
            let record = tx_store.get(txid)?;
            self.graph
                .insert(*txid, record.downloaded(), record.has_code);
        }
        for txid in &txids {
            for up in dep_store.upstream_of(txid)? {
                self.graph.add_edge(&up, txid);
            }
        }
        let mut ready = Vec::new();
        for txid in txids {
            self.graph.check_executability(&txid, &self.trust, &mut ready);
        }
        // Nobody is subscribed during open; the driver queries ready_roots()
        // after wiring its executor.
        Ok(())
    }

    // ── Observers ───────────────────────────────────────────────────────

    /// Register an event listener. Events fire after store commits, in
    /// commit order.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&IndexerEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    fn emit_all(&self, events: Vec<IndexerEvent>) {
        for event in &events {
            if matches!(event, IndexerEvent::ReadyToExecute { .. }) {
                self.stats.increment("ready_fires");
            }
            self.events.emit(event);
        }
    }

    fn push_ready(events: &mut Vec<IndexerEvent>, ready: Vec<Txid>) {
        for txid in ready {
            events.push(IndexerEvent::ReadyToExecute { txid });
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn has_transaction(&self, txid: &Txid) -> Result<bool, IndexerError> {
        Ok(self.env.tx_store().exists(txid)?)
    }

    pub fn get_transaction(&self, txid: &Txid) -> Result<TxRecord, IndexerError> {
        Ok(self.env.tx_store().get(txid)?)
    }

    /// Raw bytes for the executor; `None` until downloaded.
    pub fn get_transaction_bytes(&self, txid: &Txid) -> Result<Option<Vec<u8>>, IndexerError> {
        if self.env.tx_store().exists(txid)? {
            Ok(self.env.tx_store().get(txid)?.bytes)
        } else {
            Ok(None)
        }
    }

    pub fn num_transactions(&self) -> Result<u64, IndexerError> {
        Ok(self.env.tx_store().count()?)
    }

    pub fn num_unexecuted(&self) -> usize {
        self.graph.len()
    }

    pub fn num_queued_for_execution(&self) -> usize {
        self.graph.num_queued()
    }

    /// Queued transactions with no unexecuted predecessors. The driver uses
    /// this after open to re-announce work whose original fires were lost.
    pub fn ready_roots(&self) -> Vec<Txid> {
        self.graph.ready_roots()
    }

    pub fn is_trusted(&self, txid: &Txid) -> bool {
        self.trust.is_trusted(txid)
    }

    pub fn is_banned(&self, txid: &Txid) -> bool {
        self.trust.is_banned(txid)
    }

    /// All unexecuted code-bearing transactions that are not trusted.
    pub fn all_untrusted(&self) -> Vec<Txid> {
        self.graph
            .txids()
            .copied()
            .filter(|txid| {
                self.graph
                    .get(txid)
                    .map_or(false, |n| n.has_code == Some(true))
                    && !self.trust.is_trusted(txid)
            })
            .collect()
    }

    /// Breadth-first upstream traversal collecting the transitive set of
    /// untrusted code-bearing ancestors, including `txid` itself when it
    /// qualifies.
    pub fn untrusted_ancestors(&self, txid: &Txid) -> Vec<Txid> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([*txid]);
        while let Some(t) = queue.pop_front() {
            if !visited.insert(t) {
                continue;
            }
            let Some(node) = self.graph.get(&t) else {
                continue;
            };
            if node.has_code == Some(true) && !self.trust.is_trusted(&t) {
                result.push(t);
            }
            for up in &node.upstream {
                queue.push_back(*up);
            }
        }
        result
    }

    pub fn get_jig(&self, location: &str) -> Result<JigRecord, IndexerError> {
        Ok(self.env.jig_store().get_jig(location)?)
    }

    pub fn get_berry(&self, location: &str) -> Result<BerryRecord, IndexerError> {
        Ok(self.env.berry_store().get_berry(location)?)
    }

    pub fn get_spend(&self, location: &str) -> Result<Option<Txid>, IndexerError> {
        Ok(self.env.spend_store().get_spend(location)?)
    }

    pub fn all_unspent(&self) -> Result<Vec<String>, IndexerError> {
        Ok(self.env.spend_store().all_unspent()?)
    }

    pub fn unspent_where(
        &self,
        class: Option<&str>,
        lock: Option<&str>,
        scripthash: Option<&str>,
    ) -> Result<Vec<String>, IndexerError> {
        Ok(self
            .env
            .spend_store()
            .unspent_where(class, lock, scripthash)?)
    }

    pub fn num_unspent(&self) -> Result<u64, IndexerError> {
        Ok(self.env.spend_store().num_unspent()?)
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    // ── Chain tip ───────────────────────────────────────────────────────

    pub fn tip(&self) -> Option<(u64, jigdex_types::BlockHash)> {
        self.tip.get()
    }

    pub fn tip_height(&self) -> Option<u64> {
        self.tip.height()
    }

    pub fn tip_hash(&self) -> Option<jigdex_types::BlockHash> {
        self.tip.hash()
    }

    pub fn set_tip(&mut self, height: u64, hash: jigdex_types::BlockHash) -> Result<(), IndexerError> {
        let mut batch = self.env.write_batch()?;
        batch.set_tip(height, &hash)?;
        batch.commit()?;
        self.tip.set(height, hash);
        Ok(())
    }

    /// Txids confirmed strictly above `height` (the reorg driver's view).
    pub fn transactions_above_height(&self, height: u64) -> Result<Vec<Txid>, IndexerError> {
        Ok(self.env.tx_store().transactions_above_height(height)?)
    }

    /// Mempool txids received before `time` (the eviction driver's view).
    pub fn mempool_transactions_before_time(
        &self,
        time: Timestamp,
    ) -> Result<Vec<Txid>, IndexerError> {
        Ok(self.env.tx_store().mempool_transactions_before_time(time)?)
    }

    /// Delete every transaction confirmed strictly above `height` (reorg
    /// rewind). The caller resets the tip afterwards.
    pub fn rewind_above(&mut self, height: u64) -> Result<usize, IndexerError> {
        let txids = self.env.tx_store().transactions_above_height(height)?;
        let count = txids.len();
        for txid in txids {
            self.delete_transaction(txid)?;
        }
        tracing::info!(height, deleted = count, "rewound above height");
        Ok(count)
    }

    /// Delete mempool transactions received before `time`. Returns how many
    /// were evicted.
    pub fn evict_mempool_before(&mut self, time: Timestamp) -> Result<usize, IndexerError> {
        let txids = self
            .env
            .tx_store()
            .mempool_transactions_before_time(time)?;
        let count = txids.len();
        for txid in txids {
            self.delete_transaction(txid)?;
        }
        Ok(count)
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    /// Insert a bare record for a newly-seen transaction. No-op if already
    /// present.
    pub fn add_transaction(&mut self, txid: Txid, height: Height) -> Result<(), IndexerError> {
        if self.env.tx_store().exists(&txid)? {
            return Ok(());
        }
        let record = TxRecord::new(txid, height, Timestamp::now());
        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        batch.commit()?;

        self.graph.insert(txid, false, None);
        self.stats.increment("transactions_added");
        tracing::debug!(txid = %txid, height = %height, "transaction added");
        self.emit_all(vec![IndexerEvent::Added { txid }]);
        Ok(())
    }

    /// Update the height of an existing record (mempool entry confirming
    /// into a block, or an unknown height resolving).
    pub fn set_transaction_height(
        &mut self,
        txid: &Txid,
        height: Height,
    ) -> Result<(), IndexerError> {
        let mut record = self.require(txid)?;
        if record.height == height {
            return Ok(());
        }
        record.height = height;
        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        batch.commit()?;
        Ok(())
    }

    /// Update the timestamp of an existing record (block time replacing
    /// mempool receipt time).
    pub fn set_transaction_time(
        &mut self,
        txid: &Txid,
        time: Timestamp,
    ) -> Result<(), IndexerError> {
        let mut record = self.require(txid)?;
        record.time = time;
        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        batch.commit()?;
        Ok(())
    }

    /// Store the downloaded bytes of a transaction the parser classified as
    /// carrying no executable metadata. The node leaves the graph — there is
    /// nothing to execute — and every former downstream neighbour is
    /// re-evaluated, since an absent predecessor counts as satisfied.
    pub fn store_parsed_non_executable(
        &mut self,
        txid: Txid,
        bytes: &[u8],
        spends: &[Location],
        outputs: &[Location],
    ) -> Result<(), IndexerError> {
        let mut record = self.require(&txid)?;
        record.bytes = Some(bytes.to_vec());
        record.executable = false;
        record.has_code = Some(false);

        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        Self::record_spends(&mut batch, &txid, spends, outputs)?;
        batch.commit()?;

        self.graph.mark_downloaded(&txid, Some(false));
        let removed = self.graph.remove(&txid);
        let mut ready = Vec::new();
        if let Some(removed) = removed {
            self.notify_downstream_of_removal(&removed, &mut ready);
        }

        let mut events = Vec::new();
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Store the downloaded bytes of an executable transaction together with
    /// its declared dependencies. Each dependency is added (bare) if unseen
    /// and the edge `(up = dep, down = txid)` is persisted; a dependency
    /// that already failed permanently fails this transaction instead.
    pub fn store_parsed_executable(
        &mut self,
        txid: Txid,
        bytes: &[u8],
        has_code: bool,
        deps: &[Txid],
        spends: &[Location],
        outputs: &[Location],
    ) -> Result<(), IndexerError> {
        let mut record = self.require(&txid)?;
        record.bytes = Some(bytes.to_vec());
        record.executable = true;
        record.has_code = Some(has_code);

        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        Self::record_spends(&mut batch, &txid, spends, outputs)?;

        let mut added: Vec<Txid> = Vec::new();
        let mut graph_edges: Vec<(Txid, Txid)> = Vec::new();
        let mut failed: Vec<Txid> = Vec::new();

        for dep in deps {
            Self::add_in_batch(&mut batch, *dep, Height::Unknown, &mut added)?;
            batch.add_dep(dep, &txid)?;
            if self.graph.contains(dep) || added.contains(dep) {
                graph_edges.push((*dep, txid));
            } else {
                let dep_record = batch
                    .get_tx(dep)?
                    .ok_or(IndexerError::UnknownTransaction(*dep))?;
                // A non-executable (never-executed) or already-indexed
                // predecessor satisfies the upstream clause without an edge.
                // Only a record whose execution terminated unindexed is
                // permanently unindexable and fails this transaction.
                if dep_record.executed && !dep_record.indexed {
                    // The parser's own verdict says this transaction is a
                    // code transaction, so the cascade applies.
                    self.fail_closure_in_batch(&mut batch, txid, Some(true), &mut failed)?;
                    break;
                }
            }
        }
        batch.commit()?;

        for t in &added {
            self.graph.insert(*t, false, None);
        }
        self.graph.mark_downloaded(&txid, Some(has_code));
        for (up, down) in &graph_edges {
            self.graph.add_edge(up, down);
        }

        let mut events: Vec<IndexerEvent> = added
            .iter()
            .map(|t| IndexerEvent::Added { txid: *t })
            .collect();
        let mut ready = Vec::new();
        if failed.is_empty() {
            self.graph.check_executability(&txid, &self.trust, &mut ready);
        } else {
            self.apply_failures(&failed, &mut ready);
        }
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Record a successful execution: flags, jig/berry states, annotations.
    /// The node leaves the graph; downstream neighbours that were already
    /// queued and now have no unexecuted predecessors are announced.
    pub fn store_executed(
        &mut self,
        txid: Txid,
        result: &ExecutionResult,
    ) -> Result<(), IndexerError> {
        let mut record = self.require(&txid)?;
        record.executed = true;
        record.indexed = true;

        let mut batch = self.env.write_batch()?;
        batch.put_tx(&record)?;
        for (kind, location, state) in result.state_entries()? {
            let location = location.to_string();
            let state = serde_json::to_string(state)?;
            match kind {
                StateKind::Jig => batch.put_jig(&JigRecord {
                    class: result.classes.get(&location).cloned(),
                    lock: result.locks.get(&location).cloned(),
                    scripthash: result.scripthashes.get(&location).cloned(),
                    location,
                    state,
                })?,
                StateKind::Berry => batch.put_berry(&BerryRecord { location, state })?,
            }
        }
        batch.commit()?;

        let removed = self.graph.remove(&txid);
        let mut ready = Vec::new();
        if let Some(removed) = removed {
            self.notify_downstream_of_removal(&removed, &mut ready);
        }

        self.stats.increment("transactions_executed");
        tracing::debug!(txid = %txid, "transaction executed");
        let mut events = Vec::new();
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Record a permanent execution failure. Whether the failure cascades to
    /// descendants depends on a re-examination of the stored bytes: if they
    /// still look like a code transaction, downstream genuinely depended on
    /// executing this one and fails with it; a spurious parse failure leaves
    /// downstream merely re-evaluated.
    pub fn set_execution_failed(&mut self, txid: Txid) -> Result<(), IndexerError> {
        self.require(&txid)?;
        let mut failed = Vec::new();
        let mut batch = self.env.write_batch()?;
        self.fail_closure_in_batch(&mut batch, txid, None, &mut failed)?;
        batch.commit()?;

        let mut ready = Vec::new();
        self.apply_failures(&failed, &mut ready);
        let mut events = Vec::new();
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Insert dependency edges the executor discovered during an attempt,
    /// then re-arm readiness so a still-satisfied node fires again. No-op if
    /// the node has been removed in the meantime (race with delete).
    pub fn add_missing_deps(&mut self, txid: Txid, deps: &[Txid]) -> Result<(), IndexerError> {
        if !self.graph.contains(&txid) {
            return Ok(());
        }

        let mut batch = self.env.write_batch()?;
        let mut added: Vec<Txid> = Vec::new();
        let mut graph_edges: Vec<(Txid, Txid)> = Vec::new();
        let mut failed: Vec<Txid> = Vec::new();

        for dep in deps {
            Self::add_in_batch(&mut batch, *dep, Height::Unknown, &mut added)?;
            batch.add_dep(dep, &txid)?;
            if self.graph.contains(dep) || added.contains(dep) {
                graph_edges.push((*dep, txid));
            } else {
                let dep_record = batch
                    .get_tx(dep)?
                    .ok_or(IndexerError::UnknownTransaction(*dep))?;
                // Same rule as the parse path: non-executable and indexed
                // predecessors are satisfied; only a record whose execution
                // terminated unindexed fails the dependent.
                if dep_record.executed && !dep_record.indexed {
                    self.fail_closure_in_batch(&mut batch, txid, Some(true), &mut failed)?;
                    break;
                }
            }
        }
        batch.commit()?;

        for t in &added {
            self.graph.insert(*t, false, None);
        }
        for (up, down) in &graph_edges {
            self.graph.add_edge(up, down);
        }

        let mut events: Vec<IndexerEvent> = added
            .iter()
            .map(|t| IndexerEvent::Added { txid: *t })
            .collect();
        let mut ready = Vec::new();
        if failed.is_empty() {
            // Re-arm: force the flag down, then recompute. A node whose new
            // dependencies are all indexed flips back and fires again.
            self.graph
                .check_executability_forced(&txid, false, &self.trust, &mut ready);
            self.graph.check_executability(&txid, &self.trust, &mut ready);
        } else {
            self.apply_failures(&failed, &mut ready);
        }
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Revoke the indexed state of `txid` and every downstream descendant:
    /// reset the flags, clear derived jig/berry state, and resurrect the
    /// nodes into the unexecuted graph, not-ready, with upstream rebuilt
    /// from the persistent edge table.
    pub fn unindex(&mut self, txid: Txid) -> Result<(), IndexerError> {
        let mut plans = Vec::new();
        let mut batch = self.env.write_batch()?;
        Self::unindex_closure_in_batch(&mut batch, txid, &mut plans)?;
        if plans.is_empty() {
            return Ok(()); // nothing indexed; drop the batch
        }
        batch.commit()?;

        for plan in &plans {
            self.graph.insert(plan.txid, true, plan.has_code);
        }
        for plan in &plans {
            for up in &plan.ups {
                self.graph.add_edge(up, &plan.txid);
            }
            for down in &plan.downs {
                self.graph.add_edge(&plan.txid, down);
            }
        }
        let mut ready = Vec::new();
        for plan in &plans {
            self.graph
                .check_executability_forced(&plan.txid, false, &self.trust, &mut ready);
        }
        // Surviving downstream neighbours gained an unexecuted predecessor;
        // their cached flags must come down.
        let resurrected: HashSet<Txid> = plans.iter().map(|p| p.txid).collect();
        let mut survivors = Vec::new();
        for plan in &plans {
            for down in &plan.downs {
                if !resurrected.contains(down) && self.graph.contains(down) {
                    survivors.push(*down);
                }
            }
        }
        for down in survivors {
            self.graph.check_executability(&down, &self.trust, &mut ready);
        }

        let mut events: Vec<IndexerEvent> = plans
            .iter()
            .map(|p| IndexerEvent::Unindexed { txid: p.txid })
            .collect();
        self.stats.add("transactions_unindexed", plans.len() as u64);
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Delete a transaction and, transitively, everything downstream of it:
    /// records, derived state, edges in both directions, and spend
    /// attribution. The traversal carries a visited accumulator so a
    /// corrupted (cyclic) edge table cannot diverge.
    pub fn delete_transaction(&mut self, txid: Txid) -> Result<(), IndexerError> {
        if !self.env.tx_store().exists(&txid)? {
            return Ok(());
        }
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut batch = self.env.write_batch()?;
        let mut stack = vec![txid];
        while let Some(t) = stack.pop() {
            if !visited.insert(t) {
                continue;
            }
            let existed = batch.tx_exists(&t)?;
            let downs = batch.downstream_of(&t)?;
            batch.delete_tx(&t)?;
            batch.delete_states_of(&t)?;
            batch.delete_spends_of(&t)?;
            batch.clear_spends_by(&t)?;
            batch.delete_deps_of(&t)?;
            if existed {
                order.push(t);
            }
            for down in downs {
                stack.push(down);
            }
        }
        batch.commit()?;

        for t in &order {
            self.graph.remove(t);
        }
        self.stats.add("transactions_deleted", order.len() as u64);
        let events = order
            .into_iter()
            .map(|txid| IndexerEvent::Deleted { txid })
            .collect();
        self.emit_all(events);
        Ok(())
    }

    // ── Trust / ban ─────────────────────────────────────────────────────

    /// Trust `txid` and, with it, every untrusted code-bearing ancestor in
    /// the unexecuted graph — trusting a leaf without its dependency closure
    /// leaves perpetually-stuck nodes. Fires `Trusted` per newly-trusted
    /// txid in BFS discovery order.
    pub fn trust(&mut self, txid: Txid) -> Result<(), IndexerError> {
        if self.trust.is_trusted(&txid) {
            return Ok(());
        }

        let mut newly = vec![txid];
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([txid]);
        while let Some(t) = queue.pop_front() {
            if !visited.insert(t) {
                continue;
            }
            let Some(node) = self.graph.get(&t) else {
                continue;
            };
            if t != txid
                && node.has_code == Some(true)
                && !self.trust.is_trusted(&t)
                && !newly.contains(&t)
            {
                newly.push(t);
            }
            for up in &node.upstream {
                queue.push_back(*up);
            }
        }

        let mut batch = self.env.write_batch()?;
        for t in &newly {
            batch.set_trusted(t, true)?;
        }
        batch.commit()?;

        for t in &newly {
            self.trust.insert_trusted(*t);
        }
        let mut ready = Vec::new();
        for t in &newly {
            self.graph.check_executability(t, &self.trust, &mut ready);
        }

        self.stats.add("trust_changes", newly.len() as u64);
        let mut events: Vec<IndexerEvent> = newly
            .iter()
            .map(|t| IndexerEvent::Trusted { txid: *t })
            .collect();
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Revoke trust: unindex first — already-indexed descendant state was
    /// produced under the revoked trust — then remove from the set.
    pub fn untrust(&mut self, txid: Txid) -> Result<(), IndexerError> {
        if !self.trust.is_trusted(&txid) {
            return Ok(());
        }
        self.unindex(txid)?;

        let mut batch = self.env.write_batch()?;
        batch.set_trusted(&txid, false)?;
        batch.commit()?;

        self.trust.remove_trusted(&txid);
        let mut ready = Vec::new();
        self.graph.check_executability(&txid, &self.trust, &mut ready);

        self.stats.increment("trust_changes");
        let mut events = vec![IndexerEvent::Untrusted { txid }];
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Ban `txid`: unindex, then insert into the ban set. A banned
    /// transaction is never ready regardless of trust.
    pub fn ban(&mut self, txid: Txid) -> Result<(), IndexerError> {
        if self.trust.is_banned(&txid) {
            return Ok(());
        }
        self.unindex(txid)?;

        let mut batch = self.env.write_batch()?;
        batch.set_banned(&txid, true)?;
        batch.commit()?;

        self.trust.insert_banned(txid);
        let mut ready = Vec::new();
        self.graph.check_executability(&txid, &self.trust, &mut ready);

        let mut events = vec![IndexerEvent::Banned { txid }];
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    /// Lift a ban and re-evaluate the node's readiness.
    pub fn unban(&mut self, txid: Txid) -> Result<(), IndexerError> {
        if !self.trust.is_banned(&txid) {
            return Ok(());
        }
        let mut batch = self.env.write_batch()?;
        batch.set_banned(&txid, false)?;
        batch.commit()?;

        self.trust.remove_banned(&txid);
        let mut ready = Vec::new();
        self.graph.check_executability(&txid, &self.trust, &mut ready);

        let mut events = vec![IndexerEvent::Unbanned { txid }];
        Self::push_ready(&mut events, ready);
        self.emit_all(events);
        Ok(())
    }

    // ── Invariants ──────────────────────────────────────────────────────

    /// Cross-check the in-memory structures against each other and against
    /// the persistent tables. Test and debugging aid; every violation is a
    /// bug in an ingestion operation.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.graph.verify(&self.trust)?;
        let expected: HashSet<Txid> = self
            .env
            .tx_store()
            .unexecuted_txids()
            .map_err(|e| e.to_string())?
            .into_iter()
            .collect();
        let actual: HashSet<Txid> = self.graph.txids().copied().collect();
        for txid in expected.difference(&actual) {
            return Err(format!("record {txid} is unexecuted but has no node"));
        }
        for txid in actual.difference(&expected) {
            return Err(format!("node {txid} has no unexecuted record"));
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require(&self, txid: &Txid) -> Result<TxRecord, IndexerError> {
        if self.env.tx_store().exists(txid)? {
            Ok(self.env.tx_store().get(txid)?)
        } else {
            Err(IndexerError::UnknownTransaction(*txid))
        }
    }

    /// Insert a bare record through the open batch unless one exists.
    fn add_in_batch(
        batch: &mut WriteBatch<'_>,
        txid: Txid,
        height: Height,
        added: &mut Vec<Txid>,
    ) -> Result<(), IndexerError> {
        if batch.tx_exists(&txid)? {
            return Ok(());
        }
        batch.put_tx(&TxRecord::new(txid, height, Timestamp::now()))?;
        added.push(txid);
        Ok(())
    }

    fn record_spends(
        batch: &mut WriteBatch<'_>,
        txid: &Txid,
        spends: &[Location],
        outputs: &[Location],
    ) -> Result<(), IndexerError> {
        for location in spends {
            batch.set_spend(&location.to_string(), txid)?;
        }
        for location in outputs {
            batch.set_unspent(&location.to_string())?;
        }
        Ok(())
    }

    /// Write the execution-failed flags for `start` and, where the cascade
    /// rule applies, its downstream closure. The cascade decision is made
    /// per node from its own stored bytes; `start_cascade` overrides the
    /// decision for the starting node (the parse path already knows).
    /// Appends the failed txids to `failed` in traversal order.
    fn fail_closure_in_batch(
        &self,
        batch: &mut WriteBatch<'_>,
        start: Txid,
        start_cascade: Option<bool>,
        failed: &mut Vec<Txid>,
    ) -> Result<(), IndexerError> {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(txid) = stack.pop() {
            if !visited.insert(txid) {
                continue;
            }
            let Some(mut record) = batch.get_tx(&txid)? else {
                continue;
            };
            if txid != start && record.bytes.is_none() {
                // Reachable only through a corrupted edge table; an
                // undownloaded record cannot have terminated execution.
                continue;
            }
            record.executable = false;
            record.executed = true;
            record.indexed = false;
            batch.put_tx(&record)?;
            failed.push(txid);

            let cascade = if txid == start {
                start_cascade.unwrap_or_else(|| {
                    record
                        .bytes
                        .as_deref()
                        .map_or(false, metadata::appears_executable)
                })
            } else {
                record
                    .bytes
                    .as_deref()
                    .map_or(false, metadata::appears_executable)
            };
            if cascade {
                if let Some(node) = self.graph.get(&txid) {
                    for down in &node.downstream {
                        stack.push(*down);
                    }
                }
            }
        }
        Ok(())
    }

    /// Post-commit half of a failure: drop the failed nodes from the graph
    /// and notify the surviving downstream neighbours.
    fn apply_failures(&mut self, failed: &[Txid], ready: &mut Vec<Txid>) {
        let failed_set: HashSet<Txid> = failed.iter().copied().collect();
        let mut survivors = HashSet::new();
        for txid in failed {
            if let Some(removed) = self.graph.remove(txid) {
                survivors.extend(
                    removed
                        .downstream
                        .into_iter()
                        .filter(|d| !failed_set.contains(d)),
                );
            }
            self.stats.increment("executions_failed");
            tracing::warn!(txid = %txid, "execution failed");
        }
        for down in survivors {
            self.notify_neighbour(&down, ready);
        }
    }

    /// Iterative downstream walk marking indexed records unexecuted and
    /// clearing their derived state. Fills `plans` parent-first.
    fn unindex_closure_in_batch(
        batch: &mut WriteBatch<'_>,
        start: Txid,
        plans: &mut Vec<ResurrectPlan>,
    ) -> Result<(), IndexerError> {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(txid) = stack.pop() {
            if !visited.insert(txid) {
                continue;
            }
            let Some(mut record) = batch.get_tx(&txid)? else {
                continue;
            };
            if !record.indexed {
                continue;
            }
            record.executed = false;
            record.indexed = false;
            batch.put_tx(&record)?;
            batch.delete_states_of(&txid)?;

            let ups = batch.upstream_of(&txid)?;
            let downs = batch.downstream_of(&txid)?;
            for down in &downs {
                stack.push(*down);
            }
            plans.push(ResurrectPlan {
                txid,
                has_code: record.has_code,
                ups,
                downs,
            });
        }
        Ok(())
    }

    /// After removing a satisfied node (executed or non-executable), handle
    /// each former downstream neighbour: a neighbour that was already queued
    /// and now has no unexecuted predecessors becomes a ready root; any
    /// other neighbour is re-evaluated.
    fn notify_downstream_of_removal(&mut self, removed: &RemovedNode, ready: &mut Vec<Txid>) {
        for down in &removed.downstream {
            self.notify_neighbour(down, ready);
        }
    }

    fn notify_neighbour(&mut self, down: &Txid, ready: &mut Vec<Txid>) {
        let (queued, is_root) = match self.graph.get(down) {
            Some(node) => (node.queued_for_execution, node.upstream.is_empty()),
            None => return,
        };
        if queued {
            if is_root {
                ready.push(*down);
            }
        } else {
            self.graph.check_executability(down, &self.trust, ready);
        }
    }
}
