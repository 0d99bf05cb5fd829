//! The in-memory unexecuted graph and its readiness propagator.
//!
//! A node lives here iff its transaction is not yet indexed or not yet
//! downloaded. Edges are back-references, never ownership: an edge is
//! materialised iff both endpoints are present, and removing a node detaches
//! it from every peer's adjacency. Transactions absent from the graph count
//! as satisfied predecessors — they are either indexed or declared
//! non-executable, and the persistent record is the authority for which.

use std::collections::{HashMap, HashSet};

use jigdex_types::Txid;

use crate::trust::TrustRegistry;

/// A not-yet-indexed (or not-yet-downloaded) transaction.
#[derive(Clone, Debug)]
pub struct UnexecutedNode {
    pub downloaded: bool,
    /// Tri-state: `None` until the transaction is parsed.
    pub has_code: Option<bool>,
    /// Cached value of the readiness predicate. Only
    /// [`UnexecutedGraph::check_executability`] may change it.
    pub queued_for_execution: bool,
    pub upstream: HashSet<Txid>,
    pub downstream: HashSet<Txid>,
}

/// Adjacency snapshot returned when a node is removed, so callers can notify
/// the former downstream neighbours.
#[derive(Debug)]
pub struct RemovedNode {
    pub queued_for_execution: bool,
    pub upstream: HashSet<Txid>,
    pub downstream: HashSet<Txid>,
}

/// The unexecuted DAG plus the materialised readiness flags.
pub struct UnexecutedGraph {
    nodes: HashMap<Txid, UnexecutedNode>,
    num_queued: usize,
}

impl UnexecutedGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            num_queued: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, txid: &Txid) -> bool {
        self.nodes.contains_key(txid)
    }

    pub fn get(&self, txid: &Txid) -> Option<&UnexecutedNode> {
        self.nodes.get(txid)
    }

    pub fn txids(&self) -> impl Iterator<Item = &Txid> {
        self.nodes.keys()
    }

    /// Number of nodes whose readiness flag is set.
    pub fn num_queued(&self) -> usize {
        self.num_queued
    }

    /// Insert a fresh node with no adjacency and the flag cleared.
    /// Re-inserting an existing txid is a no-op.
    pub fn insert(&mut self, txid: Txid, downloaded: bool, has_code: Option<bool>) {
        self.nodes.entry(txid).or_insert_with(|| UnexecutedNode {
            downloaded,
            has_code,
            queued_for_execution: false,
            upstream: HashSet::new(),
            downstream: HashSet::new(),
        });
    }

    /// Record that the node's bytes have been downloaded and parsed.
    pub fn mark_downloaded(&mut self, txid: &Txid, has_code: Option<bool>) {
        if let Some(node) = self.nodes.get_mut(txid) {
            node.downloaded = true;
            node.has_code = has_code;
        }
    }

    /// Materialise the edge `(up, down)` if both endpoints are present.
    pub fn add_edge(&mut self, up: &Txid, down: &Txid) {
        if up == down || !self.nodes.contains_key(up) || !self.nodes.contains_key(down) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(up) {
            node.downstream.insert(*down);
        }
        if let Some(node) = self.nodes.get_mut(down) {
            node.upstream.insert(*up);
        }
    }

    /// Remove a node, detaching it from every peer's adjacency. Returns the
    /// former adjacency so the caller can notify downstream neighbours.
    pub fn remove(&mut self, txid: &Txid) -> Option<RemovedNode> {
        let node = self.nodes.remove(txid)?;
        if node.queued_for_execution {
            self.num_queued -= 1;
        }
        for up in &node.upstream {
            if let Some(peer) = self.nodes.get_mut(up) {
                peer.downstream.remove(txid);
            }
        }
        for down in &node.downstream {
            if let Some(peer) = self.nodes.get_mut(down) {
                peer.upstream.remove(txid);
            }
        }
        Some(RemovedNode {
            queued_for_execution: node.queued_for_execution,
            upstream: node.upstream,
            downstream: node.downstream,
        })
    }

    /// The pure readiness predicate:
    /// downloaded, trusted if code-bearing, not banned, and every upstream
    /// neighbour already queued. Upstream transactions absent from the graph
    /// count as satisfied.
    pub fn ready(&self, txid: &Txid, trust: &TrustRegistry) -> bool {
        let Some(node) = self.nodes.get(txid) else {
            return false;
        };
        node.downloaded
            && (node.has_code != Some(true) || trust.is_trusted(txid))
            && !trust.is_banned(txid)
            && node
                .upstream
                .iter()
                .all(|up| self.nodes.get(up).map_or(true, |u| u.queued_for_execution))
    }

    /// Recompute the readiness of `txid` and propagate any change downstream.
    ///
    /// Whenever a node's flag becomes true while its upstream set is empty,
    /// its txid is appended to `ready_roots` — each such node is announced
    /// to the executor exactly once per flip.
    pub fn check_executability(
        &mut self,
        txid: &Txid,
        trust: &TrustRegistry,
        ready_roots: &mut Vec<Txid>,
    ) {
        self.propagate(*txid, None, trust, ready_roots);
    }

    /// Override form: skips the predicate and installs a caller-supplied
    /// flag on the starting node, then propagates normally.
    pub fn check_executability_forced(
        &mut self,
        txid: &Txid,
        forced: bool,
        trust: &TrustRegistry,
        ready_roots: &mut Vec<Txid>,
    ) {
        self.propagate(*txid, Some(forced), trust, ready_roots);
    }

    /// The incremental propagator. Terminates because it walks the graph
    /// only in the downstream direction and only past nodes whose flag
    /// actually changed; the graph is finite and a flag can change at most
    /// twice per logical event.
    fn propagate(
        &mut self,
        start: Txid,
        forced: Option<bool>,
        trust: &TrustRegistry,
        ready_roots: &mut Vec<Txid>,
    ) {
        let mut stack = vec![(start, forced)];
        while let Some((txid, forced)) = stack.pop() {
            if !self.nodes.contains_key(&txid) {
                continue;
            }
            let new_flag = match forced {
                Some(value) => value,
                None => self.ready(&txid, trust),
            };
            let node = self.nodes.get_mut(&txid).expect("checked above");
            if node.queued_for_execution == new_flag {
                continue;
            }
            node.queued_for_execution = new_flag;
            if new_flag {
                self.num_queued += 1;
            } else {
                self.num_queued -= 1;
            }
            let node = self.nodes.get(&txid).expect("checked above");
            if new_flag && node.upstream.is_empty() {
                ready_roots.push(txid);
            }
            for down in &node.downstream {
                stack.push((*down, None));
            }
        }
        self.debug_assert_counter();
    }

    /// Re-derive the queued counter from the flags. The counter is adjusted
    /// in exactly one place (`propagate`) plus `remove`, but the two must
    /// agree at every quiescent point.
    pub fn debug_assert_counter(&self) {
        debug_assert_eq!(
            self.num_queued,
            self.nodes
                .values()
                .filter(|n| n.queued_for_execution)
                .count(),
            "queued counter diverged from flags"
        );
    }

    /// All queued nodes with no unexecuted predecessors — the set the
    /// executor should be working on. Used to re-announce work after a
    /// restart, when the original `ReadyToExecute` fires are gone.
    pub fn ready_roots(&self) -> Vec<Txid> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.queued_for_execution && n.upstream.is_empty())
            .map(|(txid, _)| *txid)
            .collect()
    }

    /// Verify the structural invariants; returns the first violation found.
    pub fn verify(&self, trust: &TrustRegistry) -> Result<(), String> {
        for (txid, node) in &self.nodes {
            if node.queued_for_execution != self.ready(txid, trust) {
                return Err(format!("node {txid} flag disagrees with predicate"));
            }
            if trust.is_banned(txid) && node.queued_for_execution {
                return Err(format!("banned node {txid} is queued"));
            }
            for up in &node.upstream {
                let Some(peer) = self.nodes.get(up) else {
                    return Err(format!("node {txid} has dangling upstream {up}"));
                };
                if !peer.downstream.contains(txid) {
                    return Err(format!("edge ({up}, {txid}) is asymmetric"));
                }
            }
            for down in &node.downstream {
                let Some(peer) = self.nodes.get(down) else {
                    return Err(format!("node {txid} has dangling downstream {down}"));
                };
                if !peer.upstream.contains(txid) {
                    return Err(format!("edge ({txid}, {down}) is asymmetric"));
                }
            }
        }
        let queued = self
            .nodes
            .values()
            .filter(|n| n.queued_for_execution)
            .count();
        if queued != self.num_queued {
            return Err(format!(
                "queued counter is {} but {} flags are set",
                self.num_queued, queued
            ));
        }
        Ok(())
    }
}

impl Default for UnexecutedGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txid(n: u8) -> Txid {
        Txid::new([n; 32])
    }

    fn trusting(txids: &[Txid]) -> TrustRegistry {
        TrustRegistry::new(txids.iter().copied().collect(), HashSet::new())
    }

    #[test]
    fn fresh_node_is_not_ready() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(1), false, None);
        assert!(!graph.ready(&txid(1), &trust));
    }

    #[test]
    fn downloaded_codeless_node_becomes_ready_root() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(1), false, None);
        graph.mark_downloaded(&txid(1), Some(false));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert_eq!(roots, vec![txid(1)]);
        assert_eq!(graph.num_queued(), 1);
    }

    #[test]
    fn code_requires_trust() {
        let mut graph = UnexecutedGraph::new();
        graph.insert(txid(1), true, Some(true));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &TrustRegistry::empty(), &mut roots);
        assert!(roots.is_empty());

        let trust = trusting(&[txid(1)]);
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert_eq!(roots, vec![txid(1)]);
    }

    #[test]
    fn ban_dominates_trust() {
        let mut graph = UnexecutedGraph::new();
        graph.insert(txid(1), true, Some(true));
        let mut trust = trusting(&[txid(1)]);
        trust.insert_banned(txid(1));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert!(roots.is_empty());
        assert_eq!(graph.num_queued(), 0);
    }

    #[test]
    fn readiness_propagates_down_a_chain() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        for n in 1..=3 {
            graph.insert(txid(n), true, Some(false));
        }
        graph.add_edge(&txid(1), &txid(2));
        graph.add_edge(&txid(2), &txid(3));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);

        // The whole chain flips ready, but only the head is a root.
        assert_eq!(graph.num_queued(), 3);
        assert_eq!(roots, vec![txid(1)]);
        graph.verify(&trust).unwrap();
    }

    #[test]
    fn unready_upstream_blocks_downstream() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(1), false, None); // not downloaded
        graph.insert(txid(2), true, Some(false));
        graph.add_edge(&txid(1), &txid(2));

        let mut roots = Vec::new();
        graph.check_executability(&txid(2), &trust, &mut roots);
        assert!(roots.is_empty());
        assert_eq!(graph.num_queued(), 0);
    }

    #[test]
    fn absent_upstream_counts_satisfied() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(2), true, Some(false));
        // txid(1) was never inserted; an edge to it cannot materialise.
        graph.add_edge(&txid(1), &txid(2));

        let mut roots = Vec::new();
        graph.check_executability(&txid(2), &trust, &mut roots);
        assert_eq!(roots, vec![txid(2)]);
    }

    #[test]
    fn forced_false_unqueues_subtree() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        for n in 1..=2 {
            graph.insert(txid(n), true, Some(false));
        }
        graph.add_edge(&txid(1), &txid(2));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert_eq!(graph.num_queued(), 2);

        roots.clear();
        graph.check_executability_forced(&txid(1), false, &trust, &mut roots);
        assert!(roots.is_empty());
        assert_eq!(graph.num_queued(), 0);
    }

    #[test]
    fn remove_detaches_adjacency_symmetrically() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        for n in 1..=3 {
            graph.insert(txid(n), false, None);
        }
        graph.add_edge(&txid(1), &txid(2));
        graph.add_edge(&txid(2), &txid(3));

        let removed = graph.remove(&txid(2)).expect("node existed");
        assert_eq!(removed.upstream, [txid(1)].into_iter().collect());
        assert_eq!(removed.downstream, [txid(3)].into_iter().collect());
        assert!(graph.get(&txid(1)).unwrap().downstream.is_empty());
        assert!(graph.get(&txid(3)).unwrap().upstream.is_empty());
        graph.verify(&trust).unwrap();
    }

    #[test]
    fn remove_queued_node_decrements_counter() {
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(1), true, Some(false));
        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert_eq!(graph.num_queued(), 1);

        graph.remove(&txid(1));
        assert_eq!(graph.num_queued(), 0);
    }

    #[test]
    fn diamond_propagation_converges() {
        // 1 -> {2, 3} -> 4
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        for n in 1..=4 {
            graph.insert(txid(n), true, Some(false));
        }
        graph.add_edge(&txid(1), &txid(2));
        graph.add_edge(&txid(1), &txid(3));
        graph.add_edge(&txid(2), &txid(4));
        graph.add_edge(&txid(3), &txid(4));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        assert_eq!(graph.num_queued(), 4);
        assert_eq!(roots, vec![txid(1)]);
        graph.verify(&trust).unwrap();
    }

    #[test]
    fn cycle_members_never_become_ready() {
        // A corrupted edge table can produce a cycle; members stay unready.
        let mut graph = UnexecutedGraph::new();
        let trust = TrustRegistry::empty();
        graph.insert(txid(1), true, Some(false));
        graph.insert(txid(2), true, Some(false));
        graph.add_edge(&txid(1), &txid(2));
        graph.add_edge(&txid(2), &txid(1));

        let mut roots = Vec::new();
        graph.check_executability(&txid(1), &trust, &mut roots);
        graph.check_executability(&txid(2), &trust, &mut roots);
        assert!(roots.is_empty());
        assert_eq!(graph.num_queued(), 0);
    }

    #[test]
    fn self_edge_is_ignored() {
        let mut graph = UnexecutedGraph::new();
        graph.insert(txid(1), true, Some(false));
        graph.add_edge(&txid(1), &txid(1));
        assert!(graph.get(&txid(1)).unwrap().upstream.is_empty());
        assert!(graph.get(&txid(1)).unwrap().downstream.is_empty());
    }
}
