//! Transaction dependency graph.
//!
//! Nodes live in an arena keyed by content hash; edges are stored as hash
//! sets in both directions, never as owning references, so removal is a
//! pair of lookups. Acyclicity holds by construction: a newly inserted
//! node may only depend on nodes that are already present, which strictly
//! precede it in admission order.
//!
//! Levels: `level(n) = 1 + max(level(p) for p in predecessors)`, 0 for
//! roots. Removing a node can lower its successors' levels, so the stored
//! per-node level is only the insertion-time value; [`DependencyGraph::levels`]
//! recomputes the decomposition from the live structure on every query,
//! memoised within the call.

use crate::errors::OrderingError;
use shared_types::Hash;
use std::collections::{BTreeSet, HashMap};

/// A node of the dependency graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    /// Transaction content hash.
    pub hash: Hash,
    /// Hashes this node must execute after.
    pub predecessors: BTreeSet<Hash>,
    /// Hashes that must execute after this node.
    pub successors: BTreeSet<Hash>,
    /// Level at insertion time; successors of removed nodes go stale until
    /// the next `levels()` query.
    pub level: usize,
}

/// Arena-backed DAG over pending transactions.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<Hash, GraphNode>,
}

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.successors.len()).sum()
    }

    /// True if `hash` is a node.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    /// Node lookup.
    pub fn get(&self, hash: &Hash) -> Option<&GraphNode> {
        self.nodes.get(hash)
    }

    /// True if an edge `from → to` exists.
    pub fn has_edge(&self, from: &Hash, to: &Hash) -> bool {
        self.nodes
            .get(from)
            .map(|n| n.successors.contains(to))
            .unwrap_or(false)
    }

    /// Insert a node depending on `predecessors`.
    ///
    /// Predecessor hashes that are not (or no longer) in the graph are
    /// skipped: the caller scans live entries under the same lock that
    /// guards insertion, so a miss only means the entry was removed in
    /// between and the dependency is moot.
    pub fn add_node(&mut self, hash: Hash, predecessors: &[Hash]) {
        let mut level = 0usize;
        let mut preds = BTreeSet::new();

        for pred in predecessors {
            if *pred == hash {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(pred) {
                node.successors.insert(hash);
                preds.insert(*pred);
                level = level.max(node.level + 1);
            }
        }

        self.nodes.insert(
            hash,
            GraphNode {
                hash,
                predecessors: preds,
                successors: BTreeSet::new(),
                level,
            },
        );
    }

    /// Insert an edge `from → to` between two existing nodes.
    ///
    /// Used when a replacement entry inherits an earlier admission slot
    /// and must point at nodes inserted after that slot. Stored levels are
    /// not touched; `levels()` recomputes from structure. Self-edges and
    /// edges touching absent nodes are ignored.
    pub fn add_edge(&mut self, from: &Hash, to: &Hash) {
        if from == to || !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from) {
            node.successors.insert(*to);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.predecessors.insert(*from);
        }
    }

    /// Remove a node, detaching its edges. Removing an absent hash is a
    /// no-op.
    pub fn remove_node(&mut self, hash: &Hash) {
        let Some(node) = self.nodes.remove(hash) else {
            return;
        };

        for pred in &node.predecessors {
            if let Some(p) = self.nodes.get_mut(pred) {
                p.successors.remove(hash);
            }
        }
        for succ in &node.successors {
            if let Some(s) = self.nodes.get_mut(succ) {
                s.predecessors.remove(hash);
            }
        }
    }

    /// Decompose the graph into execution levels.
    ///
    /// `result[i]` holds every node at level `i`; all nodes of one level
    /// are mutually independent. Within a level, hashes are sorted for
    /// determinism; priority ordering is the caller's concern.
    ///
    /// Wave-based Kahn traversal: each wave contains exactly the nodes
    /// whose last predecessor sat in an earlier wave, which makes the wave
    /// index equal to `1 + max(level(predecessors))`.
    pub fn levels(&self) -> Result<Vec<Vec<Hash>>, OrderingError> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree: HashMap<Hash, usize> = self
            .nodes
            .iter()
            .map(|(hash, node)| (*hash, node.predecessors.len()))
            .collect();

        let mut wave: Vec<Hash> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(hash, _)| *hash)
            .collect();
        wave.sort();

        let mut levels: Vec<Vec<Hash>> = Vec::new();
        let mut scheduled = 0usize;

        while !wave.is_empty() {
            let current = std::mem::take(&mut wave);
            scheduled += current.len();

            let mut next: Vec<Hash> = Vec::new();
            for hash in &current {
                let Some(node) = self.nodes.get(hash) else {
                    continue;
                };
                for succ in &node.successors {
                    let Some(degree) = in_degree.get_mut(succ) else {
                        continue;
                    };
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.push(*succ);
                    }
                }
            }

            next.sort();
            levels.push(current);
            wave = next;
        }

        if scheduled < self.nodes.len() {
            return Err(OrderingError::CycleDetected);
        }

        Ok(levels)
    }

    /// Current level of a single node, recomputed from live structure.
    pub fn level_of(&self, hash: &Hash) -> Result<usize, OrderingError> {
        let levels = self.levels()?;
        levels
            .iter()
            .position(|level| level.contains(hash))
            .ok_or(OrderingError::UnknownNode(*hash))
    }
}
