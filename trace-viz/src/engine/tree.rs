//! Arena of span nodes keyed by id.
//!
//! Children are stored as ids and resolved through the map on every read, so a
//! node handed out by one query never goes stale relative to another.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use trace_types::{TraceNode, TraceStatus};

/// Recursion ceiling shared by every walk over parent/child links.
pub const MAX_DEPTH: u32 = 20;

/// What happened when a `started` node was offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// First sighting of the id; `attached` when its parent was present.
    Inserted { attached: bool },
    /// Id already known; descriptive fields were refreshed in place.
    Merged,
}

#[derive(Debug, Default, Clone)]
pub struct TreeStore {
    nodes: HashMap<String, TraceNode>,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a node from a `started` event.
    ///
    /// A repeated id keeps its parent, children, status and duration; only the
    /// descriptive fields take the newer values.
    pub fn upsert_on_start(&mut self, node: TraceNode) -> StartOutcome {
        if let Some(existing) = self.nodes.get_mut(&node.id) {
            existing.operation = node.operation;
            existing.dispatcher = node.dispatcher;
            existing.source_file = node.source_file;
            existing.line_number = node.line_number;
            existing.start_offset_ms = node.start_offset_ms;
            return StartOutcome::Merged;
        }

        let attached = match node.parent_id.as_deref() {
            Some(parent_id) => match self.nodes.get_mut(parent_id) {
                Some(parent) => {
                    parent.child_ids.push(node.id.clone());
                    true
                }
                None => false,
            },
            None => false,
        };

        self.nodes.insert(node.id.clone(), node);
        StartOutcome::Inserted { attached }
    }

    /// Apply a terminal transition. Returns the updated node, or `None` if the
    /// id was never started.
    pub fn transition(
        &mut self,
        id: &str,
        status: TraceStatus,
        duration_ms: f64,
    ) -> Option<&TraceNode> {
        let node = self.nodes.get_mut(id)?;
        node.status = status;
        node.duration_ms = duration_ms;
        Some(&*node)
    }

    pub fn get(&self, id: &str) -> Option<&TraceNode> {
        self.nodes.get(id)
    }

    pub fn is_root(&self, node: &TraceNode) -> bool {
        match node.parent_id.as_deref() {
            None => true,
            Some(parent_id) => !self.nodes.contains_key(parent_id),
        }
    }

    /// Nodes with no resolvable parent, in no particular order.
    pub fn roots(&self) -> Vec<&TraceNode> {
        self.nodes.values().filter(|n| self.is_root(n)).collect()
    }

    /// Roots ordered by start offset, ties broken by id.
    pub fn sorted_roots(&self) -> Vec<&TraceNode> {
        let mut roots = self.roots();
        roots.sort_by(|a, b| start_order(a, b));
        roots
    }

    /// Registered children that are currently present, in insertion order.
    pub fn children_of(&self, id: &str) -> Vec<&TraceNode> {
        self.nodes
            .get(id)
            .map(|node| {
                node.child_ids
                    .iter()
                    .filter_map(|child_id| self.nodes.get(child_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared parent chain of `id`, nearest first. Stops at a missing parent,
    /// a repeated id, or after `MAX_DEPTH` hops.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id.to_string()]);
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());

        while let Some(parent_id) = current {
            if chain.len() as u32 >= MAX_DEPTH || !seen.insert(parent_id.to_string()) {
                break;
            }
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            chain.push(parent.id.clone());
            current = parent.parent_id.as_deref();
        }
        chain
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TraceNode> {
        self.nodes.values()
    }
}

/// Deterministic ordering used wherever siblings or roots are listed.
pub fn start_order(a: &TraceNode, b: &TraceNode) -> Ordering {
    a.start_offset_ms
        .total_cmp(&b.start_offset_ms)
        .then_with(|| a.id.cmp(&b.id))
}
