//! Left-to-right tree layout.
//!
//! Children are sized before their parent (post-order): leaves take the next
//! free row, and an internal node is centred between its first and last
//! child. Root trees are stacked top to bottom.

use std::collections::{HashMap, HashSet};

use trace_types::{Connection, NodePosition, TraceNode, TreeLayout};

use super::tree::{start_order, TreeStore, MAX_DEPTH};

pub const NODE_WIDTH: i32 = 180;
pub const NODE_HEIGHT: i32 = 72;
pub const HORIZONTAL_GAP: i32 = 100;
pub const VERTICAL_GAP: i32 = 20;
/// Space above the first root tree
pub const TOP_MARGIN: i32 = 40;
/// Space past the right-most and bottom-most node in the reported extent
pub const CANVAS_PADDING: i32 = 50;

/// Lay out `roots` (already in display order), resolving child ids through
/// `resolve`. Ids that do not resolve are skipped.
pub fn layout<'a, F>(roots: &[&'a TraceNode], resolve: F) -> TreeLayout
where
    F: Fn(&str) -> Option<&'a TraceNode>,
{
    let mut builder = LayoutBuilder {
        resolve,
        positions: Vec::new(),
        connections: Vec::new(),
        visited: HashSet::new(),
        centers: HashMap::new(),
    };

    let mut cursor = TOP_MARGIN;
    for &root in roots {
        builder.visited.clear();
        let height = builder.place(root, 0, cursor);
        cursor += height + VERTICAL_GAP * 2;
    }

    let width = builder
        .positions
        .iter()
        .map(|p| p.x + NODE_WIDTH + CANVAS_PADDING)
        .max()
        .unwrap_or(0);
    let height = builder
        .positions
        .iter()
        .map(|p| p.y + NODE_HEIGHT + CANVAS_PADDING)
        .max()
        .unwrap_or(0);

    TreeLayout {
        positions: builder.positions,
        connections: builder.connections,
        width,
        height,
    }
}

/// Layout of everything currently in `store`, roots sorted by start.
pub fn layout_store(store: &TreeStore) -> TreeLayout {
    let roots = store.sorted_roots();
    layout(&roots, |id| store.get(id))
}

struct LayoutBuilder<F> {
    resolve: F,
    positions: Vec<NodePosition>,
    connections: Vec<Connection>,
    /// Ids entered while laying out the current root
    visited: HashSet<String>,
    /// Vertical centre of every placed node
    centers: HashMap<String, i32>,
}

impl<'a, F> LayoutBuilder<F>
where
    F: Fn(&str) -> Option<&'a TraceNode>,
{
    /// Place `node` with its subtree starting at row `top`; returns the height used.
    fn place(&mut self, node: &'a TraceNode, level: u32, top: i32) -> i32 {
        if level > MAX_DEPTH || !self.visited.insert(node.id.clone()) {
            tracing::debug!(span_id = %node.id, level, "Layout descent stopped");
            return NODE_HEIGHT;
        }

        let mut children: Vec<&'a TraceNode> = node
            .child_ids
            .iter()
            .filter_map(|id| (self.resolve)(id))
            .collect();
        children.sort_by(|a, b| start_order(a, b));

        let x = level as i32 * (NODE_WIDTH + HORIZONTAL_GAP);

        if children.is_empty() {
            self.push(node, x, top, level);
            return NODE_HEIGHT;
        }

        let mut cursor = top;
        for &child in &children {
            let child_height = self.place(child, level + 1, cursor);
            cursor += child_height + VERTICAL_GAP;
        }

        let child_centers: Vec<i32> = children
            .iter()
            .filter_map(|child| self.centers.get(&child.id).copied())
            .collect();

        let y = match (child_centers.first(), child_centers.last()) {
            (Some(first), Some(last)) => (first + last) / 2 - NODE_HEIGHT / 2,
            _ => top,
        };
        self.push(node, x, y, level);

        for child_center in child_centers {
            self.connections.push(Connection {
                from_x: x + NODE_WIDTH,
                from_y: y + NODE_HEIGHT / 2,
                to_x: x + NODE_WIDTH + HORIZONTAL_GAP,
                to_y: child_center,
            });
        }

        NODE_HEIGHT.max(cursor - top - VERTICAL_GAP)
    }

    fn push(&mut self, node: &TraceNode, x: i32, y: i32, level: u32) {
        self.centers.insert(node.id.clone(), y + NODE_HEIGHT / 2);
        self.positions.push(NodePosition {
            node: node.clone(),
            x,
            y,
            level,
        });
    }
}
