//! Gantt rows: depth-first span order plus bar geometry on a time axis.

use std::collections::HashSet;

use trace_types::{GanttChart, GanttRow, TraceNode};

use super::tree::{start_order, TreeStore};

/// Assumed length of a span that has not reported a duration yet
const RUNNING_SPAN_MS: f64 = 100.0;
/// Extra axis length past the last span
const AXIS_PADDING_MS: f64 = 50.0;
const MIN_BAR_PX: f64 = 4.0;
const MIN_RUNNING_BAR_PX: f64 = 20.0;
/// Share of the remaining axis a running bar stretches over
const RUNNING_BAR_FRACTION: f64 = 0.3;
/// Minimum spacing between tick labels in pixels
const MIN_TICK_SPACING_PX: f64 = 60.0;
/// Ceiling on axis ticks; the step widens past the scale-derived one to stay under it
pub const MAX_TICKS: usize = 1000;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 100.0;

/// Every reachable node once, parents before children, with its depth.
pub fn ordered_nodes(store: &TreeStore) -> Vec<(&TraceNode, u32)> {
    let mut ordered = Vec::with_capacity(store.len());
    let mut processed = HashSet::new();

    // Explicit stack instead of recursion; children pushed in reverse so the
    // earliest child is visited first.
    let mut stack: Vec<(&TraceNode, u32)> =
        store.sorted_roots().into_iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if !processed.insert(node.id.as_str()) {
            continue;
        }
        ordered.push((node, depth));

        let mut children = store.children_of(&node.id);
        children.sort_by(|a, b| start_order(a, b));
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }

    ordered
}

/// End of the time axis: latest span end, treating running spans as 100ms long.
pub fn max_time_ms<'a>(nodes: impl IntoIterator<Item = &'a TraceNode>) -> f64 {
    nodes
        .into_iter()
        .map(|node| {
            if node.duration_ms > 0.0 {
                node.start_offset_ms + node.duration_ms
            } else {
                node.start_offset_ms + RUNNING_SPAN_MS
            }
        })
        .fold(0.0, f64::max)
}

/// Bar `(left, width)` in pixels at `scale` px/ms.
pub fn bar_geometry(node: &TraceNode, scale: f64, max_time_ms: f64) -> (f64, f64) {
    let left = node.start_offset_ms * scale;
    let width = if node.duration_ms > 0.0 {
        (node.duration_ms * scale).max(MIN_BAR_PX)
    } else {
        ((max_time_ms - node.start_offset_ms) * scale * RUNNING_BAR_FRACTION).max(MIN_RUNNING_BAR_PX)
    };
    (left, width)
}

/// Tick spacing that keeps labels at least 60px apart.
pub fn tick_step_ms(scale: f64) -> f64 {
    let min_step = MIN_TICK_SPACING_PX / scale;
    [10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
        .into_iter()
        .find(|step| min_step < *step)
        .unwrap_or(5000.0)
}

/// Ticks from 0 to `max_time_ms + 50`, widening `step` by tenfold until at
/// most [`MAX_TICKS`] fit. Returns the step actually used.
pub fn axis_ticks(max_time_ms: f64, step: f64) -> (f64, Vec<f64>) {
    let axis_end = max_time_ms + AXIS_PADDING_MS;
    if !axis_end.is_finite() {
        return (step, vec![0.0]);
    }

    let mut step = step;
    while axis_end / step >= MAX_TICKS as f64 {
        step *= 10.0;
    }
    let tick_count = (axis_end / step).floor() as usize;
    (step, (0..=tick_count).map(|i| i as f64 * step).collect())
}

pub fn chart(store: &TreeStore, scale: f64) -> GanttChart {
    let scale = if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        DEFAULT_SCALE
    };
    let max_time = max_time_ms(store.nodes());
    let (step, ticks) = axis_ticks(max_time, tick_step_ms(scale));

    let rows = ordered_nodes(store)
        .into_iter()
        .map(|(node, depth)| {
            let (left, width) = bar_geometry(node, scale, max_time);
            GanttRow {
                node: node.clone(),
                depth,
                left,
                width,
            }
        })
        .collect();

    GanttChart {
        rows,
        max_time_ms: max_time,
        scale,
        tick_step_ms: step,
        ticks,
    }
}
