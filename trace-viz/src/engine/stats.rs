//! Lifecycle counters and latency samples.
//!
//! Counters are maintained incrementally; latency summaries are recomputed
//! from the raw samples on every read so they always reflect the latest
//! completions.

use std::collections::{BTreeMap, HashMap};

use trace_types::{LatencyStats, TraceCounts, TraceStatus};

#[derive(Debug, Default, Clone)]
pub struct StatsAggregator {
    counts: TraceCounts,
    samples: Vec<f64>,
    samples_by_operation: HashMap<String, Vec<f64>>,
    /// Operations with at least one completion, in first-completion order
    operations: Vec<String>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> TraceCounts {
        self.counts
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    pub fn record_started(&mut self, is_unstructured: bool) {
        self.counts.running += 1;
        if is_unstructured {
            self.counts.unstructured += 1;
        }
    }

    /// Account for a terminal transition. `Running` means the status string
    /// was not recognised and leaves the counters untouched.
    pub fn record_finished(&mut self, status: TraceStatus, operation: &str, duration_ms: f64) {
        match status {
            TraceStatus::Running => return,
            TraceStatus::Completed => {
                self.counts.completed += 1;
                self.record_sample(operation, duration_ms);
            }
            TraceStatus::Failed => self.counts.failed += 1,
            TraceStatus::Cancelled => self.counts.cancelled += 1,
        }
        self.counts.running -= 1;
    }

    fn record_sample(&mut self, operation: &str, duration_ms: f64) {
        self.samples.push(duration_ms);
        match self.samples_by_operation.get_mut(operation) {
            Some(samples) => samples.push(duration_ms),
            None => {
                self.samples_by_operation
                    .insert(operation.to_string(), vec![duration_ms]);
                self.operations.push(operation.to_string());
            }
        }
    }

    /// Latency over all completions, or over one operation's completions.
    pub fn latency(&self, operation: Option<&str>) -> LatencyStats {
        match operation {
            None => summarize(&self.samples),
            Some(op) => self
                .samples_by_operation
                .get(op)
                .map(|samples| summarize(samples))
                .unwrap_or_default(),
        }
    }

    pub fn operation_stats(&self) -> BTreeMap<String, LatencyStats> {
        self.samples_by_operation
            .iter()
            .map(|(op, samples)| (op.clone(), summarize(samples)))
            .collect()
    }
}

/// Summary of an unsorted sample set. Empty input yields all zeros.
pub fn summarize(samples: &[f64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let count = sorted.len();

    LatencyStats {
        min: sorted[0],
        max: sorted[count - 1],
        mean: sorted.iter().sum::<f64>() / count as f64,
        p50: percentile(&sorted, 50.0),
        p90: percentile(&sorted, 90.0),
        p99: percentile(&sorted, 99.0),
        count,
    }
}

/// Linear-interpolation percentile over ascending `sorted` (R-7 / NumPy default).
pub fn percentile(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let index = (percentile / 100.0) * (n - 1) as f64;
            let floor = index.floor();
            let lower_idx = (floor as usize).min(n - 1);
            let upper_idx = (lower_idx + 1).min(n - 1);
            let lower = sorted[lower_idx];
            let upper = sorted[upper_idx];
            lower + (upper - lower) * (index - floor)
        }
    }
}
