//! Bounded log of raw events in arrival order.

use std::collections::VecDeque;

use chrono::Utc;
use trace_types::{format_ms, EventKind, TimelineEntry, TraceEvent};

pub const DEFAULT_TIMELINE_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct Timeline {
    entries: VecDeque<TimelineEntry>,
    limit: usize,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DEFAULT_TIMELINE_LIMIT)
    }
}

impl Timeline {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Append `event`, evicting the oldest entry once the limit is reached.
    pub fn record(&mut self, event: &TraceEvent, offset_ms: f64) {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(TimelineEntry {
            event: event.clone(),
            offset_ms,
            time_offset: format!("+{}", format_ms(offset_ms, 1)),
            detail: detail(event),
            received_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn detail(event: &TraceEvent) -> String {
    match event.kind {
        EventKind::Started => "Started".to_string(),
        _ if event.duration_ms > 0.0 => format_ms(event.duration_ms, 1),
        _ => event.status.clone(),
    }
}
