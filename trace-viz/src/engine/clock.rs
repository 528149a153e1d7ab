//! Session-relative time origin.

/// Fixed to the timestamp of the first event a session ever sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockBaseline {
    origin_ns: Option<i64>,
}

impl ClockBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds between the baseline and `timestamp_ns`, fixing the
    /// baseline on first use. Any pair of readings is accepted, however far
    /// apart.
    pub fn offset_ms(&mut self, timestamp_ns: i64) -> f64 {
        let origin = *self.origin_ns.get_or_insert(timestamp_ns);
        (i128::from(timestamp_ns) - i128::from(origin)) as f64 / 1_000_000.0
    }

    pub fn origin_ns(&self) -> Option<i64> {
        self.origin_ns
    }
}
