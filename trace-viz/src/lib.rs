//! Trace Viz - live span tree aggregation behind an SSE server
//!
//! The engine folds span lifecycle events into a forest of spans with
//! counters, latency percentiles and layout geometry. A single session actor
//! owns the engine; the axum API feeds it and reads views back out.

pub mod actors;
pub mod api;
pub mod app_state;
pub mod config;
pub mod engine;
pub mod sse;
