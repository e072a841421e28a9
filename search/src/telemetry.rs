//! Per-operation counters and latency accumulators.
//!
//! Updates are short and serialize under one mutex; cancelled runs are
//! counted apart from failures.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// The six instrumented operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    SyncSearch,
    AsyncSearch,
    SyncSimilar,
    AsyncSimilar,
    SyncExplain,
    AsyncExplain,
}

impl OperationKind {
    const ALL: [OperationKind; 6] = [
        OperationKind::SyncSearch,
        OperationKind::AsyncSearch,
        OperationKind::SyncSimilar,
        OperationKind::AsyncSimilar,
        OperationKind::SyncExplain,
        OperationKind::AsyncExplain,
    ];

    fn slot(self) -> usize {
        match self {
            OperationKind::SyncSearch => 0,
            OperationKind::AsyncSearch => 1,
            OperationKind::SyncSimilar => 2,
            OperationKind::AsyncSimilar => 3,
            OperationKind::SyncExplain => 4,
            OperationKind::AsyncExplain => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct OpCounters {
    success: u64,
    cancelled: u64,
    failure: u64,
    latency_ns: u64,
}

#[derive(Debug)]
struct State {
    ops: [OpCounters; 6],
    cache_hit_count: u64,
    returned_item_count: u64,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Telemetry {
    state: Mutex<State>,
}

/// Counter snapshot for one operation kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationStats {
    pub kind: OperationKind,
    pub success: u64,
    pub cancelled: u64,
    pub failure: u64,
    /// Mean latency in milliseconds over every counted run of this kind.
    pub mean_latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub operations: Vec<OperationStats>,
    pub cache_hit_count: u64,
    pub returned_item_count: u64,
    pub started_at: DateTime<Utc>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                ops: [OpCounters::default(); 6],
                cache_hit_count: 0,
                returned_item_count: 0,
                started_at: Utc::now(),
            }),
        }
    }

    pub fn record_success(&self, kind: OperationKind, latency: Duration, returned: usize) {
        let mut state = self.state.lock().unwrap();
        let op = &mut state.ops[kind.slot()];
        op.success += 1;
        op.latency_ns = op.latency_ns.saturating_add(latency.as_nanos() as u64);
        state.returned_item_count += returned as u64;
    }

    pub fn record_cancelled(&self, kind: OperationKind, latency: Duration) {
        let mut state = self.state.lock().unwrap();
        let op = &mut state.ops[kind.slot()];
        op.cancelled += 1;
        op.latency_ns = op.latency_ns.saturating_add(latency.as_nanos() as u64);
    }

    pub fn record_failure(&self, kind: OperationKind, latency: Duration) {
        let mut state = self.state.lock().unwrap();
        let op = &mut state.ops[kind.slot()];
        op.failure += 1;
        op.latency_ns = op.latency_ns.saturating_add(latency.as_nanos() as u64);
    }

    pub fn record_cache_hit(&self) {
        self.state.lock().unwrap().cache_hit_count += 1;
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.state.lock().unwrap();
        let operations = OperationKind::ALL
            .iter()
            .map(|&kind| {
                let op = state.ops[kind.slot()];
                let runs = op.success + op.cancelled + op.failure;
                let mean_latency_ms = if runs == 0 {
                    0.0
                } else {
                    op.latency_ns as f64 / runs as f64 / 1_000_000.0
                };
                OperationStats {
                    kind,
                    success: op.success,
                    cancelled: op.cancelled,
                    failure: op.failure,
                    mean_latency_ms,
                }
            })
            .collect();
        TelemetrySnapshot {
            operations,
            cache_hit_count: state.cache_hit_count,
            returned_item_count: state.returned_item_count,
            started_at: state.started_at,
        }
    }

    /// Zero every counter and restart the observation window.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.ops = [OpCounters::default(); 6];
        state.cache_hit_count = 0;
        state.returned_item_count = 0;
        state.started_at = Utc::now();
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
