use crate::server::Server;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Running request statistics reported by the `/stats` endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    /// Arithmetic mean request latency in microseconds.
    pub average: u64,
}

/// Tracks a call count and running mean latency in O(1) memory.
#[derive(Clone, Default)]
pub struct StatsAggregator {
    stats: Arc<RwLock<Stats>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observed latency into the running mean. The read-modify-write
    /// of the (total, average) pair happens under a single write lock.
    pub async fn record(&self, elapsed: Duration) {
        let mut stats = self.stats.write().await;
        let micros = elapsed.as_micros() as u64;
        stats.average = (stats.average * stats.total + micros) / (stats.total + 1);
        stats.total += 1;
    }

    /// A self-consistent (total, average) pair. Before any `record` call
    /// this is `(0, 0)`.
    pub async fn snapshot(&self) -> Stats {
        *self.stats.read().await
    }
}

/// Middleware recording the latency of every completed request it wraps,
/// regardless of response status.
pub async fn track_request_latency(
    State(server): State<Server>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    server.stats.record(started.elapsed()).await;
    response
}
