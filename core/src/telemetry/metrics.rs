use serde::Serialize;
use std::sync::Mutex;

use crate::prelude::lock;

/// Frame counters shared between the processing path and the transmitter.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub suppressed: u64,
    pub staged: u64,
    pub superseded: u64,
    pub sent: u64,
    pub send_failures: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_received(&self) {
        lock(&self.inner).received += 1;
    }

    pub fn record_rejected(&self) {
        lock(&self.inner).rejected += 1;
    }

    pub fn record_suppressed(&self) {
        lock(&self.inner).suppressed += 1;
    }

    /// Counts a staged frame, and whether it replaced one never sent.
    pub fn record_staged(&self, superseded: bool) {
        let mut metrics = lock(&self.inner);
        metrics.staged += 1;
        if superseded {
            metrics.superseded += 1;
        }
    }

    pub fn record_sent(&self) {
        lock(&self.inner).sent += 1;
    }

    pub fn record_send_failure(&self) {
        lock(&self.inner).send_failures += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *lock(&self.inner)
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
