//! In-memory sink that records every batch. Used by tests and embedders.

use std::sync::Mutex;

use super::{Sink, SinkError};
use crate::point::MetricPoint;

#[derive(Debug, Default)]
struct State {
    points: Vec<MetricPoint>,
    write_calls: usize,
    failures_left: usize,
}

/// Records written points; can be told to reject the next writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<State>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` writes fail with a 503 status.
    pub fn fail_next(&self, n: usize) {
        self.lock().failures_left = n;
    }

    /// Every point accepted so far, in write order.
    pub fn points(&self) -> Vec<MetricPoint> {
        self.lock().points.clone()
    }

    /// Accepted points of one measurement.
    pub fn points_for(&self, measurement: &str) -> Vec<MetricPoint> {
        self.lock()
            .points
            .iter()
            .filter(|p| p.measurement == measurement)
            .cloned()
            .collect()
    }

    /// Number of `write` calls, failed ones included.
    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for MemorySink {
    fn write(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.write_calls += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(SinkError::Status {
                status: 503,
                body: "injected failure".to_string(),
            });
        }
        state.points.extend_from_slice(points);
        Ok(())
    }
}
