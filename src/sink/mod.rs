//! Destinations for collected points.
//!
//! A [`Sink`] accepts one collector's batch per call. Sinks are shared by
//! every collector thread through an `Arc<dyn Sink>`, so implementations
//! must be `Send + Sync` and handle concurrent writes.

mod console;
mod influx;
pub mod line_protocol;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::point::MetricPoint;

pub use console::{ConsoleFormat, ConsoleSink};
pub use influx::InfluxSink;
pub use memory::MemorySink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sink rejected write: status={status}, body={body}")]
    Status { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait Sink: Send + Sync {
    /// Writes one batch. Implementations may ignore an empty batch.
    fn write(&self, points: &[MetricPoint]) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        (**self).write(points)
    }
}

/// How many times a failed write is attempted, and how long to wait between
/// attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    /// A single attempt; writes are best-effort.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `retries` extra attempts after the first one.
    pub fn with_retries(retries: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            backoff,
        }
    }
}

/// A sink paired with its retry policy.
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn Sink>,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(sink: Arc<dyn Sink>, retry: RetryPolicy) -> Self {
        Self { sink, retry }
    }

    /// Writes `points`, retrying per policy. Returns the last error once
    /// every attempt failed.
    pub fn publish(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.sink.write(points) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(
                        "write attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, attempts, e, self.retry.backoff
                    );
                    std::thread::sleep(self.retry.backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointBuilder;
    use chrono::Utc;

    fn points() -> Vec<MetricPoint> {
        vec![
            PointBuilder::new("temperature_stats")
                .field("temperature", 48.3)
                .build(Utc::now())
                .unwrap(),
        ]
    }

    #[test]
    fn test_default_policy_is_single_attempt() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next(1);
        let publisher = Publisher::new(sink.clone(), RetryPolicy::default());

        assert!(publisher.publish(&points()).is_err());
        assert_eq!(sink.write_calls(), 1);
        assert!(sink.points().is_empty());
    }

    #[test]
    fn test_retry_until_success() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next(2);
        let publisher = Publisher::new(
            sink.clone(),
            RetryPolicy::with_retries(3, Duration::from_millis(1)),
        );

        publisher.publish(&points()).unwrap();
        assert_eq!(sink.write_calls(), 3);
        assert_eq!(sink.points().len(), 1);
    }

    #[test]
    fn test_retry_gives_up() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next(10);
        let publisher = Publisher::new(
            sink.clone(),
            RetryPolicy::with_retries(2, Duration::from_millis(1)),
        );

        let err = publisher.publish(&points()).unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 503, .. }));
        assert_eq!(sink.write_calls(), 3);
    }

    #[test]
    fn test_with_retries() {
        assert_eq!(RetryPolicy::with_retries(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::with_retries(4, Duration::ZERO).max_attempts, 5);
        assert_eq!(
            RetryPolicy::with_retries(u32::MAX, Duration::ZERO).max_attempts,
            u32::MAX
        );
    }
}
