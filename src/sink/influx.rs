//! InfluxDB 1.x HTTP write endpoint.

use reqwest::blocking::Client;
use tracing::debug;

use super::{Sink, SinkError, line_protocol};
use crate::config::InfluxConfig;
use crate::point::MetricPoint;

/// Posts line protocol to `/write?db=<db>&precision=ms`.
pub struct InfluxSink {
    client: Client,
    url: String,
    database: String,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.write_url(),
            database: config.database.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Sink for InfluxSink {
    fn write(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let body = line_protocol::encode_batch(points);
        if body.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .query(&[("db", self.database.as_str()), ("precision", "ms")])
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()?;

        let status = response.status();
        if status.is_success() {
            debug!("wrote {} points to {}", points.len(), self.database);
            return Ok(());
        }

        let body = response
            .text()
            .unwrap_or_else(|e| format!("[failed to read response body: {}]", e));
        Err(SinkError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}
