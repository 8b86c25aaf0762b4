//! The publishable unit handed to a sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::identity::{HostIdentity, PI_NAME_TAG};

/// A numeric field value.
///
/// Counters go out as integers so the sink stores them without precision
/// loss; derived values (utilization, temperature) as floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    /// Values above `i64::MAX` saturate; the sink has no unsigned type.
    fn from(v: u64) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// One timestamped, tagged set of named fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl MetricPoint {
    /// Starts a point for `measurement` tagged with the host identity.
    pub fn builder(measurement: &str, identity: &HostIdentity) -> PointBuilder {
        PointBuilder::new(measurement).tag(PI_NAME_TAG, identity.as_str())
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<FieldValue> {
        self.fields.get(key).copied()
    }
}

/// Assembles a [`MetricPoint`] from its parts.
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
}

impl PointBuilder {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds a field. NaN and infinite floats are dropped.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if let FieldValue::Float(f) = value
            && !f.is_finite()
        {
            return self;
        }
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Stamps the point. Returns `None` when no field survived, since a point
    /// without fields cannot be written.
    pub fn build(self, timestamp: DateTime<Utc>) -> Option<MetricPoint> {
        if self.fields.is_empty() {
            return None;
        }
        Some(MetricPoint {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
            timestamp,
        })
    }
}
