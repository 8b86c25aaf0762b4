//! InfluxDB line protocol encoding.
//!
//! `measurement,tag=value field=value <ms timestamp>`, one point per line.

use std::fmt::Write;

use crate::point::{FieldValue, MetricPoint};

fn escape(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_measurement(out: &mut String, s: &str) {
    escape(out, s, &[',', ' ']);
}

fn escape_key(out: &mut String, s: &str) {
    escape(out, s, &[',', '=', ' ']);
}

/// Encodes one point without a trailing newline.
///
/// Returns `None` when the point has no finite field left to write.
pub fn encode_point(point: &MetricPoint) -> Option<String> {
    let mut fields = String::new();
    for (key, value) in &point.fields {
        let rendered = match value {
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::Float(v) if v.is_finite() => format!("{}", v),
            FieldValue::Float(_) => continue,
        };
        if !fields.is_empty() {
            fields.push(',');
        }
        escape_key(&mut fields, key);
        fields.push('=');
        fields.push_str(&rendered);
    }
    if fields.is_empty() {
        return None;
    }

    let mut line = String::new();
    escape_measurement(&mut line, &point.measurement);
    // Tags are already sorted by key, which is what InfluxDB prefers.
    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        escape_key(&mut line, key);
        line.push('=');
        escape_key(&mut line, value);
    }
    line.push(' ');
    line.push_str(&fields);
    let _ = write!(line, " {}", point.timestamp.timestamp_millis());

    Some(line)
}

/// Encodes a batch, one line per point, skipping points with no fields.
pub fn encode_batch(points: &[MetricPoint]) -> String {
    let mut body = String::new();
    for line in points.iter().filter_map(encode_point) {
        body.push_str(&line);
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointBuilder;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn ts() -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(1_603_300_000_250).unwrap()
    }

    #[test]
    fn test_encode_disk_point() {
        let point = PointBuilder::new("disk_stats")
            .tag("pi_name", "pi-b827eb123456")
            .tag("device_name", "mmcblk0")
            .field("read_ios", 287277u64)
            .field("in_flight", 0u64)
            .build(ts())
            .unwrap();

        assert_eq!(
            encode_point(&point).unwrap(),
            "disk_stats,device_name=mmcblk0,pi_name=pi-b827eb123456 in_flight=0i,read_ios=287277i 1603300000250"
        );
    }

    #[test]
    fn test_encode_floats() {
        let point = PointBuilder::new("cpu_load")
            .tag("pi_name", "pi-1")
            .field("cpu", 0.25)
            .field("cpu_0", 1.0)
            .build(ts())
            .unwrap();

        assert_eq!(
            encode_point(&point).unwrap(),
            "cpu_load,pi_name=pi-1 cpu=0.25,cpu_0=1 1603300000250"
        );
    }

    #[test]
    fn test_escaping() {
        let point = PointBuilder::new("my measure,x")
            .tag("tag key", "a=b,c")
            .field("Field Name", 1i64)
            .build(ts())
            .unwrap();

        assert_eq!(
            encode_point(&point).unwrap(),
            r"my\ measure\,x,tag\ key=a\=b\,c Field\ Name=1i 1603300000250"
        );
    }

    #[test]
    fn test_point_without_finite_fields_is_skipped() {
        let mut fields = BTreeMap::new();
        fields.insert("cpu".to_string(), FieldValue::Float(f64::NAN));
        let point = MetricPoint {
            measurement: "cpu_load".to_string(),
            tags: BTreeMap::new(),
            fields,
            timestamp: ts(),
        };

        assert_eq!(encode_point(&point), None);
        assert_eq!(encode_batch(&[point]), "");
    }

    #[test]
    fn test_encode_batch() {
        let a = PointBuilder::new("a").field("v", 1i64).build(ts()).unwrap();
        let b = PointBuilder::new("b").field("v", 2i64).build(ts()).unwrap();

        assert_eq!(
            encode_batch(&[a, b]),
            "a v=1i 1603300000250\nb v=2i 1603300000250\n"
        );
    }
}
