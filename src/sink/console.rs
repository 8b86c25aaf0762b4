//! Dry-run sink printing points instead of sending them.

use std::io::Write;
use std::sync::Mutex;

use clap::ValueEnum;

use super::{Sink, SinkError, line_protocol};
use crate::point::MetricPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConsoleFormat {
    /// InfluxDB line protocol, exactly as it would be posted.
    #[default]
    Line,
    /// One JSON object per point.
    Json,
}

pub struct ConsoleSink {
    format: ConsoleFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout(format: ConsoleFormat) -> Self {
        Self::with_writer(format, std::io::stdout())
    }

    pub fn with_writer(format: ConsoleFormat, writer: impl Write + Send + 'static) -> Self {
        Self {
            format,
            out: Mutex::new(Box::new(writer)),
        }
    }

    fn render(&self, points: &[MetricPoint]) -> Result<String, SinkError> {
        match self.format {
            ConsoleFormat::Line => Ok(line_protocol::encode_batch(points)),
            ConsoleFormat::Json => {
                let mut body = String::new();
                for point in points {
                    body.push_str(&serde_json::to_string(point)?);
                    body.push('\n');
                }
                Ok(body)
            }
        }
    }
}

impl Sink for ConsoleSink {
    fn write(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let body = self.render(points)?;
        // Whole batch under one lock so concurrent collectors do not interleave.
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        out.write_all(body.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointBuilder;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn point() -> MetricPoint {
        PointBuilder::new("temperature_stats")
            .tag("pi_name", "pi-b827eb123456")
            .field("temperature", 48.312)
            .build(Utc.timestamp_millis_opt(1_603_300_000_000).unwrap())
            .unwrap()
    }

    #[test]
    fn test_line_format() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::with_writer(ConsoleFormat::Line, buffer.clone());
        sink.write(&[point()]).unwrap();

        assert_eq!(
            buffer.contents(),
            "temperature_stats,pi_name=pi-b827eb123456 temperature=48.312 1603300000000\n"
        );
    }

    #[test]
    fn test_json_format() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::with_writer(ConsoleFormat::Json, buffer.clone());
        sink.write(&[point(), point()]).unwrap();

        let output = buffer.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["measurement"], "temperature_stats");
        assert_eq!(value["tags"]["pi_name"], "pi-b827eb123456");
        assert_eq!(value["fields"]["temperature"], 48.312);
        assert_eq!(value["timestamp"], 1_603_300_000_000i64);
    }
}
