//! Memory statistics from `/proc/meminfo`, passed through verbatim.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::collector::procfs::parse_meminfo;
use crate::collector::{CollectError, Collector, FileSystem};
use crate::identity::HostIdentity;
use crate::point::MetricPoint;

pub const MEMORY_MEASUREMENT: &str = "memory_stats";

pub struct MemoryCollector<F: FileSystem> {
    fs: F,
    meminfo_path: PathBuf,
    identity: HostIdentity,
}

impl<F: FileSystem> MemoryCollector<F> {
    pub fn new(fs: F, proc_path: &str, identity: HostIdentity) -> Self {
        Self {
            fs,
            meminfo_path: PathBuf::from(format!("{}/meminfo", proc_path)),
            identity,
        }
    }
}

impl<F: FileSystem> Collector for MemoryCollector<F> {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        let content = self
            .fs
            .read_to_string(&self.meminfo_path)
            .map_err(|e| CollectError::io(&self.meminfo_path, e))?;

        let stats = parse_meminfo(&content);
        let point = stats
            .into_iter()
            .fold(
                MetricPoint::builder(MEMORY_MEASUREMENT, &self.identity),
                |builder, (name, value)| builder.field(name, value),
            )
            .build(now)
            .ok_or_else(|| CollectError::parse(&self.meminfo_path, "no entries"))?;

        Ok(vec![point])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;
    use crate::point::FieldValue;

    fn collector(fs: &MockFs) -> MemoryCollector<MockFs> {
        MemoryCollector::new(fs.clone(), "/proc", HostIdentity::new("pi-test"))
    }

    #[test]
    fn test_all_fields_published() {
        let fs = MockFs::raspberry_pi();
        let points = collector(&fs).collect(Utc::now()).unwrap();

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "memory_stats");
        assert_eq!(point.fields.len(), 22);
        assert_eq!(point.field("MemTotal"), Some(FieldValue::Integer(992964)));
        assert_eq!(point.field("Writeback"), Some(FieldValue::Integer(0)));
        assert_eq!(point.field("HugePages_Total"), Some(FieldValue::Integer(0)));
    }

    #[test]
    fn test_malformed_lines_do_not_abort() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 1024 kB\nnonsense\nMemFree: kB\n");

        let points = collector(&fs).collect(Utc::now()).unwrap();
        assert_eq!(points[0].fields.len(), 1);
        assert_eq!(points[0].field("MemTotal"), Some(FieldValue::Integer(1024)));
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "");
        assert!(matches!(
            collector(&fs).collect(Utc::now()),
            Err(CollectError::Parse { .. })
        ));

        fs.remove_file("/proc/meminfo");
        assert!(matches!(
            collector(&fs).collect(Utc::now()),
            Err(CollectError::Io { .. })
        ));
    }
}
