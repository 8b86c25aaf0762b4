//! Block device I/O counters from `/proc/diskstats`.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::PathBuf;

use crate::collector::procfs::{DISK_FIELDS, DiskStats, parse_diskstats};
use crate::collector::{CollectError, Collector, FileSystem};
use crate::identity::HostIdentity;
use crate::point::MetricPoint;

pub const DISK_MEASUREMENT: &str = "disk_stats";
pub const DEVICE_TAG: &str = "device_name";

/// Publishes one `disk_stats` point per device matching the filter.
pub struct DiskCollector<F: FileSystem> {
    fs: F,
    diskstats_path: PathBuf,
    identity: HostIdentity,
    filter: Regex,
}

impl<F: FileSystem> DiskCollector<F> {
    pub fn new(fs: F, proc_path: &str, identity: HostIdentity, filter: Regex) -> Self {
        Self {
            fs,
            diskstats_path: PathBuf::from(format!("{}/diskstats", proc_path)),
            identity,
            filter,
        }
    }

    fn point(&self, stats: &DiskStats, now: DateTime<Utc>) -> Option<MetricPoint> {
        DISK_FIELDS
            .iter()
            .zip(stats.counters())
            .fold(
                MetricPoint::builder(DISK_MEASUREMENT, &self.identity)
                    .tag(DEVICE_TAG, stats.device.as_str()),
                |builder, (name, value)| builder.field(*name, value),
            )
            .build(now)
    }
}

impl<F: FileSystem> Collector for DiskCollector<F> {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        let content = self
            .fs
            .read_to_string(&self.diskstats_path)
            .map_err(|e| CollectError::io(&self.diskstats_path, e))?;

        Ok(parse_diskstats(&content, &self.filter)
            .values()
            .filter_map(|stats| self.point(stats, now))
            .collect())
    }
}
