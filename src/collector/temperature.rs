//! SoC temperature from a thermal zone.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::collector::sysfs::read_value;
use crate::collector::{CollectError, Collector, FileSystem};
use crate::identity::HostIdentity;
use crate::point::MetricPoint;

pub const TEMPERATURE_MEASUREMENT: &str = "temperature_stats";

pub struct TemperatureCollector<F: FileSystem> {
    fs: F,
    temp_path: PathBuf,
    identity: HostIdentity,
}

impl<F: FileSystem> TemperatureCollector<F> {
    pub fn new(fs: F, sys_path: &str, thermal_zone: &str, identity: HostIdentity) -> Self {
        Self {
            fs,
            temp_path: PathBuf::from(format!("{}/class/thermal/{}/temp", sys_path, thermal_zone)),
            identity,
        }
    }

    /// Current reading in degrees Celsius. The kernel reports millidegrees.
    pub fn read_celsius(&self) -> Result<f64, CollectError> {
        let millidegrees: f64 = read_value(&self.fs, &self.temp_path)?;
        Ok(millidegrees / 1000.0)
    }
}

impl<F: FileSystem> Collector for TemperatureCollector<F> {
    fn name(&self) -> &'static str {
        "temperature"
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        let celsius = self.read_celsius()?;
        let point = MetricPoint::builder(TEMPERATURE_MEASUREMENT, &self.identity)
            .field("temperature", celsius)
            .build(now)
            .ok_or_else(|| CollectError::parse(&self.temp_path, "reading is not finite"))?;
        Ok(vec![point])
    }
}
