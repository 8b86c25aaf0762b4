//! Host metric collectors for a Raspberry Pi.
//!
//! Each collector owns one metric family, reads its kernel sources through a
//! [`FileSystem`], and turns one tick's reading into [`MetricPoint`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Collector (trait)                         │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────────┐  │
//! │  │   Cpu   │ │  Disk   │ │ Memory  │ │ Network │ │ Temperature │  │
//! │  │ /stat   │ │/diskstat│ │/meminfo │ │/sys/net │ │ /sys/thermal│  │
//! │  └────┬────┘ └────┬────┘ └────┬────┘ └────┬────┘ └──────┬──────┘  │
//! │       └─── procfs::parser ────┘      sysfs::read_value ─┘         │
//! │                            │                                     │
//! │                     ┌──────▼──────┐                              │
//! │                     │  FileSystem │ (trait)                      │
//! │                     └──────┬──────┘                              │
//! └────────────────────────────┼─────────────────────────────────────┘
//!                   ┌──────────┴──────────┐
//!            ┌──────▼──────┐       ┌──────▼──────┐
//!            │   RealFs    │       │   MockFs    │
//!            │ (Linux)     │       │ (Testing)   │
//!            └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use pi_reporter::collector::{Collector, MockFs, TemperatureCollector};
//! use pi_reporter::identity::HostIdentity;
//!
//! let fs = MockFs::raspberry_pi();
//! let mut collector =
//!     TemperatureCollector::new(fs, "/sys", "thermal_zone0", HostIdentity::new("pi-demo"));
//! let points = collector.collect(Utc::now()).unwrap();
//! assert_eq!(points[0].measurement, "temperature_stats");
//! ```

pub mod cpu;
pub mod disk;
mod error;
pub mod memory;
pub mod mock;
pub mod network;
pub mod procfs;
pub mod sysfs;
pub mod temperature;
pub mod traits;

use chrono::{DateTime, Utc};

use crate::point::MetricPoint;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use error::CollectError;
pub use memory::MemoryCollector;
pub use mock::MockFs;
pub use network::NetworkCollector;
pub use temperature::TemperatureCollector;
pub use traits::{FileSystem, RealFs};

/// One metric family, sampled once per tick by its own loop.
pub trait Collector: Send {
    /// Short family name (`"cpu"`, `"disk"`, ...) used in logs and thread names.
    fn name(&self) -> &'static str;

    /// Called once before the first tick. Collectors that derive values from
    /// deltas take their baseline here.
    fn prime(&mut self) {}

    /// Reads, parses and builds this tick's points.
    ///
    /// An empty vector means there was nothing to publish this tick.
    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError>;
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn prime(&mut self) {
        (**self).prime()
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        (**self).collect(now)
    }
}
