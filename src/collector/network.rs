//! Interface counters from `/sys/class/net/<if>/statistics`.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::collector::sysfs::read_value;
use crate::collector::{CollectError, Collector, FileSystem};
use crate::identity::HostIdentity;
use crate::point::MetricPoint;

pub const NETWORK_MEASUREMENT: &str = "network_stats";
pub const INTERFACE_TAG: &str = "if_name";

/// Counter files read from every interface's `statistics/` directory.
pub const NETWORK_COUNTERS: [&str; 24] = [
    "collisions",
    "rx_crc_errors",
    "rx_frame_errors",
    "rx_over_errors",
    "tx_carrier_errors",
    "tx_fifo_errors",
    "multicast",
    "rx_dropped",
    "rx_length_errors",
    "rx_packets",
    "tx_compressed",
    "tx_heartbeat_errors",
    "rx_bytes",
    "rx_errors",
    "rx_missed_errors",
    "tx_aborted_errors",
    "tx_dropped",
    "tx_packets",
    "rx_compressed",
    "rx_fifo_errors",
    "rx_nohandler",
    "tx_bytes",
    "tx_errors",
    "tx_window_errors",
];

/// Counters of one interface at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStats {
    pub name: String,
    /// Link speed in Mbit/s; `-1` when the link is down, `0` when unreadable.
    pub speed: i64,
    pub counters: BTreeMap<&'static str, u64>,
}

/// Publishes one `network_stats` point per configured interface.
pub struct NetworkCollector<F: FileSystem> {
    fs: F,
    net_path: PathBuf,
    identity: HostIdentity,
    interfaces: Vec<String>,
}

impl<F: FileSystem> NetworkCollector<F> {
    pub fn new(fs: F, sys_path: &str, identity: HostIdentity, interfaces: Vec<String>) -> Self {
        Self {
            fs,
            net_path: PathBuf::from(format!("{}/class/net", sys_path)),
            identity,
            interfaces,
        }
    }

    /// Reads every counter of `interface`.
    ///
    /// Individual files that cannot be read or parsed count as zero; only an
    /// unreadable `statistics/` directory fails the interface.
    pub fn read_interface(&self, interface: &str) -> Result<InterfaceStats, CollectError> {
        let base = self.net_path.join(interface);
        let stats_dir = base.join("statistics");
        self.fs
            .read_dir(&stats_dir)
            .map_err(|e| CollectError::io(&stats_dir, e))?;

        let speed = read_value::<i64, _>(&self.fs, &base.join("speed")).unwrap_or_else(|e| {
            debug!("{}: {}", interface, e);
            0
        });

        let counters = NETWORK_COUNTERS
            .iter()
            .map(|name| {
                let value = read_value::<u64, _>(&self.fs, &stats_dir.join(name)).unwrap_or_else(|e| {
                    debug!("{}: {}", interface, e);
                    0
                });
                (*name, value)
            })
            .collect();

        Ok(InterfaceStats {
            name: interface.to_string(),
            speed,
            counters,
        })
    }

    fn point(&self, stats: &InterfaceStats, now: DateTime<Utc>) -> Option<MetricPoint> {
        stats
            .counters
            .iter()
            .fold(
                MetricPoint::builder(NETWORK_MEASUREMENT, &self.identity)
                    .tag(INTERFACE_TAG, stats.name.as_str())
                    .field("speed", stats.speed),
                |builder, (name, value)| builder.field(*name, *value),
            )
            .build(now)
    }
}

impl<F: FileSystem> Collector for NetworkCollector<F> {
    fn name(&self) -> &'static str {
        "network"
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        let mut points = Vec::with_capacity(self.interfaces.len());
        for interface in &self.interfaces {
            match self.read_interface(interface) {
                Ok(stats) => points.extend(self.point(&stats, now)),
                Err(e) => warn!("skipping interface {}: {}", interface, e),
            }
        }
        Ok(points)
    }
}
