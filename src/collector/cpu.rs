//! CPU utilization from successive `/proc/stat` snapshots.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::collector::procfs::{CpuCounters, CpuLoadSet, parse_cpu_stat};
use crate::collector::{CollectError, Collector, FileSystem};
use crate::identity::HostIdentity;
use crate::point::MetricPoint;

pub const CPU_MEASUREMENT: &str = "cpu_load";

/// Outcome of comparing one line of two snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Utilization {
    /// Fraction of elapsed ticks spent busy, in `[0, 1]`.
    Busy(f64),
    /// No ticks elapsed between the snapshots.
    NoTicks,
    /// A counter decreased: wraparound or reset.
    CounterWentBackwards,
}

impl Utilization {
    pub fn value(self) -> Option<f64> {
        match self {
            Utilization::Busy(v) => Some(v),
            _ => None,
        }
    }
}

/// Utilization of one line between `prev` and `curr`.
///
/// ```text
/// total = idle + iowait + user + nice + system + irq + softirq + steal
/// busy  = (Δtotal - Δ(idle + iowait)) / Δtotal
/// ```
pub fn core_utilization(prev: &CpuCounters, curr: &CpuCounters) -> Utilization {
    let prev_idle = prev.idle_total();
    let idle = curr.idle_total();
    let prev_total = prev_idle.saturating_add(prev.busy_total());
    let total = idle.saturating_add(curr.busy_total());

    let (Some(total_delta), Some(idle_delta)) =
        (total.checked_sub(prev_total), idle.checked_sub(prev_idle))
    else {
        return Utilization::CounterWentBackwards;
    };
    if total_delta == 0 {
        return Utilization::NoTicks;
    }
    if idle_delta > total_delta {
        // Only possible if a busy counter went backwards.
        return Utilization::CounterWentBackwards;
    }

    Utilization::Busy((total_delta - idle_delta) as f64 / total_delta as f64)
}

/// Utilization per line of `curr`, paired with the `prev` line of the same
/// label.
///
/// A core that went offline has no line in `curr` and yields nothing; a core
/// that came online has no baseline yet and yields nothing until next time.
pub fn cpu_utilization(prev: &CpuLoadSet, curr: &CpuLoadSet) -> Vec<(Option<u32>, Utilization)> {
    if prev.len() != curr.len() {
        warn!(
            "cpu count changed from {} to {}, comparing cores present in both",
            prev.len().saturating_sub(1),
            curr.len().saturating_sub(1)
        );
    }
    curr.cores
        .iter()
        .filter_map(|c| {
            let Some(p) = prev.get(c.cpu_id) else {
                debug!("{}: no baseline yet", cpu_field_name(c.cpu_id));
                return None;
            };
            Some((c.cpu_id, core_utilization(p, c)))
        })
        .collect()
}

/// Field name for a line: `cpu` for the aggregate, `cpu_N` for core N.
pub fn cpu_field_name(cpu_id: Option<u32>) -> String {
    match cpu_id {
        None => "cpu".to_string(),
        Some(n) => format!("cpu_{}", n),
    }
}

/// Publishes `cpu_load` with one field per line of `/proc/stat`.
///
/// Keeps exactly one previous snapshot; the first successful read only sets
/// that baseline.
pub struct CpuCollector<F: FileSystem> {
    fs: F,
    stat_path: PathBuf,
    identity: HostIdentity,
    previous: Option<CpuLoadSet>,
}

impl<F: FileSystem> CpuCollector<F> {
    pub fn new(fs: F, proc_path: &str, identity: HostIdentity) -> Self {
        Self {
            fs,
            stat_path: PathBuf::from(format!("{}/stat", proc_path)),
            identity,
            previous: None,
        }
    }

    fn read(&self) -> Result<CpuLoadSet, CollectError> {
        let content = self
            .fs
            .read_to_string(&self.stat_path)
            .map_err(|e| CollectError::io(&self.stat_path, e))?;
        parse_cpu_stat(&content).map_err(|e| CollectError::parse(&self.stat_path, e.message))
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

impl<F: FileSystem> Collector for CpuCollector<F> {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn prime(&mut self) {
        match self.read() {
            Ok(set) => self.previous = Some(set),
            Err(e) => warn!("cpu baseline not taken, will retry on first tick: {}", e),
        }
    }

    fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
        let current = self.read()?;
        let Some(previous) = self.previous.take() else {
            debug!("cpu baseline taken");
            self.previous = Some(current);
            return Ok(Vec::new());
        };
        let utilization = cpu_utilization(&previous, &current);
        self.previous = Some(current);

        let mut builder = MetricPoint::builder(CPU_MEASUREMENT, &self.identity);
        for (cpu_id, utilization) in utilization {
            let name = cpu_field_name(cpu_id);
            match utilization {
                Utilization::Busy(v) => builder = builder.field(name, v),
                Utilization::NoTicks => debug!("{}: no ticks elapsed", name),
                Utilization::CounterWentBackwards => {
                    warn!("{}: counters went backwards, no value", name)
                }
            }
        }

        Ok(builder.build(now).into_iter().collect())
    }
}
