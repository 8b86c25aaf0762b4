//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of `/proc/stat`,
//! `/proc/diskstats` and `/proc/meminfo` into structured data. They are
//! designed to be easily testable with string inputs. Malformed lines are
//! skipped with a warning; only a source with nothing usable in it is an error.

use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============ CPU Stat Parser ============

/// Cumulative time-in-state counters of one `cpu` line in `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub cpu_id: Option<u32>, // None for aggregate "cpu" line
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuCounters {
    /// Builds aggregate-line counters from the ten values in `/proc/stat`
    /// column order.
    pub fn from_array(v: [u64; 10]) -> Self {
        Self {
            cpu_id: None,
            user: v[0],
            nice: v[1],
            system: v[2],
            idle: v[3],
            iowait: v[4],
            irq: v[5],
            softirq: v[6],
            steal: v[7],
            guest: v[8],
            guest_nice: v[9],
        }
    }

    /// Ticks spent idle, including waiting on I/O.
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Ticks spent doing work. Guest time is already folded into `user` and
    /// `nice` by the kernel, so it is not added again.
    pub fn busy_total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// All `cpu` lines of one `/proc/stat` read, in kernel order.
///
/// The aggregate line comes first. Offline cores have no line, so positions
/// are not stable across reads; match lines by `cpu_id` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuLoadSet {
    pub cores: Vec<CpuCounters>,
}

impl CpuLoadSet {
    /// The line labelled `cpu_id` (`None` for the aggregate).
    pub fn get(&self, cpu_id: Option<u32>) -> Option<&CpuCounters> {
        self.cores.iter().find(|c| c.cpu_id == cpu_id)
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}

/// Parses the `cpu` lines of `/proc/stat`.
///
/// The aggregate line reads `cpu  <user> ...` with two spaces after the
/// label; per-core lines read `cpuN <user> ...`.
pub fn parse_cpu_stat(content: &str) -> Result<CpuLoadSet, ParseError> {
    let mut set = CpuLoadSet::default();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        let Some(suffix) = label.strip_prefix("cpu") else {
            continue;
        };
        if !suffix.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let cpu_id = if suffix.is_empty() {
            None
        } else {
            match suffix.parse::<u32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("skipping /proc/stat line with bad cpu label: {:?}", line);
                    continue;
                }
            }
        };

        let mut values = [0u64; 10];
        let mut count = 0;
        let mut valid = true;
        for (slot, token) in values.iter_mut().zip(parts.by_ref()) {
            match token.parse() {
                Ok(v) => *slot = v,
                Err(_) => valid = false,
            }
            count += 1;
        }

        if !valid || count < values.len() {
            warn!("skipping malformed /proc/stat line: {:?}", line);
            continue;
        }
        set.cores.push(CpuCounters {
            cpu_id,
            ..CpuCounters::from_array(values)
        });
    }

    if set.is_empty() {
        return Err(ParseError::new("no cpu lines in stat"));
    }
    Ok(set)
}

// ============ Disk Stats Parser ============

/// Names of the counters published for each disk, in `/proc/diskstats`
/// column order (fields 4 through 20).
pub const DISK_FIELDS: [&str; 17] = [
    "read_ios",
    "read_merges",
    "read_sectors",
    "read_ticks",
    "write_ios",
    "write_merges",
    "write_sectors",
    "write_ticks",
    "in_flight",
    "io_ticks",
    "time_in_queue",
    "discard_ios",
    "discard_merges",
    "discard_sectors",
    "discard_ticks",
    "flush_success_count",
    "flushing_ticks",
];

/// Counters the oldest supported kernels print (no discard or flush groups).
const DISK_MIN_COUNTERS: usize = 11;

/// Parsed data for one block device in `/proc/diskstats`.
///
/// See Documentation/admin-guide/iostats.rst for field semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Device name (sda, mmcblk0, ...)
    pub device: String,
    /// Reads completed successfully
    pub read_ios: u64,
    pub read_merges: u64,
    pub read_sectors: u64,
    /// Time spent reading (ms)
    pub read_ticks: u64,
    /// Writes completed
    pub write_ios: u64,
    pub write_merges: u64,
    pub write_sectors: u64,
    /// Time spent writing (ms)
    pub write_ticks: u64,
    /// I/Os currently in progress
    pub in_flight: u64,
    /// Time spent doing I/Os (ms)
    pub io_ticks: u64,
    /// Weighted time spent doing I/Os (ms)
    pub time_in_queue: u64,
    pub discard_ios: u64,
    pub discard_merges: u64,
    pub discard_sectors: u64,
    /// Time spent discarding (ms)
    pub discard_ticks: u64,
    /// Flush requests completed successfully
    pub flush_success_count: u64,
    /// Time spent flushing (ms)
    pub flushing_ticks: u64,
}

impl DiskStats {
    /// Counter values in [`DISK_FIELDS`] order.
    pub fn counters(&self) -> [u64; 17] {
        [
            self.read_ios,
            self.read_merges,
            self.read_sectors,
            self.read_ticks,
            self.write_ios,
            self.write_merges,
            self.write_sectors,
            self.write_ticks,
            self.in_flight,
            self.io_ticks,
            self.time_in_queue,
            self.discard_ios,
            self.discard_merges,
            self.discard_sectors,
            self.discard_ticks,
            self.flush_success_count,
            self.flushing_ticks,
        ]
    }

    fn from_counters(device: &str, v: [u64; 17]) -> Self {
        Self {
            device: device.to_string(),
            read_ios: v[0],
            read_merges: v[1],
            read_sectors: v[2],
            read_ticks: v[3],
            write_ios: v[4],
            write_merges: v[5],
            write_sectors: v[6],
            write_ticks: v[7],
            in_flight: v[8],
            io_ticks: v[9],
            time_in_queue: v[10],
            discard_ios: v[11],
            discard_merges: v[12],
            discard_sectors: v[13],
            discard_ticks: v[14],
            flush_success_count: v[15],
            flushing_ticks: v[16],
        }
    }
}

/// Collapses the column padding of a `/proc/diskstats` line.
///
/// Leading and trailing whitespace is dropped and every interior run becomes
/// a single space, so `"   8       0 sda 1"` turns into `"8 0 sda 1"`.
pub fn normalize_diskstats_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the device name column of a normalized line.
fn diskstats_device(normalized: &str) -> Option<&str> {
    normalized.split(' ').nth(2)
}

/// Parses one normalized `/proc/diskstats` line.
///
/// Format: major minor name followed by 11, 15 or 17 counters depending on
/// the kernel version. Missing trailing groups read as zero.
pub fn parse_diskstats_line(normalized: &str) -> Result<DiskStats, ParseError> {
    let parts: Vec<&str> = normalized.split(' ').collect();
    let device = parts
        .get(2)
        .ok_or_else(|| ParseError::new("missing device name"))?;

    let counters = &parts[3..];
    if counters.len() < DISK_MIN_COUNTERS {
        return Err(ParseError::new(format!(
            "not enough fields for {}: expected {}+, got {}",
            device,
            DISK_MIN_COUNTERS,
            counters.len()
        )));
    }

    let mut values = [0u64; 17];
    for (i, (slot, token)) in values.iter_mut().zip(counters).enumerate() {
        *slot = token.parse().map_err(|_| {
            ParseError::new(format!("invalid {} for {}: {:?}", DISK_FIELDS[i], device, token))
        })?;
    }

    Ok(DiskStats::from_counters(device, values))
}

/// Parses `/proc/diskstats`, keeping only devices whose name matches `filter`.
///
/// The result is keyed by device name; if a device shows up twice the later
/// line wins.
pub fn parse_diskstats(content: &str, filter: &Regex) -> BTreeMap<String, DiskStats> {
    let mut disks = BTreeMap::new();

    for line in content.lines() {
        let normalized = normalize_diskstats_line(line);
        if normalized.is_empty() {
            continue;
        }

        let Some(device) = diskstats_device(&normalized) else {
            warn!("skipping malformed /proc/diskstats line: {:?}", line);
            continue;
        };
        if !filter.is_match(device) {
            continue;
        }

        match parse_diskstats_line(&normalized) {
            Ok(stats) => {
                disks.insert(stats.device.clone(), stats);
            }
            Err(e) => warn!("skipping /proc/diskstats line: {}", e.message),
        }
    }

    disks
}

// ============ Memory Info Parser ============

/// All entries of one `/proc/meminfo` read, in kB (or plain counts for the
/// unitless `HugePages_*` lines).
pub type MemoryStats = BTreeMap<String, u64>;

/// Splits one `/proc/meminfo` line into its field name and value.
///
/// The name is the text before the first colon, the value the last integer
/// token, ignoring a trailing unit such as `kB`. A line without a colon yields
/// an empty name; a line without an integer yields `None` for the value.
pub fn parse_meminfo_line(line: &str) -> (&str, Option<u64>) {
    let Some((field, rest)) = line.split_once(':') else {
        return ("", None);
    };

    let mut tokens = rest.split_whitespace().rev();
    let value = match tokens.next() {
        Some(last) => match last.parse() {
            Ok(v) => Some(v),
            Err(_) => tokens.next().and_then(|t| t.parse().ok()),
        },
        None => None,
    };

    (field.trim(), value)
}

/// Parses every entry of `/proc/meminfo`.
pub fn parse_meminfo(content: &str) -> MemoryStats {
    let mut stats = MemoryStats::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (field, value) = parse_meminfo_line(line);
        if field.is_empty() {
            warn!("could not find field in /proc/meminfo line {:?}", line);
            continue;
        }
        let Some(value) = value else {
            warn!("could not parse value in /proc/meminfo line {:?}", line);
            continue;
        };

        if stats.insert(field.to_string(), value).is_some() {
            warn!("field {} was already read, overwriting", field);
        }
    }

    stats
}
