//! Parsers for the Linux `/proc` filesystem.
//!
//! This module turns the text of `/proc/stat`, `/proc/diskstats` and
//! `/proc/meminfo` into typed records. The collectors own the reads.

pub mod parser;

pub use parser::{
    CpuCounters, CpuLoadSet, DISK_FIELDS, DiskStats, MemoryStats, ParseError, normalize_diskstats_line,
    parse_cpu_stat, parse_diskstats, parse_diskstats_line, parse_meminfo, parse_meminfo_line,
};
