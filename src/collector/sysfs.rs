//! Readers for single-value sysfs attributes.

use std::path::Path;
use std::str::FromStr;

use crate::collector::{CollectError, FileSystem};

/// Reads a sysfs attribute holding one value, such as
/// `/sys/class/net/eth0/statistics/rx_bytes` or
/// `/sys/class/thermal/thermal_zone0/temp`.
pub fn read_value<T, F>(fs: &F, path: &Path) -> Result<T, CollectError>
where
    T: FromStr,
    F: FileSystem + ?Sized,
{
    let content = fs
        .read_to_string(path)
        .map_err(|e| CollectError::io(path, e))?;
    let raw = content.trim_end_matches('\n').trim();
    raw.parse()
        .map_err(|_| CollectError::parse(path, format!("invalid value {:?}", raw)))
}
