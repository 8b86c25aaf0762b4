//! Runtime configuration shared read-only by every collector loop.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use regex::Regex;
use thiserror::Error;

use crate::collector::CollectError;
use crate::sink::{RetryPolicy, SinkError};

/// Whole SCSI/SD and MMC devices; partitions, ram and loop devices excluded.
pub const DEFAULT_DISK_PATTERN: &str = r"^(sd[a-z]+|mmcblk[0-9]+)$";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_INTERFACES: [&str; 2] = ["eth0", "wlan0"];
pub const DEFAULT_THERMAL_ZONE: &str = "thermal_zone0";
pub const DEFAULT_INFLUX_PORT: u16 = 8086;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid disk pattern '{pattern}': {source}")]
    DiskPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{0} interval must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("at least one network interface is required")]
    NoInterfaces,
    #[error("thermal zone must not be empty")]
    NoThermalZone,
    #[error("cannot determine host identity: {0}")]
    Identity(#[from] CollectError),
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create sink: {0}")]
    Sink(#[from] SinkError),
}

/// Deployment target; selects the database points are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn database(self) -> &'static str {
        match self {
            Environment::Dev => "pi_reporter_dev",
            Environment::Prod => "pi_reporter_prod",
        }
    }
}

/// Tick interval per collector family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub cpu: Duration,
    pub disk: Duration,
    pub memory: Duration,
    pub network: Duration,
    pub temperature: Duration,
}

impl Intervals {
    /// The same interval for every family.
    pub fn uniform(interval: Duration) -> Self {
        Self {
            cpu: interval,
            disk: interval,
            memory: interval,
            network: interval,
            temperature: interval,
        }
    }

    fn entries(&self) -> [(&'static str, Duration); 5] {
        [
            ("cpu", self.cpu),
            ("disk", self.disk),
            ("memory", self.memory),
            ("network", self.network),
            ("temperature", self.temperature),
        ]
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self::uniform(DEFAULT_INTERVAL)
    }
}

/// Where the InfluxDB sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub timeout: Duration,
}

impl InfluxConfig {
    pub fn new(host: impl Into<String>, environment: Environment) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_INFLUX_PORT,
            database: environment.database().to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// `http://<host>:<port>/write`
    pub fn write_url(&self) -> String {
        format!("http://{}:{}/write", self.host, self.port)
    }
}

/// Validated agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the proc filesystem, `/proc` on a real host.
    pub proc_path: String,
    /// Root of sysfs, `/sys` on a real host.
    pub sys_path: String,
    /// Directory name under `<sys>/class/thermal`.
    pub thermal_zone: String,
    pub interfaces: Vec<String>,
    pub disk_filter: Regex,
    pub intervals: Intervals,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_path: "/proc".to_string(),
            sys_path: "/sys".to_string(),
            thermal_zone: DEFAULT_THERMAL_ZONE.to_string(),
            interfaces: DEFAULT_INTERFACES.iter().map(|s| s.to_string()).collect(),
            disk_filter: default_disk_filter(),
            intervals: Intervals::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Compiles and installs a device-name filter.
    pub fn with_disk_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.disk_filter = compile_disk_pattern(pattern)?;
        Ok(self)
    }

    /// Checks the invariants the collector loops rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, _)) = self.intervals.entries().into_iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroInterval(name));
        }
        if self.interfaces.iter().all(|i| i.trim().is_empty()) {
            return Err(ConfigError::NoInterfaces);
        }
        if self.thermal_zone.trim().is_empty() {
            return Err(ConfigError::NoThermalZone);
        }
        Ok(())
    }
}

pub fn compile_disk_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::DiskPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn default_disk_filter() -> Regex {
    Regex::new(DEFAULT_DISK_PATTERN).expect("DEFAULT_DISK_PATTERN is a valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.proc_path, "/proc");
        assert_eq!(config.sys_path, "/sys");
        assert_eq!(config.interfaces, vec!["eth0", "wlan0"]);
        assert_eq!(config.intervals.cpu, Duration::from_secs(30));
        assert_eq!(config.intervals.temperature, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_disk_filter() {
        let filter = Config::default().disk_filter;
        for device in ["sda", "sdb", "mmcblk0", "mmcblk1"] {
            assert!(filter.is_match(device), "{device} should match");
        }
        for device in ["sda1", "mmcblk0p1", "mmcblk0boot0", "ram0", "loop3", "zram0"] {
            assert!(!filter.is_match(device), "{device} should not match");
        }
    }

    #[test]
    fn test_invalid_disk_pattern() {
        let err = Config::default().with_disk_pattern("sd[").unwrap_err();
        assert!(matches!(err, ConfigError::DiskPattern { .. }));
        assert!(err.to_string().contains("sd["));
    }

    #[test]
    fn test_custom_disk_pattern() {
        let config = Config::default().with_disk_pattern("^nvme0n1$").unwrap();
        assert!(config.disk_filter.is_match("nvme0n1"));
        assert!(!config.disk_filter.is_match("sda"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.intervals.disk = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroInterval("disk"))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_interfaces() {
        let mut config = Config::default();
        config.interfaces = vec![];
        assert!(matches!(config.validate(), Err(ConfigError::NoInterfaces)));

        config.interfaces = vec![" ".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::NoInterfaces)));
    }

    #[test]
    fn test_environment_database() {
        assert_eq!(Environment::Dev.database(), "pi_reporter_dev");
        assert_eq!(Environment::Prod.database(), "pi_reporter_prod");
    }

    #[test]
    fn test_influx_config() {
        let influx = InfluxConfig::new("influx.local", Environment::Prod);
        assert_eq!(influx.port, 8086);
        assert_eq!(influx.database, "pi_reporter_prod");
        assert_eq!(influx.timeout, Duration::from_secs(10));
        assert_eq!(influx.write_url(), "http://influx.local:8086/write");
    }
}
