//! pi-reporter - Raspberry Pi metrics agent.
//!
//! Samples CPU, disk, memory, network and temperature metrics and writes
//! them to InfluxDB until interrupted.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use pi_reporter::collector::RealFs;
use pi_reporter::config::{
    Config, ConfigError, DEFAULT_DISK_PATTERN, Environment, InfluxConfig, Intervals,
};
use pi_reporter::identity::HostIdentity;
use pi_reporter::reporter::Reporter;
use pi_reporter::shutdown::Shutdown;
use pi_reporter::sink::{ConsoleFormat, ConsoleSink, InfluxSink, RetryPolicy, Sink};

/// Raspberry Pi metrics agent.
#[derive(Parser, Debug)]
#[command(name = "pi-reporter", about = "Raspberry Pi metrics agent", version)]
struct Args {
    /// Target environment; selects the database.
    #[arg(short, long, value_enum, default_value = "dev", env = "PI_REPORTER_ENV")]
    env: Environment,

    /// InfluxDB host.
    #[arg(long, default_value = "localhost", env = "PI_REPORTER_INFLUX_HOST")]
    influx_host: String,

    /// InfluxDB HTTP port.
    #[arg(long, default_value = "8086", env = "PI_REPORTER_INFLUX_PORT")]
    influx_port: u16,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value = "10")]
    http_timeout: u64,

    /// Collection interval in seconds for every collector.
    #[arg(short, long, default_value = "30", env = "PI_REPORTER_INTERVAL")]
    interval: u64,

    /// Overrides --interval for the CPU collector.
    #[arg(long, value_name = "SECS")]
    cpu_interval: Option<u64>,

    /// Overrides --interval for the disk collector.
    #[arg(long, value_name = "SECS")]
    disk_interval: Option<u64>,

    /// Overrides --interval for the memory collector.
    #[arg(long, value_name = "SECS")]
    memory_interval: Option<u64>,

    /// Overrides --interval for the network collector.
    #[arg(long, value_name = "SECS")]
    network_interval: Option<u64>,

    /// Overrides --interval for the temperature collector.
    #[arg(long, value_name = "SECS")]
    temperature_interval: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// Thermal zone under <sys>/class/thermal.
    #[arg(long, default_value = "thermal_zone0")]
    thermal_zone: String,

    /// Regex selecting block devices by name.
    #[arg(long, default_value = DEFAULT_DISK_PATTERN, env = "PI_REPORTER_DISK_PATTERN")]
    disk_pattern: String,

    /// Network interfaces to report, comma separated. The first one also
    /// provides the host identity.
    #[arg(long, value_delimiter = ',', default_value = "eth0,wlan0", env = "PI_REPORTER_INTERFACES")]
    interfaces: Vec<String>,

    /// Host identity override (default: pi-<mac of first interface>).
    #[arg(long, env = "PI_REPORTER_PI_NAME")]
    pi_name: Option<String>,

    /// Append logs to this file as well as stdout. Empty disables.
    #[arg(long, default_value = "/var/log/pi-reporter.log", env = "PI_REPORTER_LOG_FILE")]
    log_file: String,

    /// Print points to stdout instead of writing to InfluxDB.
    #[arg(long)]
    dry_run: bool,

    /// Output format for --dry-run.
    #[arg(long, value_enum, default_value = "line")]
    format: ConsoleFormat,

    /// Extra attempts for a failed write. 0 disables retrying.
    #[arg(long, default_value = "0", env = "PI_REPORTER_RETRIES")]
    retries: u32,

    /// Delay between write attempts in milliseconds.
    #[arg(long, default_value = "1000")]
    retry_backoff_ms: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> Result<Config, ConfigError> {
        let every = Duration::from_secs(self.interval);
        let pick = |over: Option<u64>| over.map(Duration::from_secs).unwrap_or(every);

        let config = Config {
            proc_path: self.proc_path.clone(),
            sys_path: self.sys_path.clone(),
            thermal_zone: self.thermal_zone.clone(),
            interfaces: self
                .interfaces
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            intervals: Intervals {
                cpu: pick(self.cpu_interval),
                disk: pick(self.disk_interval),
                memory: pick(self.memory_interval),
                network: pick(self.network_interval),
                temperature: pick(self.temperature_interval),
            },
            retry: RetryPolicy::with_retries(
                self.retries,
                Duration::from_millis(self.retry_backoff_ms),
            ),
            ..Config::default()
        }
        .with_disk_pattern(&self.disk_pattern)?;

        config.validate()?;
        Ok(config)
    }

    fn influx(&self) -> InfluxConfig {
        let mut influx = InfluxConfig::new(self.influx_host.clone(), self.env);
        influx.port = self.influx_port;
        influx.timeout = Duration::from_secs(self.http_timeout);
        influx
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool, log_file: &str) -> Result<(), ConfigError> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pi_reporter={}", level).parse().unwrap());

    if log_file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|source| ConfigError::LogFile {
            path: PathBuf::from(log_file),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(Mutex::new(file)))
        .init();
    Ok(())
}

fn resolve_identity(args: &Args, config: &Config) -> Result<HostIdentity, ConfigError> {
    if let Some(name) = args.pi_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(HostIdentity::new(name));
    }
    // validate() guarantees at least one interface
    let interface = config.interfaces.first().map(String::as_str).unwrap_or("eth0");
    Ok(HostIdentity::from_interface(&RealFs::new(), &config.sys_path, interface)?)
}

fn build_sink(args: &Args) -> Result<Arc<dyn Sink>, ConfigError> {
    if args.dry_run {
        info!("Dry run: printing points to stdout ({:?})", args.format);
        return Ok(Arc::new(ConsoleSink::stdout(args.format)));
    }
    let influx = InfluxSink::new(&args.influx())?;
    info!("Writing to {} (db={})", influx.url(), args.env.database());
    Ok(Arc::new(influx))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.config()?;
    let identity = resolve_identity(&args, &config)?;
    let sink = build_sink(&args)?;

    info!("pi-reporter {} starting as {}", env!("CARGO_PKG_VERSION"), identity);
    info!(
        "Config: proc={}, sys={}, interfaces={}, disks={}, retries={}",
        config.proc_path,
        config.sys_path,
        config.interfaces.join(","),
        config.disk_filter.as_str(),
        args.retries
    );

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal.trigger();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let reporter = Reporter::new(config, identity, sink);
    let handle = reporter.spawn(RealFs::new(), &shutdown)?;
    handle.join();
    info!("Shutdown complete");
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.quiet, &args.log_file) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
