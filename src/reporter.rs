//! Scheduling: one thread and one fixed-rate loop per collector.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::collector::{
    Collector, CpuCollector, DiskCollector, FileSystem, MemoryCollector, NetworkCollector,
    TemperatureCollector,
};
use crate::config::Config;
use crate::identity::HostIdentity;
use crate::shutdown::Shutdown;
use crate::sink::{Publisher, Sink};

/// Runs one tick: collect, then publish whatever came out.
///
/// Neither a collection nor a write failure is propagated; both are logged
/// and the next tick proceeds normally.
pub fn run_tick<C: Collector + ?Sized>(collector: &mut C, publisher: &Publisher) {
    let name = collector.name();
    match collector.collect(Utc::now()) {
        Ok(points) if points.is_empty() => debug!("{}: nothing to publish", name),
        Ok(points) => match publisher.publish(&points) {
            Ok(()) => debug!("{}: published {} points", name, points.len()),
            Err(e) => warn!("{}: failed to publish {} points: {}", name, points.len(), e),
        },
        Err(e) => warn!("{}: skipping tick: {}", name, e),
    }
}

/// Drives `collector` until `shutdown` is triggered.
///
/// The collector is primed first; ticks then fire at `start + n * interval`.
/// A tick that overruns makes the loop skip the deadlines it missed instead
/// of firing them back to back. An in-flight tick always completes.
pub fn run_collector<C: Collector + ?Sized>(
    collector: &mut C,
    interval: Duration,
    publisher: &Publisher,
    shutdown: &Shutdown,
) {
    let interval = interval.max(Duration::from_millis(1));
    let name = collector.name();

    collector.prime();
    let mut deadline = Instant::now() + interval;
    debug!("{}: collecting every {:?}", name, interval);

    while shutdown.sleep_until(deadline) {
        run_tick(collector, publisher);

        deadline += interval;
        let now = Instant::now();
        if deadline <= now {
            let mut skipped = 0u32;
            while deadline <= now {
                deadline += interval;
                skipped += 1;
            }
            warn!("{}: tick overran, skipped {} deadline(s)", name, skipped);
        }
    }

    debug!("{}: stopped", name);
}

/// Builds the five collectors from one configuration and runs them.
pub struct Reporter {
    config: Config,
    identity: HostIdentity,
    publisher: Publisher,
}

impl Reporter {
    pub fn new(config: Config, identity: HostIdentity, sink: Arc<dyn Sink>) -> Self {
        let publisher = Publisher::new(sink, config.retry);
        Self {
            config,
            identity,
            publisher,
        }
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Every collector paired with its tick interval.
    pub fn collectors<F>(&self, fs: F) -> Vec<(Box<dyn Collector>, Duration)>
    where
        F: FileSystem + Clone + 'static,
    {
        let config = &self.config;
        let intervals = config.intervals;
        vec![
            (
                Box::new(CpuCollector::new(
                    fs.clone(),
                    &config.proc_path,
                    self.identity.clone(),
                )) as Box<dyn Collector>,
                intervals.cpu,
            ),
            (
                Box::new(DiskCollector::new(
                    fs.clone(),
                    &config.proc_path,
                    self.identity.clone(),
                    config.disk_filter.clone(),
                )) as Box<dyn Collector>,
                intervals.disk,
            ),
            (
                Box::new(MemoryCollector::new(
                    fs.clone(),
                    &config.proc_path,
                    self.identity.clone(),
                )) as Box<dyn Collector>,
                intervals.memory,
            ),
            (
                Box::new(NetworkCollector::new(
                    fs.clone(),
                    &config.sys_path,
                    self.identity.clone(),
                    config.interfaces.clone(),
                )) as Box<dyn Collector>,
                intervals.network,
            ),
            (
                Box::new(TemperatureCollector::new(
                    fs,
                    &config.sys_path,
                    &config.thermal_zone,
                    self.identity.clone(),
                )) as Box<dyn Collector>,
                intervals.temperature,
            ),
        ]
    }

    /// Starts one named thread per collector.
    ///
    /// If a thread cannot be spawned, the ones already running are stopped
    /// and joined before the error is returned.
    pub fn spawn<F>(&self, fs: F, shutdown: &Shutdown) -> std::io::Result<ReporterHandle>
    where
        F: FileSystem + Clone + 'static,
    {
        let mut threads = Vec::new();
        for (mut collector, interval) in self.collectors(fs) {
            let name = collector.name();
            let publisher = self.publisher.clone();
            let stop = shutdown.clone();
            let spawned = thread::Builder::new()
                .name(format!("collector-{}", name))
                .spawn(move || run_collector(&mut collector, interval, &publisher, &stop));

            match spawned {
                Ok(handle) => {
                    info!("{} collector started, interval {:?}", name, interval);
                    threads.push((name, handle));
                }
                Err(e) => {
                    error!("failed to start {} collector: {}", name, e);
                    shutdown.trigger();
                    ReporterHandle { threads }.join();
                    return Err(e);
                }
            }
        }
        Ok(ReporterHandle { threads })
    }
}

/// Running collector threads.
pub struct ReporterHandle {
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl ReporterHandle {
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Waits for every loop to return. Loops only return after the shutdown
    /// signal, so trigger it first.
    pub fn join(self) {
        for (name, handle) in self.threads {
            if handle.join().is_err() {
                error!("{} collector thread panicked", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectError, MockFs};
    use crate::point::{MetricPoint, PointBuilder};
    use crate::sink::{MemorySink, RetryPolicy};
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and returns a scripted result per tick.
    struct Scripted {
        primed: bool,
        ticks: Arc<AtomicUsize>,
        fail_on: Option<usize>,
        delay: Duration,
    }

    impl Scripted {
        fn new(ticks: Arc<AtomicUsize>) -> Self {
            Self {
                primed: false,
                ticks,
                fail_on: None,
                delay: Duration::ZERO,
            }
        }
    }

    impl Collector for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn prime(&mut self) {
            self.primed = true;
        }

        fn collect(&mut self, now: DateTime<Utc>) -> Result<Vec<MetricPoint>, CollectError> {
            assert!(self.primed, "collect before prime");
            let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            thread::sleep(self.delay);
            if self.fail_on == Some(n) {
                return Err(CollectError::parse("/proc/scripted", "scripted failure"));
            }
            Ok(PointBuilder::new("scripted")
                .field("tick", n as u64)
                .build(now)
                .into_iter()
                .collect())
        }
    }

    fn run_for(
        collector: Scripted,
        interval: Duration,
        sink: Arc<MemorySink>,
        retry: RetryPolicy,
        duration: Duration,
    ) {
        let shutdown = Shutdown::new();
        let stop = shutdown.clone();
        let publisher = Publisher::new(sink, retry);
        let handle = thread::spawn(move || {
            let mut collector = collector;
            run_collector(&mut collector, interval, &publisher, &stop);
        });
        thread::sleep(duration);
        shutdown.trigger();
        handle.join().unwrap();
    }

    #[test]
    fn test_loop_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        run_for(
            Scripted::new(ticks.clone()),
            Duration::from_millis(20),
            sink.clone(),
            RetryPolicy::default(),
            Duration::from_millis(250),
        );

        let n = ticks.load(Ordering::SeqCst);
        assert!(n >= 3, "only {n} ticks");
        assert_eq!(sink.points().len(), n);
    }

    #[test]
    fn test_collect_error_does_not_stop_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let mut collector = Scripted::new(ticks.clone());
        collector.fail_on = Some(1);
        run_for(
            collector,
            Duration::from_millis(20),
            sink.clone(),
            RetryPolicy::default(),
            Duration::from_millis(250),
        );

        let n = ticks.load(Ordering::SeqCst);
        assert!(n >= 3);
        assert_eq!(sink.points().len(), n - 1);
    }

    #[test]
    fn test_sink_error_does_not_stop_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        sink.fail_next(2);
        run_for(
            Scripted::new(ticks.clone()),
            Duration::from_millis(20),
            sink.clone(),
            RetryPolicy::default(),
            Duration::from_millis(250),
        );

        let n = ticks.load(Ordering::SeqCst);
        assert!(n >= 3);
        assert_eq!(sink.points().len(), n - 2);
    }

    #[test]
    fn test_overrun_skips_missed_deadlines() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let mut collector = Scripted::new(ticks.clone());
        collector.delay = Duration::from_millis(100);
        run_for(
            collector,
            Duration::from_millis(10),
            sink,
            RetryPolicy::default(),
            Duration::from_millis(350),
        );

        // Bursting would catch up to ~35 ticks; skipping keeps it near 3.
        let n = ticks.load(Ordering::SeqCst);
        assert!((1..=5).contains(&n), "{n} ticks");
    }

    #[test]
    fn test_shutdown_before_first_deadline() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        run_for(
            Scripted::new(ticks.clone()),
            Duration::from_secs(30),
            sink.clone(),
            RetryPolicy::default(),
            Duration::from_millis(50),
        );

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert_eq!(sink.write_calls(), 0);
    }

    #[test]
    fn test_collectors_from_config() {
        let sink = Arc::new(MemorySink::new());
        let reporter = Reporter::new(Config::default(), HostIdentity::new("pi-test"), sink);
        let names: Vec<_> = reporter
            .collectors(MockFs::raspberry_pi())
            .iter()
            .map(|(c, _)| c.name())
            .collect();

        assert_eq!(names, ["cpu", "disk", "memory", "network", "temperature"]);
    }

    #[test]
    fn test_spawn_and_join() {
        let mut config = Config::default();
        config.intervals = crate::config::Intervals::uniform(Duration::from_millis(20));
        let sink = Arc::new(MemorySink::new());
        let reporter = Reporter::new(config, HostIdentity::new("pi-test"), sink.clone());

        let shutdown = Shutdown::new();
        let handle = reporter.spawn(MockFs::raspberry_pi(), &shutdown).unwrap();
        assert_eq!(handle.len(), 5);

        thread::sleep(Duration::from_millis(200));
        shutdown.trigger();
        handle.join();

        assert!(!sink.points_for("memory_stats").is_empty());
        assert!(!sink.points_for("temperature_stats").is_empty());
        assert_eq!(sink.points_for("network_stats").len() % 2, 0);
    }
}
