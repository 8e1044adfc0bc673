//! Snapshot assembler.
//!
//! The `Collector` owns every counter source, the battery aggregator and the
//! rate engine state, and turns one poll into the two persisted records.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, warn};

use crate::collector::battery::{BatteryAggregator, CancelToken, default_report_path};
use crate::collector::error::DeviceIdError;
use crate::collector::procfs::{DiskIoCollector, ProcessIoCollector};
use crate::collector::traits::{Clock, CommandRunner, FileSystem, PowerStatusApi, SystemClock};
use crate::collector::usage::DiskUsageCollector;
use crate::rates::{RateEngine, RateSample, StreamKey, collect_write_deltas};
use crate::storage::model::{BatteryRecord, DiskRecord};

/// Stable identity of the monitored host, attached to every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(String);

impl DeviceId {
    /// Surrounding whitespace is removed; nothing may remain empty.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DeviceIdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DeviceIdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the collector finds the host facilities it reads.
#[derive(Debug, Clone)]
pub struct CollectorPaths {
    /// Base path to proc filesystem (usually "/proc").
    pub proc_path: PathBuf,
    /// Base path to sysfs (usually "/sys").
    pub sys_path: PathBuf,
    /// Any path on the filesystem whose usage is reported.
    pub disk_mount: PathBuf,
    /// Battery report artifact.
    pub report_path: PathBuf,
}

impl Default for CollectorPaths {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            disk_mount: PathBuf::from(if cfg!(windows) { "C:\\" } else { "/" }),
            report_path: default_report_path(),
        }
    }
}

/// Timing information for each collector phase.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Whole disk record.
    pub disk_total: Duration,
    pub disk_usage: Duration,
    pub disk_io: Duration,
    pub processes: Duration,
    /// Whole battery record (all five sources).
    pub battery: Duration,
}

/// Produces disk and battery records, one pair per poll.
pub struct Collector<F, C, P>
where
    F: FileSystem + Clone,
    C: CommandRunner + Clone,
    P: PowerStatusApi + Clone,
{
    device_id: DeviceId,
    clock: Box<dyn Clock>,
    cancel: CancelToken,
    usage: DiskUsageCollector<F>,
    disk_io: DiskIoCollector<F>,
    processes: ProcessIoCollector<F>,
    battery: BatteryAggregator<F, C, P>,
    rates: RateEngine<StreamKey>,
    last_timestamp: Option<DateTime<Utc>>,
    last_timing: CollectorTiming,
}

impl<F, C, P> Collector<F, C, P>
where
    F: FileSystem + Clone,
    C: CommandRunner + Clone,
    P: PowerStatusApi + Clone,
{
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `commands` - Runner for the external battery tools
    /// * `power` - Native power-status API
    /// * `device_id` - Identity stamped on every record
    /// * `paths` - Host facility locations
    pub fn new(fs: F, commands: C, power: P, device_id: DeviceId, paths: CollectorPaths) -> Self {
        Self {
            device_id,
            clock: Box::new(SystemClock),
            cancel: CancelToken::new(),
            usage: DiskUsageCollector::new(fs.clone(), paths.disk_mount),
            disk_io: DiskIoCollector::new(fs.clone(), &paths.proc_path, &paths.sys_path),
            processes: ProcessIoCollector::new(fs.clone(), &paths.proc_path),
            battery: BatteryAggregator::new(fs, commands, power, paths.sys_path, paths.report_path),
            rates: RateEngine::new(),
            last_timestamp: None,
            last_timing: CollectorTiming::default(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares a shutdown flag with the battery aggregator.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn disk_mount(&self) -> &Path {
        self.usage.mount()
    }

    pub fn report_path(&self) -> &Path {
        self.battery.report_path()
    }

    /// Number of counter streams with a stored baseline.
    pub fn tracked_streams(&self) -> usize {
        self.rates.len()
    }

    /// Returns timing information from the last collect calls.
    pub fn last_timing(&self) -> &CollectorTiming {
        &self.last_timing
    }

    /// Current time, never earlier than the previous record's timestamp.
    fn now(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        let stamped = match self.last_timestamp {
            Some(last) if now < last => {
                warn!(%now, %last, "clock went backwards, reusing previous timestamp");
                last
            }
            _ => now,
        };
        self.last_timestamp = Some(stamped);
        stamped
    }

    /// Collects disk usage, disk I/O rates and per-process write deltas.
    ///
    /// Never fails: a source that cannot be read yields `null` (or an empty
    /// list) in the record and a log line.
    pub fn collect_disk_record(&mut self) -> DiskRecord {
        let total_start = Instant::now();
        let timestamp = self.now();
        let captured_at = timestamp.timestamp_micros() as f64 / 1_000_000.0;

        let start = Instant::now();
        let disk_usage = match self.usage.collect() {
            Ok(usage) => Some(usage),
            Err(e) => {
                warn!(error = %e, "disk usage unavailable");
                None
            }
        };
        self.last_timing.disk_usage = start.elapsed();

        let start = Instant::now();
        let disk_io = match self.disk_io.collect() {
            Ok(counters) => self
                .rates
                .sample(StreamKey::DiskIo, RateSample::new(counters, captured_at)),
            Err(e) => {
                debug!(error = %e, "disk I/O counters unavailable");
                None
            }
        };
        self.last_timing.disk_io = start.elapsed();

        let start = Instant::now();
        let process_writes = match self.processes.collect() {
            Ok(processes) => collect_write_deltas(&mut self.rates, &processes, captured_at),
            Err(e) => {
                debug!(error = %e, "process I/O counters unavailable");
                Vec::new()
            }
        };
        self.last_timing.processes = start.elapsed();

        self.last_timing.disk_total = total_start.elapsed();

        DiskRecord {
            device_id: self.device_id.to_string(),
            timestamp,
            disk_usage,
            disk_io,
            process_writes,
        }
    }

    /// Queries every battery source into one record.
    ///
    /// The inner snapshot carries the local-offset capture time; the outer
    /// record carries unix seconds.
    pub fn collect_battery_record(&mut self) -> BatteryRecord {
        let start = Instant::now();
        let timestamp = self.now();
        let stamp = timestamp.with_timezone(&Local).fixed_offset();

        let battery_data = self.battery.aggregate(stamp, &self.cancel);
        self.last_timing.battery = start.elapsed();

        BatteryRecord {
            device_id: self.device_id.to_string(),
            timestamp: timestamp.timestamp(),
            battery_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{
        MockClock, MockCommands, MockFs, MockPowerStatus, proc_io_content,
    };
    use crate::storage::model::ProcessWriteDelta;
    use chrono::TimeDelta;

    type TestCollector = Collector<MockFs, MockCommands, MockPowerStatus>;

    const START: i64 = 1_760_788_800;

    fn paths() -> CollectorPaths {
        CollectorPaths {
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            disk_mount: PathBuf::from("/"),
            report_path: PathBuf::from("/tmp/battery_report_test.html"),
        }
    }

    fn collector(fs: MockFs, clock: &MockClock) -> TestCollector {
        Collector::new(
            fs,
            MockCommands::new(),
            MockPowerStatus::unsupported(),
            DeviceId::new("laptop-01").unwrap(),
            paths(),
        )
        .with_clock(Box::new(clock.clone()))
    }

    /// Diskstats with one whole disk `sda` and its partition.
    fn diskstats(read_sectors: u64, reads: u64, write_sectors: u64, writes: u64) -> String {
        format!(
            "   8       0 sda {reads} 0 {read_sectors} 0 {writes} 0 {write_sectors} 0 0 0 0\n\
             8       1 sda1 1 0 1 0 1 0 1 0 0 0 0\n"
        )
    }

    #[test]
    fn test_device_id_validation() {
        assert_eq!(DeviceId::new("  host-a \n").unwrap().as_str(), "host-a");
        assert_eq!(DeviceId::new(""), Err(DeviceIdError::Empty));
        assert_eq!(DeviceId::new(" \t "), Err(DeviceIdError::Empty));
    }

    #[test]
    fn test_first_disk_record_has_no_rates() {
        let clock = MockClock::at_unix(START);
        let mut collector = collector(MockFs::typical_system(), &clock);

        let record = collector.collect_disk_record();

        assert_eq!(record.device_id, "laptop-01");
        assert_eq!(record.timestamp.timestamp(), START);
        assert!(record.disk_io.is_none());
        assert!(record.process_writes.is_empty());
        assert_eq!(record.disk_usage.unwrap().used_bytes, 300_000_000_000);
        // DiskIo plus three processes with readable io.
        assert_eq!(collector.tracked_streams(), 4);
    }

    #[test]
    fn test_second_disk_record_has_rates_and_writes() {
        let fs = MockFs::new();
        fs.add_dir("/sys/block/sda");
        fs.add_mount("/", 1000, 400);
        fs.add_file("/proc/diskstats", diskstats(10, 1, 20, 2));
        fs.add_process(42, "writer", 500, &proc_io_content(0, 100, 0, 0));

        let clock = MockClock::at_unix(START);
        let mut collector = collector(fs.clone(), &clock);
        collector.collect_disk_record();

        clock.advance(TimeDelta::seconds(2));
        fs.add_file("/proc/diskstats", diskstats(10 + 4, 1 + 10, 20 + 8, 2 + 6));
        fs.set_process_writes(42, 150);

        let record = collector.collect_disk_record();
        let rates = record.disk_io.unwrap();
        assert_eq!(rates.read_bytes_per_sec, 4.0 * 512.0 / 2.0);
        assert_eq!(rates.write_bytes_per_sec, 8.0 * 512.0 / 2.0);
        assert_eq!(rates.read_ops_per_sec, 5.0);
        assert_eq!(rates.write_ops_per_sec, 3.0);
        assert_eq!(
            record.process_writes,
            vec![ProcessWriteDelta {
                pid: 42,
                process_name: "writer".to_string(),
                write_bytes_delta: 50,
            }]
        );

        clock.advance(TimeDelta::seconds(2));
        fs.set_process_writes(42, 120);
        let record = collector.collect_disk_record();
        assert!(record.process_writes.is_empty());
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let fs = MockFs::typical_system();
        let clock = MockClock::at_unix(START);
        let mut collector = collector(fs, &clock);

        let first = collector.collect_disk_record();
        clock.advance(TimeDelta::seconds(-30));
        let second = collector.collect_disk_record();

        assert_eq!(second.timestamp, first.timestamp);
        // Zero interval: no rate, baseline kept.
        assert!(second.disk_io.is_none());

        clock.set(first.timestamp + TimeDelta::seconds(10));
        let third = collector.collect_disk_record();
        assert!(third.disk_io.is_some());

        let battery = collector.collect_battery_record();
        assert_eq!(battery.timestamp, third.timestamp.timestamp());
    }

    #[test]
    fn test_vanished_process_streams_are_dropped() {
        let fs = MockFs::typical_system();
        let clock = MockClock::at_unix(START);
        let mut collector = collector(fs.clone(), &clock);

        collector.collect_disk_record();
        assert_eq!(collector.tracked_streams(), 4);

        fs.remove("/proc/1001");
        clock.advance(TimeDelta::seconds(60));
        collector.collect_disk_record();
        assert_eq!(collector.tracked_streams(), 3);
    }

    #[test]
    fn test_host_without_procfs() {
        let clock = MockClock::at_unix(START);
        let mut collector = collector(MockFs::new(), &clock);

        for _ in 0..2 {
            let record = collector.collect_disk_record();
            assert!(record.disk_usage.is_none());
            assert!(record.disk_io.is_none());
            assert!(record.process_writes.is_empty());
            clock.advance(TimeDelta::seconds(60));
        }
    }

    #[test]
    fn test_battery_record() {
        let fs = MockFs::typical_system();
        let commands = MockCommands::windows_laptop(&fs, "/tmp/battery_report_test.html");
        let clock = MockClock::at_unix(START);
        let mut collector = Collector::new(
            fs,
            commands,
            MockPowerStatus::on_battery(),
            DeviceId::new("laptop-01").unwrap(),
            paths(),
        )
        .with_clock(Box::new(clock.clone()));

        let record = collector.collect_battery_record();

        assert_eq!(record.device_id, "laptop-01");
        assert_eq!(record.timestamp, START);
        assert_eq!(record.battery_data.timestamp.timestamp(), START);
        assert!(record.battery_data.availability().iter().all(|(_, ok)| *ok));
        assert_eq!(
            collector.report_path(),
            Path::new("/tmp/battery_report_test.html")
        );
    }

    #[test]
    fn test_cancelled_battery_record_keeps_all_keys() {
        let clock = MockClock::at_unix(START);
        let cancel = CancelToken::new();
        let mut collector = collector(MockFs::typical_system(), &clock).with_cancel(cancel.clone());
        cancel.cancel();

        let record = collector.collect_battery_record();
        for (name, available) in record.battery_data.availability() {
            assert!(!available, "{name}");
        }
    }
}
