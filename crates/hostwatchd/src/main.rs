//! hostwatchd - Battery and disk telemetry agent.
//!
//! Polls disk usage, disk I/O rates, per-process write activity and every
//! available battery source on a fixed interval, appending one JSON line per
//! record to two log files.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sysinfo::System;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hostwatch_core::collector::{
    CancelToken, Collector, CollectorPaths, DeviceId, NativePowerStatus, RealCommandRunner,
    RealFs, default_report_path,
};
use hostwatch_core::storage::JsonlSink;
use hostwatch_core::storage::model::{BatteryRecord, DiskRecord};

/// Battery and disk telemetry agent.
#[derive(Parser)]
#[command(name = "hostwatchd", about = "Battery and disk telemetry agent", version)]
struct Args {
    /// Poll interval in seconds.
    #[arg(short, long, env = "HOSTWATCH_INTERVAL", default_value = "60",
          value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Identity stamped on every record. Defaults to the host name.
    #[arg(long, env = "HOSTWATCH_DEVICE_ID")]
    device_id: Option<String>,

    /// Path on the filesystem whose usage is reported ("/" or "C:\" by default).
    #[arg(long, env = "HOSTWATCH_DISK_MOUNT")]
    disk_mount: Option<PathBuf>,

    /// Disk telemetry log.
    #[arg(long, env = "HOSTWATCH_DISK_LOG", default_value = "./data/disk_telemetry.jsonl")]
    disk_log: PathBuf,

    /// Battery telemetry log.
    #[arg(long, env = "HOSTWATCH_BATTERY_LOG", default_value = "./data/battery_telemetry.jsonl")]
    battery_log: PathBuf,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Where the battery report artifact is written. Defaults to a
    /// per-process file in the temp directory.
    #[arg(long, env = "HOSTWATCH_REPORT_PATH")]
    report_path: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hostwatchd", "hostwatch_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Formats bytes as human-readable size string.
fn format_size(bytes: f64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;

    let abs = bytes.abs();
    if abs >= GB {
        format!("{:.1}G", bytes / GB)
    } else if abs >= MB {
        format!("{:.1}M", bytes / MB)
    } else if abs >= KB {
        format!("{:.1}K", bytes / KB)
    } else {
        format!("{:.0}B", bytes)
    }
}

/// Describes a disk record for logging.
fn describe_disk_record(record: &DiskRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    match &record.disk_usage {
        Some(usage) if usage.total_bytes > 0 => parts.push(format!(
            "{:.1}% of {} used",
            usage.used_bytes as f64 * 100.0 / usage.total_bytes as f64,
            format_size(usage.total_bytes as f64)
        )),
        Some(_) => parts.push("empty filesystem".to_string()),
        None => parts.push("usage n/a".to_string()),
    }

    match &record.disk_io {
        Some(io) => parts.push(format!(
            "read {}/s, write {}/s",
            format_size(io.read_bytes_per_sec),
            format_size(io.write_bytes_per_sec)
        )),
        None => parts.push("no I/O rate yet".to_string()),
    }

    parts.push(format!("{} writing processes", record.process_writes.len()));

    parts.join(", ")
}

/// Describes a battery record for logging: which sources answered.
fn describe_battery_record(record: &BatteryRecord) -> String {
    let available: Vec<&str> = record
        .battery_data
        .availability()
        .iter()
        .filter(|(_, ok)| *ok)
        .map(|(name, _)| *name)
        .collect();

    if available.is_empty() {
        return "0/5 sources".to_string();
    }
    format!("{}/5 sources ({})", available.len(), available.join(", "))
}

fn remove_report(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed battery report {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove battery report {}: {}", path.display(), e),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let raw_device_id = args.device_id.clone().or_else(System::host_name);
    let device_id = match raw_device_id.as_deref().map(DeviceId::new) {
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            error!("Invalid device id: {}", e);
            return ExitCode::FAILURE;
        }
        None => {
            error!("No host name available; set --device-id or HOSTWATCH_DEVICE_ID");
            return ExitCode::FAILURE;
        }
    };

    let defaults = CollectorPaths::default();
    let paths = CollectorPaths {
        proc_path: args.proc_path.clone(),
        sys_path: args.sys_path.clone(),
        disk_mount: args.disk_mount.clone().unwrap_or(defaults.disk_mount),
        report_path: args.report_path.clone().unwrap_or_else(default_report_path),
    };

    info!("hostwatchd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, device={}, disk={}, proc={}, sys={}",
        args.interval,
        device_id,
        paths.disk_mount.display(),
        paths.proc_path.display(),
        paths.sys_path.display()
    );

    if let Some(parent) = paths.report_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!("Cannot create report directory {}: {}", parent.display(), e);
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handler_token.cancel();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut collector = Collector::new(
        RealFs::new(),
        RealCommandRunner::new(),
        NativePowerStatus::new(),
        device_id,
        paths,
    )
    .with_cancel(cancel.clone());

    let disk_sink = JsonlSink::new(&args.disk_log);
    let battery_sink = JsonlSink::new(&args.battery_log);
    info!(
        "Writing disk records to {}, battery records to {}",
        disk_sink.path().display(),
        battery_sink.path().display()
    );

    let interval = Duration::from_secs(args.interval);
    let mut cycle: u64 = 0;

    info!("Starting collection loop");

    while !cancel.is_cancelled() {
        cycle += 1;

        let disk = collector.collect_disk_record();
        info!("Disk #{}: {}", cycle, describe_disk_record(&disk));
        if let Err(e) = disk_sink.append(&disk) {
            error!("Failed to write disk record: {}", e);
        }

        let battery = collector.collect_battery_record();
        info!("Battery #{}: {}", cycle, describe_battery_record(&battery));
        if let Err(e) = battery_sink.append(&battery) {
            error!("Failed to write battery record: {}", e);
        }

        debug!(
            "Cycle timing: {:?}, tracked streams: {}",
            collector.last_timing(),
            collector.tracked_streams()
        );

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && !cancel.is_cancelled() {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
    remove_report(collector.report_path());
    info!("Shutdown complete");

    ExitCode::SUCCESS
}
