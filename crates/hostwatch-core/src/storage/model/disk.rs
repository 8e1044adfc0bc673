//! Disk-side record: usage, I/O rates and per-process write activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity of the filesystem holding the configured mount path.
///
/// Source: `statvfs`-equivalent query through [`crate::collector::FileSystem::disk_space`].
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct DiskUsage {
    /// Total size of the filesystem in bytes.
    pub total_bytes: u64,
    /// Bytes in use (`total - available`).
    pub used_bytes: u64,
    /// Bytes available to unprivileged users.
    pub free_bytes: u64,
}

/// System-wide disk I/O throughput between two consecutive polls.
///
/// Values are signed: a counter that went backwards (device reset, wraparound)
/// produces a negative rate rather than being clamped.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct IoRates {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_ops_per_sec: f64,
    pub write_ops_per_sec: f64,
}

/// Bytes a single process wrote since the previous poll.
///
/// Only emitted when the delta is strictly positive.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ProcessWriteDelta {
    pub pid: u32,
    pub process_name: String,
    pub write_bytes_delta: u64,
}

/// One line of the disk telemetry log.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DiskRecord {
    pub device_id: String,
    /// Wall-clock capture time (UTC, RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// `None` when the mount path could not be measured.
    pub disk_usage: Option<DiskUsage>,
    /// `None` on the first poll after start, on a degenerate poll interval,
    /// or when the counters are unavailable on this host.
    pub disk_io: Option<IoRates>,
    pub process_writes: Vec<ProcessWriteDelta>,
}
