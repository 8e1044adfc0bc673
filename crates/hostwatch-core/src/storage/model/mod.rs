//! Data models for persisted records.
//!
//! Two record shapes are written, one JSON object per line:
//!
//! - [`disk`]: disk usage, disk I/O rates and per-process write deltas
//! - [`battery`]: the composite of every battery source, keyed by source name
//!
//! ```text
//! DiskRecord                       BatteryRecord
//!   ├── disk_usage?                  └── battery_data: BatterySnapshot
//!   ├── disk_io?  (IoRates)                ├── psutil              SourceResult<SensorInfo>
//!   └── process_writes[]                   ├── wmic                SourceResult<WmicInfo>
//!                                          ├── system_power_status SourceResult<PowerStatusInfo>
//!                                          ├── battery_report      SourceResult<ReportInfo>
//!                                          └── root_wmi            SourceResult<RootWmiInfo>
//! ```

mod battery;
mod disk;

pub use battery::{
    BatteryRecord, BatterySnapshot, PowerStatusInfo, ReportInfo, RootWmiInfo, SensorInfo,
    SourceResult, Unavailable, WmiInstance, WmicInfo,
};
pub use disk::{DiskRecord, DiskUsage, IoRates, ProcessWriteDelta};
