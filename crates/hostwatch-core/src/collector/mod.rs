//! Host telemetry collector.
//!
//! This module reads disk and battery telemetry from the host through
//! capability traits, with mock implementations for testing on any OS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌────────────────────┐  ┌────────────┐  ┌───────────────┐  │
//! │  │ DiskUsageCollector │  │ RateEngine │  │    Battery    │  │
//! │  │ DiskIoCollector    │─▶│ (StreamKey)│  │  Aggregator   │  │
//! │  │ ProcessIoCollector │  └────────────┘  │  (5 sources)  │  │
//! │  └─────────┬──────────┘                  └───────┬───────┘  │
//! │     ┌──────▼──────┐          ┌───────────────────▼───────┐  │
//! │     │  FileSystem │          │ CommandRunner, PowerStatus│  │
//! │     └──────┬──────┘          └───────────────┬───────────┘  │
//! └────────────┼─────────────────────────────────┼──────────────┘
//!              │                                 │
//!     ┌────────▼────────┐             ┌──────────▼─────────┐
//!     │ RealFs / MockFs │             │  Real* / Mock*     │
//!     └─────────────────┘             └────────────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```ignore
//! use hostwatch_core::collector::{
//!     Collector, CollectorPaths, DeviceId, NativePowerStatus, RealCommandRunner, RealFs,
//! };
//!
//! let mut collector = Collector::new(
//!     RealFs::new(),
//!     RealCommandRunner::new(),
//!     NativePowerStatus::new(),
//!     DeviceId::new("laptop-01")?,
//!     CollectorPaths::default(),
//! );
//! let disk = collector.collect_disk_record();
//! ```
//!
//! ## Testing (with mocks)
//!
//! ```
//! use hostwatch_core::collector::{
//!     Collector, CollectorPaths, DeviceId, MockCommands, MockFs, MockPowerStatus,
//! };
//!
//! let fs = MockFs::typical_system();
//! let mut collector = Collector::new(
//!     fs,
//!     MockCommands::new(),
//!     MockPowerStatus::unsupported(),
//!     DeviceId::new("laptop-01").unwrap(),
//!     CollectorPaths::default(),
//! );
//! let record = collector.collect_disk_record();
//! assert!(record.disk_io.is_none());
//! ```

pub mod battery;
#[allow(clippy::module_inception)]
mod collector;
mod error;
pub mod mock;
pub mod procfs;
pub mod traits;
mod usage;

pub use battery::{BatteryAggregator, BatterySource, CancelToken, default_report_path};
pub use collector::{Collector, CollectorPaths, CollectorTiming, DeviceId};
pub use error::{CollectError, DeviceIdError};
pub use mock::{MockClock, MockCommands, MockFs, MockPowerStatus};
pub use procfs::{DiskIoCollector, ProcessIo, ProcessIoCollector};
pub use traits::{
    Clock, CommandRunner, DiskSpace, FileSystem, NativePowerStatus, PowerStatusApi,
    RealCommandRunner, RealFs, SystemClock,
};
pub use usage::DiskUsageCollector;
