//! Battery telemetry from several independent sources.
//!
//! The sources are redundant views of the same physical battery, not a
//! fallback chain: every poll queries all of them, and each one reports
//! either its data or why it has none. A failing source never affects the
//! others.
//!
//! | record key            | source                                     |
//! |-----------------------|--------------------------------------------|
//! | `psutil`              | OS battery sensor (sysfs / power status)   |
//! | `wmic`                | `wmic path Win32_Battery`                  |
//! | `system_power_status` | `GetSystemPowerStatus`                     |
//! | `battery_report`      | `powercfg /batteryreport` HTML artifact    |
//! | `root_wmi`            | `root/WMI` battery classes via PowerShell  |

mod power_status;
mod report;
mod root_wmi;
mod sensor;
mod wmic;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::collector::traits::{CommandRunner, FileSystem, PowerStatusApi};
use crate::storage::model::{BatterySnapshot, SourceResult, Unavailable};

pub use power_status::PowerStatusSource;
pub use report::{ReportSource, default_report_path, parse_battery_report};
pub use root_wmi::{ROOT_WMI_CLASSES, RootWmiSource};
pub use sensor::SensorSource;
pub use wmic::{WmicSource, parse_wmic_list};

/// Reason reported by sources skipped or cut short by shutdown.
pub(crate) const CANCELLED: &str = "cancelled";

/// One battery data source.
pub trait BatterySource {
    /// Key of this source in the battery record.
    const NAME: &'static str;

    type Info;

    /// Queries the source. Never fails: problems become
    /// [`SourceResult::Unavailable`].
    ///
    /// Sources that run several external tools check `cancel` between them.
    fn query(&self, cancel: &CancelToken) -> SourceResult<Self::Info>;
}

/// Shared shutdown flag.
///
/// Set from a signal handler, polled by the poll loop and by sources before
/// each external tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Queries every battery source and merges the results into one snapshot.
pub struct BatteryAggregator<F, C, P>
where
    F: FileSystem + Clone,
    C: CommandRunner + Clone,
    P: PowerStatusApi + Clone,
{
    sensor: SensorSource<F, P>,
    wmic: WmicSource<C>,
    power_status: PowerStatusSource<P>,
    report: ReportSource<F, C>,
    root_wmi: RootWmiSource<C>,
}

impl<F, C, P> BatteryAggregator<F, C, P>
where
    F: FileSystem + Clone,
    C: CommandRunner + Clone,
    P: PowerStatusApi + Clone,
{
    /// Creates an aggregator.
    ///
    /// # Arguments
    /// * `sys_path` - Base path to sysfs (usually "/sys"), for the sensor source
    /// * `report_path` - Where the battery report artifact is written
    pub fn new(
        fs: F,
        commands: C,
        power: P,
        sys_path: impl Into<PathBuf>,
        report_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sensor: SensorSource::new(fs.clone(), power.clone(), sys_path),
            wmic: WmicSource::new(commands.clone()),
            power_status: PowerStatusSource::new(power),
            report: ReportSource::new(fs, commands.clone(), report_path),
            root_wmi: RootWmiSource::new(commands),
        }
    }

    pub fn report_path(&self) -> &Path {
        self.report.path()
    }

    /// Builds one snapshot stamped with `stamp`.
    ///
    /// All five keys are always present. Once `cancel` is set, the sources
    /// not yet queried report `reason: "cancelled"` instead of running.
    pub fn aggregate(&self, stamp: DateTime<FixedOffset>, cancel: &CancelToken) -> BatterySnapshot {
        BatterySnapshot {
            timestamp: stamp,
            platform: std::env::consts::OS.to_string(),
            psutil: run_source(&self.sensor, cancel),
            wmic: run_source(&self.wmic, cancel),
            system_power_status: run_source(&self.power_status, cancel),
            battery_report: run_source(&self.report, cancel),
            root_wmi: run_source(&self.root_wmi, cancel),
        }
    }
}

fn run_source<S: BatterySource>(source: &S, cancel: &CancelToken) -> SourceResult<S::Info> {
    if cancel.is_cancelled() {
        return SourceResult::Unavailable(Unavailable::reason(CANCELLED));
    }

    let start = Instant::now();
    let result = source.query(cancel);
    match &result {
        SourceResult::Available(_) => {
            debug!(source = S::NAME, elapsed = ?start.elapsed(), "battery source available");
        }
        SourceResult::Unavailable(u) => {
            debug!(
                source = S::NAME,
                elapsed = ?start.elapsed(),
                reason = u.message().unwrap_or("unknown"),
                "battery source unavailable"
            );
        }
    }
    result
}
