//! OS battery sensor: percent, runtime left and AC state.
//!
//! Windows derives it from the native power status; other hosts read the
//! Linux power-supply class in sysfs.

use std::path::{Path, PathBuf};

use super::{BatterySource, CancelToken};
use crate::collector::traits::{FileSystem, PowerStatusApi};
use crate::storage::model::{PowerStatusInfo, SensorInfo, SourceResult, Unavailable};

const NO_BATTERY: &str = "no battery detected";

/// `BatteryFlag` bit meaning the system has no battery.
const FLAG_NO_BATTERY: u8 = 128;

pub struct SensorSource<F: FileSystem, P: PowerStatusApi> {
    fs: F,
    power: P,
    sys_path: PathBuf,
}

impl<F: FileSystem, P: PowerStatusApi> SensorSource<F, P> {
    pub fn new(fs: F, power: P, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            power,
            sys_path: sys_path.into(),
        }
    }

    fn from_power_status(&self) -> SourceResult<SensorInfo> {
        match self.power.system_power_status() {
            Ok(status) => sensor_from_power_status(&status),
            Err(e) => SourceResult::Unavailable(Unavailable::error(e.to_string())),
        }
    }

    fn from_power_supply(&self) -> SourceResult<SensorInfo> {
        let root = self.sys_path.join("class/power_supply");
        let Ok(entries) = self.fs.read_dir(&root) else {
            return SourceResult::Unavailable(Unavailable::reason(NO_BATTERY));
        };

        let mut battery = None;
        let mut ac_online = None;

        for dir in entries {
            let Some(kind) = read_trimmed(&self.fs, &dir.join("type")) else {
                continue;
            };
            match kind.as_str() {
                "Battery" if battery.is_none() => {
                    battery = read_battery(&self.fs, &dir);
                }
                "Mains" | "USB" => {
                    if let Some(online) = read_u64(&self.fs, &dir.join("online")) {
                        ac_online = Some(ac_online.unwrap_or(false) || online == 1);
                    }
                }
                _ => {}
            }
        }

        let Some(battery) = battery else {
            return SourceResult::Unavailable(Unavailable::reason(NO_BATTERY));
        };

        // Without an AC adapter entry fall back to the battery's own status.
        let power_plugged = ac_online.unwrap_or_else(|| {
            matches!(battery.status.as_deref(), Some("Charging" | "Full"))
        });

        let secsleft = if power_plugged {
            -1
        } else {
            battery.secsleft.unwrap_or(-1)
        };

        SourceResult::Available(SensorInfo {
            percent: battery.percent,
            secsleft,
            power_plugged,
        })
    }
}

impl<F: FileSystem, P: PowerStatusApi> BatterySource for SensorSource<F, P> {
    const NAME: &'static str = "psutil";
    type Info = SensorInfo;

    fn query(&self, _cancel: &CancelToken) -> SourceResult<SensorInfo> {
        if cfg!(windows) {
            self.from_power_status()
        } else {
            self.from_power_supply()
        }
    }
}

/// Maps the native power status to a sensor reading.
fn sensor_from_power_status(status: &PowerStatusInfo) -> SourceResult<SensorInfo> {
    if status.battery_flag == FLAG_NO_BATTERY || status.battery_life_percent > 100 {
        return SourceResult::Unavailable(Unavailable::reason(NO_BATTERY));
    }

    let power_plugged = status.ac_line_status == 1;
    let secsleft = if power_plugged || status.battery_life_time == u32::MAX {
        -1
    } else {
        i64::from(status.battery_life_time)
    };

    SourceResult::Available(SensorInfo {
        percent: f64::from(status.battery_life_percent),
        secsleft,
        power_plugged,
    })
}

struct BatteryReading {
    percent: f64,
    status: Option<String>,
    secsleft: Option<i64>,
}

/// Reads one `power_supply/BATx` directory. Energy (µWh/µW) and charge
/// (µAh/µA) based drivers are both handled.
fn read_battery(fs: &impl FileSystem, dir: &Path) -> Option<BatteryReading> {
    let read = |name: &str| read_u64(fs, &dir.join(name));

    let (now, full, rate) = match (read("energy_now"), read("energy_full")) {
        (Some(now), Some(full)) => (Some(now), Some(full), read("power_now")),
        _ => (read("charge_now"), read("charge_full"), read("current_now")),
    };

    let percent = match read("capacity") {
        Some(capacity) => capacity as f64,
        None => match (now, full) {
            (Some(now), Some(full)) if full > 0 => now as f64 * 100.0 / full as f64,
            _ => return None,
        },
    };

    let secsleft = match (now, rate) {
        (Some(now), Some(rate)) if rate > 0 => i64::try_from(now.saturating_mul(3600) / rate).ok(),
        _ => None,
    };

    Some(BatteryReading {
        percent: percent.min(100.0),
        status: read_trimmed(fs, &dir.join("status")),
        secsleft,
    })
}

fn read_trimmed(fs: &impl FileSystem, path: &Path) -> Option<String> {
    let value = fs.read_to_string(path).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn read_u64(fs: &impl FileSystem, path: &Path) -> Option<u64> {
    read_trimmed(fs, path)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockPowerStatus};

    fn sysfs_source(fs: MockFs) -> SensorSource<MockFs, MockPowerStatus> {
        SensorSource::new(fs, MockPowerStatus::unsupported(), "/sys")
    }

    #[test]
    fn test_power_supply_discharging() {
        let fs = MockFs::typical_system();
        let info = sysfs_source(fs).from_power_supply();

        assert_eq!(
            info,
            SourceResult::Available(SensorInfo {
                percent: 81.0,
                secsleft: 7200,
                power_plugged: false,
            })
        );
    }

    #[test]
    fn test_power_supply_plugged_in_has_no_runtime() {
        let fs = MockFs::typical_system();
        fs.add_file("/sys/class/power_supply/AC/online", "1\n");

        let info = sysfs_source(fs).from_power_supply();
        let info = info.info().unwrap();
        assert!(info.power_plugged);
        assert_eq!(info.secsleft, -1);
    }

    #[test]
    fn test_power_supply_charge_based_without_capacity() {
        let fs = MockFs::new();
        let bat = "/sys/class/power_supply/BAT1";
        fs.add_file(format!("{bat}/type"), "Battery\n");
        fs.add_file(format!("{bat}/status"), "Discharging\n");
        fs.add_file(format!("{bat}/charge_now"), "2500000\n");
        fs.add_file(format!("{bat}/charge_full"), "5000000\n");
        fs.add_file(format!("{bat}/current_now"), "1250000\n");

        let info = sysfs_source(fs).from_power_supply();
        assert_eq!(
            info,
            SourceResult::Available(SensorInfo {
                percent: 50.0,
                secsleft: 7200,
                power_plugged: false,
            })
        );
    }

    #[test]
    fn test_power_supply_status_fallback_when_no_adapter() {
        let fs = MockFs::new();
        let bat = "/sys/class/power_supply/BAT0";
        fs.add_file(format!("{bat}/type"), "Battery\n");
        fs.add_file(format!("{bat}/capacity"), "100\n");
        fs.add_file(format!("{bat}/status"), "Full\n");

        let info = sysfs_source(fs).from_power_supply();
        assert!(info.info().unwrap().power_plugged);
    }

    #[test]
    fn test_no_battery_detected() {
        let info = sysfs_source(MockFs::desktop_without_battery()).from_power_supply();
        assert_eq!(info.unavailable().unwrap().message(), Some(NO_BATTERY));

        let info = sysfs_source(MockFs::new()).from_power_supply();
        assert_eq!(info.unavailable().unwrap().message(), Some(NO_BATTERY));
    }

    #[test]
    fn test_from_power_status_on_battery() {
        let source = SensorSource::new(MockFs::new(), MockPowerStatus::on_battery(), "/sys");
        assert_eq!(
            source.from_power_status(),
            SourceResult::Available(SensorInfo {
                percent: 76.0,
                secsleft: 6000,
                power_plugged: false,
            })
        );
    }

    #[test]
    fn test_from_power_status_charging_and_desktop() {
        let charging = SensorSource::new(MockFs::new(), MockPowerStatus::charging(), "/sys");
        let info = charging.from_power_status();
        assert_eq!(info.info().unwrap().secsleft, -1);
        assert!(info.info().unwrap().power_plugged);

        let desktop = SensorSource::new(MockFs::new(), MockPowerStatus::no_battery(), "/sys");
        assert_eq!(
            desktop.from_power_status().unavailable().unwrap().message(),
            Some(NO_BATTERY)
        );
    }

    #[test]
    fn test_from_power_status_failure_uses_error_key() {
        let source = SensorSource::new(MockFs::new(), MockPowerStatus::failing("denied"), "/sys");
        let result = source.from_power_status();
        let unavailable = result.unavailable().unwrap();
        assert_eq!(unavailable.error.as_deref(), Some("denied"));
        assert!(unavailable.reason.is_none());
    }
}
