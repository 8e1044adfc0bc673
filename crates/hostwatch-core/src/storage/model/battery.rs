//! Battery-side record: one composite of every battery source per poll.
//!
//! Each source produces a [`SourceResult`], an explicit sum type that
//! serialises as a flat object carrying an `available` flag:
//!
//! ```text
//! Available(SensorInfo { percent: 81.0, .. })  -> {"available": true, "percent": 81.0, ...}
//! Unavailable(Unavailable { reason: .. })      -> {"available": false, "reason": "..."}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One instance of a WMI class, property name to value.
pub type WmiInstance = Map<String, Value>;

/// Why a source produced no data.
///
/// Sources differ in which key they use for the explanation: most use
/// `reason`, the sensor and native power-status sources use `error` for
/// runtime failures. `source` is echoed by the command-based sources so the
/// record stays self-describing even when empty.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Unavailable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Unavailable {
    /// Unavailable with a `reason` explanation.
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Unavailable with an `error` explanation.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The human-readable explanation, whichever key carries it.
    pub fn message(&self) -> Option<&str> {
        self.reason.as_deref().or(self.error.as_deref())
    }
}

/// Result of querying one battery source.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceResult<T> {
    Available(T),
    Unavailable(Unavailable),
}

impl<T> SourceResult<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceResult::Available(_))
    }

    pub fn info(&self) -> Option<&T> {
        match self {
            SourceResult::Available(info) => Some(info),
            SourceResult::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            SourceResult::Available(_) => None,
            SourceResult::Unavailable(u) => Some(u),
        }
    }
}

impl<T: Serialize> Serialize for SourceResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, B> {
            available: bool,
            #[serde(flatten)]
            body: &'a B,
        }

        match self {
            SourceResult::Available(info) => Tagged {
                available: true,
                body: info,
            }
            .serialize(serializer),
            SourceResult::Unavailable(u) => Tagged {
                available: false,
                body: u,
            }
            .serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for SourceResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(deserializer)?;
        let available = match body.remove("available") {
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "`available` must be a boolean, got {other}"
                )));
            }
            None => return Err(D::Error::missing_field("available")),
        };

        let body = Value::Object(body);
        if available {
            serde_json::from_value(body)
                .map(SourceResult::Available)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(body)
                .map(SourceResult::Unavailable)
                .map_err(D::Error::custom)
        }
    }
}

/// OS battery sensor reading.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SensorInfo {
    /// Charge level, 0-100.
    pub percent: f64,
    /// Estimated seconds of runtime left; -1 when plugged in or unknown.
    pub secsleft: i64,
    pub power_plugged: bool,
}

/// `Win32_Battery` properties as reported by the management CLI.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WmicInfo {
    pub source: String,
    pub properties: BTreeMap<String, String>,
}

/// Native power-status structure (`SYSTEM_POWER_STATUS`).
///
/// Field names follow the Win32 structure so records can be cross-checked
/// against the API documentation.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PowerStatusInfo {
    /// 0 offline, 1 online, 255 unknown.
    #[serde(rename = "ACLineStatus")]
    pub ac_line_status: u8,
    /// Bit flags: 1 high, 2 low, 4 critical, 8 charging, 128 no battery, 255 unknown.
    #[serde(rename = "BatteryFlag")]
    pub battery_flag: u8,
    /// 0-100, 255 unknown.
    #[serde(rename = "BatteryLifePercent")]
    pub battery_life_percent: u8,
    /// Seconds of battery life left, `u32::MAX` unknown.
    #[serde(rename = "BatteryLifeTime_seconds")]
    pub battery_life_time: u32,
    /// Seconds of battery life at full charge, `u32::MAX` unknown.
    #[serde(rename = "BatteryFullLifeTime_seconds")]
    pub battery_full_life_time: u32,
}

/// Fields extracted from a generated battery report.
///
/// Every parsed field is optional: a report whose layout drifted still yields
/// whatever could be matched.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ReportInfo {
    #[serde(default)]
    pub design_capacity_mwh: Option<u64>,
    #[serde(default)]
    pub full_charge_capacity_mwh: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_name: Option<String>,
    /// Where the report artifact was written.
    #[serde(default)]
    pub report_path: String,
}

/// Instances of the battery classes in the low-level WMI namespace.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RootWmiInfo {
    pub source: String,
    /// Class name to instances. Classes that returned nothing are absent.
    pub classes: BTreeMap<String, Vec<WmiInstance>>,
}

/// Every battery source for one poll, plus capture time and platform.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BatterySnapshot {
    /// Capture time with the local UTC offset.
    pub timestamp: DateTime<FixedOffset>,
    pub platform: String,
    pub psutil: SourceResult<SensorInfo>,
    pub wmic: SourceResult<WmicInfo>,
    pub system_power_status: SourceResult<PowerStatusInfo>,
    pub battery_report: SourceResult<ReportInfo>,
    pub root_wmi: SourceResult<RootWmiInfo>,
}

impl BatterySnapshot {
    /// Availability of each source, in record order.
    pub fn availability(&self) -> [(&'static str, bool); 5] {
        [
            ("psutil", self.psutil.is_available()),
            ("wmic", self.wmic.is_available()),
            ("system_power_status", self.system_power_status.is_available()),
            ("battery_report", self.battery_report.is_available()),
            ("root_wmi", self.root_wmi.is_available()),
        ]
    }
}

/// One line of the battery telemetry log.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BatteryRecord {
    pub device_id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub battery_data: BatterySnapshot,
}
