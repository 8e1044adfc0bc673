use std::collections::BTreeMap;
use std::io;

use serde_json::Value;
use tracing::{debug, trace};

use super::{BatterySource, CANCELLED, CancelToken};
use crate::collector::traits::CommandRunner;
use crate::storage::model::{RootWmiInfo, SourceResult, Unavailable, WmiInstance};

const SOURCE: &str = "root\\WMI";

/// Battery classes of the `root/WMI` namespace, queried one by one.
pub const ROOT_WMI_CLASSES: [&str; 8] = [
    "BatteryStatus",
    "BatteryStaticData",
    "BatteryFullChargedCapacity",
    "BatteryCycleCount",
    "BatteryTemperature",
    "BatteryManufactureDate",
    "BatteryUniqueID",
    "BatteryRemainingCapacity",
];

/// Low-level battery classes through PowerShell's CIM cmdlets.
///
/// Many firmware implementations expose only some of the classes, so each
/// class is independently optional.
pub struct RootWmiSource<C: CommandRunner> {
    commands: C,
}

impl<C: CommandRunner> RootWmiSource<C> {
    pub fn new(commands: C) -> Self {
        Self { commands }
    }

    /// Instances of one class. `Ok(empty)` when the class has none or the
    /// query failed; `Err` only when PowerShell itself cannot be started.
    fn query_class(&self, class: &str) -> io::Result<Vec<WmiInstance>> {
        let script = format!(
            "Get-CimInstance -Namespace root/WMI -ClassName {class} -ErrorAction Stop \
             | Select-Object -Property * -ExcludeProperty Cim* \
             | ConvertTo-Json -Depth 4 -Compress"
        );
        let output = match self.commands.run(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", script.as_str()],
        ) {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
            Err(e) => {
                trace!(class, error = %e, "class query failed");
                return Ok(Vec::new());
            }
        };

        Ok(parse_instances(class, &output))
    }
}

impl<C: CommandRunner> BatterySource for RootWmiSource<C> {
    const NAME: &'static str = "root_wmi";
    type Info = RootWmiInfo;

    fn query(&self, cancel: &CancelToken) -> SourceResult<RootWmiInfo> {
        let mut classes = BTreeMap::new();

        for class in ROOT_WMI_CLASSES {
            if cancel.is_cancelled() {
                if classes.is_empty() {
                    return SourceResult::Unavailable(
                        Unavailable::reason(CANCELLED).with_source(SOURCE),
                    );
                }
                break;
            }
            match self.query_class(class) {
                Ok(instances) if instances.is_empty() => {}
                Ok(instances) => {
                    classes.insert(class.to_string(), instances);
                }
                Err(e) => {
                    return SourceResult::Unavailable(
                        Unavailable::reason(e.to_string()).with_source(SOURCE),
                    );
                }
            }
        }

        if classes.is_empty() {
            return SourceResult::Unavailable(
                Unavailable::reason("no battery classes returned").with_source(SOURCE),
            );
        }

        SourceResult::Available(RootWmiInfo {
            source: SOURCE.to_string(),
            classes,
        })
    }
}

/// `ConvertTo-Json` emits a bare object for one instance and an array for
/// several; empty output means no instances.
fn parse_instances(class: &str, output: &str) -> Vec<WmiInstance> {
    let output = output.trim();
    if output.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(instance)) => vec![instance],
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(instance) => Some(instance),
                _ => None,
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(class, error = %e, "unparseable class output");
            Vec::new()
        }
    }
}
