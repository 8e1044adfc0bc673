use std::collections::BTreeMap;

use super::{BatterySource, CancelToken};
use crate::collector::traits::CommandRunner;
use crate::storage::model::{SourceResult, Unavailable, WmicInfo};

const SOURCE: &str = "wmic";
const ARGS: [&str; 4] = ["path", "Win32_Battery", "get", "/format:list"];

/// `Win32_Battery` properties through the WMI command-line tool.
pub struct WmicSource<C: CommandRunner> {
    commands: C,
}

impl<C: CommandRunner> WmicSource<C> {
    pub fn new(commands: C) -> Self {
        Self { commands }
    }
}

impl<C: CommandRunner> BatterySource for WmicSource<C> {
    const NAME: &'static str = "wmic";
    type Info = WmicInfo;

    fn query(&self, _cancel: &CancelToken) -> SourceResult<WmicInfo> {
        let output = match self.commands.run("wmic", &ARGS) {
            Ok(output) => output,
            Err(e) => {
                return SourceResult::Unavailable(
                    Unavailable::reason(e.to_string()).with_source(SOURCE),
                );
            }
        };

        let properties = parse_wmic_list(&output);
        if properties.is_empty() {
            return SourceResult::Unavailable(
                Unavailable::reason("no properties").with_source(SOURCE),
            );
        }

        SourceResult::Available(WmicInfo {
            source: SOURCE.to_string(),
            properties,
        })
    }
}

/// Parses `/format:list` output: one `Key=Value` per line, blank lines
/// between instances. Empty values are recorded as `"N/A"`. With several
/// batteries the last instance wins per key.
pub fn parse_wmic_list(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let value = if value.is_empty() { "N/A" } else { value };
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockCommands;
    use std::io;

    const LISTING: &str = "\r\r\n\r\r\nAvailability=2\r\r\nBatteryStatus=1\r\r\nCaption=Internal Battery\r\r\nDescription=\r\r\nEstimatedChargeRemaining=76\r\r\nName=DELL 1VX1H\r\r\n\r\r\n";

    #[test]
    fn test_parse_wmic_list() {
        let properties = parse_wmic_list(LISTING);

        assert_eq!(properties.len(), 6);
        assert_eq!(properties["Availability"], "2");
        assert_eq!(properties["Caption"], "Internal Battery");
        assert_eq!(properties["Description"], "N/A");
        assert_eq!(properties["Name"], "DELL 1VX1H");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let properties = parse_wmic_list("PNPDeviceID=ACPI\\PNP0C0A\\1=x\n");
        assert_eq!(properties["PNPDeviceID"], "ACPI\\PNP0C0A\\1=x");
    }

    #[test]
    fn test_query_available() {
        let commands = MockCommands::new();
        commands.respond("wmic", LISTING);

        let result = WmicSource::new(commands.clone()).query(&CancelToken::new());
        let info = result.info().unwrap();
        assert_eq!(info.source, "wmic");
        assert_eq!(info.properties["EstimatedChargeRemaining"], "76");
        assert_eq!(
            commands.calls(),
            vec!["wmic path Win32_Battery get /format:list".to_string()]
        );
    }

    #[test]
    fn test_query_no_properties() {
        let commands = MockCommands::new();
        commands.respond("wmic", "\r\r\nNo Instance(s) Available.\r\r\n");

        let result = WmicSource::new(commands).query(&CancelToken::new());
        let unavailable = result.unavailable().unwrap();
        assert_eq!(unavailable.reason.as_deref(), Some("no properties"));
        assert_eq!(unavailable.source.as_deref(), Some("wmic"));
    }

    #[test]
    fn test_query_tool_missing() {
        let result = WmicSource::new(MockCommands::new()).query(&CancelToken::new());
        assert!(result.unavailable().unwrap().reason.is_some());

        let commands = MockCommands::new();
        commands.fail("wmic", io::ErrorKind::PermissionDenied, "access denied");
        let result = WmicSource::new(commands).query(&CancelToken::new());
        assert_eq!(
            result.unavailable().unwrap().reason.as_deref(),
            Some("access denied")
        );
    }
}
