//! Battery report generated by `powercfg /batteryreport`.
//!
//! The report is an HTML page meant for people, so extraction is tolerant
//! pattern matching: a label followed, within a short window, by the value
//! cell. Fields that do not match are left out rather than failing the
//! whole source.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{BatterySource, CancelToken};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::storage::model::{ReportInfo, SourceResult, Unavailable};

const GENERATE_FAILED: &str = "could not generate battery report";

/// Labels of the identity cells in the installed-batteries table.
const TEXT_FIELDS: [&str; 4] = ["Manufacturer", "Model", "Serial Number", "Battery name"];

/// Per-process report location in the system temp directory.
pub fn default_report_path() -> PathBuf {
    std::env::temp_dir().join(format!("battery_report_{}.html", std::process::id()))
}

pub struct ReportSource<F: FileSystem, C: CommandRunner> {
    fs: F,
    commands: C,
    path: PathBuf,
}

impl<F: FileSystem, C: CommandRunner> ReportSource<F, C> {
    pub fn new(fs: F, commands: C, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            commands,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn generate(&self) -> bool {
        let output = self.path.to_string_lossy().into_owned();
        if let Err(e) = self
            .commands
            .run("powercfg", &["/batteryreport", "/output", output.as_str()])
        {
            debug!(error = %e, "powercfg failed");
            return false;
        }
        self.fs.exists(&self.path)
    }
}

impl<F: FileSystem, C: CommandRunner> BatterySource for ReportSource<F, C> {
    const NAME: &'static str = "battery_report";
    type Info = ReportInfo;

    fn query(&self, _cancel: &CancelToken) -> SourceResult<ReportInfo> {
        if !self.generate() {
            return SourceResult::Unavailable(Unavailable::reason(GENERATE_FAILED));
        }

        // Reports may carry localized text in a legacy code page.
        match self.fs.read(&self.path) {
            Ok(bytes) => SourceResult::Available(ReportInfo {
                report_path: self.path.to_string_lossy().into_owned(),
                ..parse_battery_report(&String::from_utf8_lossy(&bytes))
            }),
            Err(e) => SourceResult::Unavailable(Unavailable::reason(e.to_string())),
        }
    }
}

static TAG_GAP: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r">\s+<"));

static DESIGN_CAPACITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| capacity_pattern("DESIGN CAPACITY"));

static FULL_CHARGE_CAPACITY: LazyLock<Option<Regex>> =
    LazyLock::new(|| capacity_pattern("FULL CHARGE CAPACITY"));

static CYCLE_COUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?is)CYCLE COUNT.{0,80}?>\s*([\d,]+)\s*<"));

/// One pattern per entry of [`TEXT_FIELDS`], same order.
static LABELLED_CELLS: LazyLock<Vec<Option<Regex>>> =
    LazyLock::new(|| TEXT_FIELDS.iter().map(|label| labelled_cell_pattern(label)).collect());

/// Extracts capacities, cycle count and identity fields from report HTML.
///
/// `report_path` is left empty.
pub fn parse_battery_report(html: &str) -> ReportInfo {
    let text = match &*TAG_GAP {
        Some(re) => re.replace_all(html, "><").into_owned(),
        None => html.to_string(),
    };

    let mut info = ReportInfo {
        design_capacity_mwh: capture(&DESIGN_CAPACITY, &text).and_then(|n| parse_number(&n)),
        full_charge_capacity_mwh: capture(&FULL_CHARGE_CAPACITY, &text)
            .and_then(|n| parse_number(&n)),
        cycle_count: capture(&CYCLE_COUNT, &text).and_then(|n| parse_number(&n)),
        ..ReportInfo::default()
    };

    for (label, re) in TEXT_FIELDS.iter().zip(LABELLED_CELLS.iter()) {
        let value = capture(re, &text);
        match *label {
            "Manufacturer" => info.manufacturer = value,
            "Model" => info.model = value,
            "Serial Number" => info.serial_number = value,
            _ => info.battery_name = value,
        }
    }

    info
}

/// `N mWh` within 80 characters after `label`.
fn capacity_pattern(label: &str) -> Option<Regex> {
    compile(&format!(
        r"(?is){}.{{0,80}}?>([\d,]+)\s*mWh",
        regex::escape(label)
    ))
}

/// Contents of the table cell following the cell holding `label`.
fn labelled_cell_pattern(label: &str) -> Option<Regex> {
    compile(&format!(
        r"(?is){}\s*(?:</span>\s*)?</t[dh]>\s*<td[^>]*>\s*([^<]+?)\s*</td>",
        regex::escape(label)
    ))
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(pattern, error = %e, "invalid report pattern");
            None
        }
    }
}

fn capture(re: &Option<Regex>, text: &str) -> Option<String> {
    re.as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Parses a number with thousands separators (`56,002`).
fn parse_number(raw: &str) -> Option<u64> {
    raw.replace(',', "").parse().ok()
}
