//! Prebuilt host fixtures.
//!
//! ```text
//! typical_system            desktop_without_battery   windows_laptop
//! ───────────────────       ───────────────────────   ──────────────────────
//! /proc: 1 2 1000 1001      same /proc, /sys          wmic Win32_Battery
//! diskstats: sda(+sda1),    power_supply: AC only     powercfg report (HTML)
//!            nvme0n1                                  root/WMI: 4 classes
//! power_supply: AC, BAT0
//! mount "/"
//! ```

use std::path::Path;

use super::commands::MockCommands;
use super::filesystem::{MockFs, proc_io_content};

/// `/proc/diskstats` of [`MockFs::typical_system`].
pub const TYPICAL_DISKSTATS: &str = "\
   8       0 sda 12000 300 2000000 9000 8000 400 1000000 7000 0 11000 16000 0 0 0 0
   8       1 sda1 11000 280 1900000 8500 7500 390 950000 6800 0 10500 15300 0 0 0 0
 259       0 nvme0n1 3000 0 480000 900 1500 0 240000 600 0 1100 1500 0 0 0 0
   7       0 loop0 50 0 400 10 0 0 0 0 0 20 10 0 0 0 0
";

/// Minimal `powercfg /batteryreport` page.
pub const BATTERY_REPORT_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>Battery report</title></head><body>
<h2>Installed batteries</h2>
<table>
  <tr><td><span class="label">NAME</span></td><td>DELL 1VX1H</td></tr>
  <tr><td><span class="label">MANUFACTURER</span></td><td>SMP</td></tr>
  <tr><td><span class="label">SERIAL NUMBER</span></td><td>4213</td></tr>
  <tr><td><span class="label">CHEMISTRY</span></td><td>LiP</td></tr>
  <tr><td><span class="label">DESIGN CAPACITY</span></td><td>56,002 mWh</td></tr>
  <tr><td><span class="label">FULL CHARGE CAPACITY</span></td><td>48,510 mWh</td></tr>
  <tr><td><span class="label">CYCLE COUNT</span></td><td>321</td></tr>
</table>
</body></html>
"#;

const WMIC_LISTING: &str = "\r\r\n\r\r\nAvailability=2\r\r\nBatteryStatus=1\r\r\nCaption=Internal Battery\r\r\nChemistry=2\r\r\nDescription=Internal Battery\r\r\nDesignVoltage=11400\r\r\nDeviceID=4213SMPDELL 1VX1H\r\r\nEstimatedChargeRemaining=76\r\r\nEstimatedRunTime=100\r\r\nName=DELL 1VX1H\r\r\nStatus=OK\r\r\nTimeOnBattery=\r\r\n\r\r\n";

impl MockFs {
    /// Linux laptop with two disks, four processes and one battery.
    ///
    /// PID 2 (kernel thread) has no `io` file.
    pub fn typical_system() -> Self {
        let fs = MockFs::new();

        fs.add_process(1, "systemd", 1, &proc_io_content(52_428_800, 10_485_760, 9000, 4000));
        fs.add_process(2, "kthreadd", 2, "");
        fs.add_process(
            1000,
            "postgres",
            100_000,
            &proc_io_content(1_048_576, 4_194_304, 100, 200),
        );
        fs.add_process(
            1001,
            "postgres: writer",
            100_050,
            &proc_io_content(0, 8_388_608, 0, 512),
        );

        fs.add_file("/proc/diskstats", TYPICAL_DISKSTATS);
        fs.add_dir("/sys/block/sda");
        fs.add_dir("/sys/block/nvme0n1");
        fs.add_dir("/sys/block/loop0");

        let supply = "/sys/class/power_supply";
        fs.add_file(format!("{supply}/AC/type"), "Mains\n");
        fs.add_file(format!("{supply}/AC/online"), "0\n");
        fs.add_file(format!("{supply}/BAT0/type"), "Battery\n");
        fs.add_file(format!("{supply}/BAT0/status"), "Discharging\n");
        fs.add_file(format!("{supply}/BAT0/capacity"), "81\n");
        fs.add_file(format!("{supply}/BAT0/energy_now"), "40000000\n");
        fs.add_file(format!("{supply}/BAT0/energy_full"), "50000000\n");
        fs.add_file(format!("{supply}/BAT0/power_now"), "20000000\n");

        fs.add_mount("/", 500_000_000_000, 200_000_000_000);

        fs
    }

    /// Same as [`MockFs::typical_system`] but mains-powered with no battery.
    pub fn desktop_without_battery() -> Self {
        let fs = Self::typical_system();
        fs.remove("/sys/class/power_supply/BAT0");
        fs.add_file("/sys/class/power_supply/AC/online", "1\n");
        fs
    }
}

impl MockCommands {
    /// Windows laptop tooling: wmic, powercfg and PowerShell all present.
    ///
    /// The battery report is written into `fs` at `report_path` up front,
    /// standing in for the file `powercfg` would create.
    pub fn windows_laptop(fs: &MockFs, report_path: impl AsRef<Path>) -> Self {
        let commands = MockCommands::new();

        commands.respond("wmic", WMIC_LISTING);

        commands.respond_when("powercfg", "/batteryreport", "Battery life report saved.");
        fs.add_file(report_path, BATTERY_REPORT_HTML);

        commands.respond_when(
            "powershell",
            "BatteryStatus ",
            r#"{"Active":true,"Charging":false,"Discharging":true,"PowerOnline":false,"RemainingCapacity":38410,"Voltage":12100,"Tag":1}"#,
        );
        commands.respond_when(
            "powershell",
            "BatteryStaticData ",
            r#"{"DesignedCapacity":56002,"DeviceName":"DELL 1VX1H","ManufactureName":"SMP","SerialNumber":"4213","Tag":1}"#,
        );
        commands.respond_when(
            "powershell",
            "BatteryFullChargedCapacity ",
            r#"{"FullChargedCapacity":48510,"Tag":1}"#,
        );
        commands.respond_when(
            "powershell",
            "BatteryCycleCount ",
            r#"[{"CycleCount":321,"Tag":1}]"#,
        );
        commands.respond("powershell", "");

        commands
    }
}
