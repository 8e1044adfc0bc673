//! Drives several poll cycles against a mock host and checks what lands in
//! the JSON-lines logs.

use std::path::PathBuf;

use chrono::TimeDelta;
use serde_json::Value;

use hostwatch_core::collector::mock::TYPICAL_DISKSTATS;
use hostwatch_core::collector::{
    Collector, CollectorPaths, DeviceId, MockClock, MockCommands, MockFs, MockPowerStatus,
};
use hostwatch_core::storage::{BatteryRecord, DiskRecord, JsonlSink, read_records};

const START: i64 = 1_760_788_800;
const REPORT_PATH: &str = "/tmp/hostwatch/battery_report.html";

type MockCollector = Collector<MockFs, MockCommands, MockPowerStatus>;

fn laptop(fs: &MockFs, clock: &MockClock) -> MockCollector {
    let commands = MockCommands::windows_laptop(fs, REPORT_PATH);
    let paths = CollectorPaths {
        proc_path: PathBuf::from("/proc"),
        sys_path: PathBuf::from("/sys"),
        disk_mount: PathBuf::from("/"),
        report_path: PathBuf::from(REPORT_PATH),
    };
    Collector::new(
        fs.clone(),
        commands,
        MockPowerStatus::on_battery(),
        DeviceId::new("laptop-01").unwrap(),
        paths,
    )
    .with_clock(Box::new(clock.clone()))
}

#[test]
fn test_poll_cycles_written_to_logs() {
    let dir = tempfile::tempdir().unwrap();
    let disk_log = dir.path().join("data").join("disk_telemetry.jsonl");
    let battery_log = dir.path().join("data").join("battery_telemetry.jsonl");
    let disk_sink = JsonlSink::new(&disk_log);
    let battery_sink = JsonlSink::new(&battery_log);

    let fs = MockFs::typical_system();
    let clock = MockClock::at_unix(START);
    let mut collector = laptop(&fs, &clock);

    let mut disk_records = Vec::new();
    let mut battery_records = Vec::new();

    for cycle in 0..3 {
        if cycle > 0 {
            clock.advance(TimeDelta::seconds(10));
            // sda: 2048 more sectors written by 100 more writes per cycle.
            let extra_sectors = 2048 * cycle;
            let extra_writes = 100 * cycle;
            fs.add_file(
                "/proc/diskstats",
                TYPICAL_DISKSTATS.replace(
                    " 8000 400 1000000 ",
                    &format!(" {} 400 {} ", 8000 + extra_writes, 1_000_000 + extra_sectors),
                ),
            );
            fs.set_process_writes(1000, 4_194_304 + 65_536 * cycle);
        }

        let disk = collector.collect_disk_record();
        disk_sink.append(&disk).unwrap();
        disk_records.push(disk);

        let battery = collector.collect_battery_record();
        battery_sink.append(&battery).unwrap();
        battery_records.push(battery);
    }

    assert!(disk_records[0].disk_io.is_none());
    assert!(disk_records[0].process_writes.is_empty());

    for record in &disk_records[1..] {
        let rates = record.disk_io.unwrap();
        assert!((rates.write_bytes_per_sec - 2048.0 * 512.0 / 10.0).abs() < 1e-6);
        assert!((rates.write_ops_per_sec - 10.0).abs() < 1e-9);
        assert_eq!(rates.read_bytes_per_sec, 0.0);

        assert_eq!(record.process_writes.len(), 1);
        assert_eq!(record.process_writes[0].pid, 1000);
        assert_eq!(record.process_writes[0].process_name, "postgres");
        assert_eq!(record.process_writes[0].write_bytes_delta, 65_536);
    }

    let timestamps: Vec<i64> = battery_records.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![START, START + 10, START + 20]);

    let read_disk: Vec<DiskRecord> = read_records(&disk_log).unwrap();
    let read_battery: Vec<BatteryRecord> = read_records(&battery_log).unwrap();
    assert_eq!(read_disk, disk_records);
    assert_eq!(read_battery, battery_records);
}

#[test]
fn test_battery_lines_keep_every_source_key() {
    let dir = tempfile::tempdir().unwrap();
    let battery_log = dir.path().join("battery.jsonl");
    let sink = JsonlSink::new(&battery_log);

    // No tools, no battery, no native API: everything degrades.
    let clock = MockClock::at_unix(START);
    let mut collector = Collector::new(
        MockFs::desktop_without_battery(),
        MockCommands::new(),
        MockPowerStatus::unsupported(),
        DeviceId::new("desktop-01").unwrap(),
        CollectorPaths {
            report_path: PathBuf::from(REPORT_PATH),
            ..CollectorPaths::default()
        },
    )
    .with_clock(Box::new(clock.clone()));

    sink.append(&collector.collect_battery_record()).unwrap();
    let with_tools = MockFs::typical_system();
    let mut equipped = laptop(&with_tools, &clock);
    sink.append(&equipped.collect_battery_record()).unwrap();

    let content = std::fs::read_to_string(&battery_log).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    let sources = [
        "psutil",
        "wmic",
        "system_power_status",
        "battery_report",
        "root_wmi",
    ];

    let degraded = &lines[0]["battery_data"];
    assert_eq!(lines[0]["device_id"], "desktop-01");
    for source in sources {
        assert_eq!(degraded[source]["available"], false, "{source}");
    }
    #[cfg(not(windows))]
    assert_eq!(degraded["psutil"]["reason"], "no battery detected");

    let full = &lines[1]["battery_data"];
    for source in sources {
        assert_eq!(full[source]["available"], true, "{source}");
    }
    assert_eq!(full["battery_report"]["cycle_count"], 321);
    assert_eq!(full["battery_report"]["design_capacity_mwh"], 56_002);
    assert_eq!(full["wmic"]["properties"]["EstimatedChargeRemaining"], "76");
    assert_eq!(
        full["root_wmi"]["classes"]["BatteryCycleCount"][0]["CycleCount"],
        321
    );
}
