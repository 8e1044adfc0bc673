//! Capability interfaces for everything the collectors read from the host.
//!
//! The `FileSystem`, `CommandRunner` and `PowerStatusApi` traits let the
//! collectors work against the real OS in production and against in-memory
//! fakes (see [`crate::collector::mock`]) in tests and on hosts that lack a
//! given facility.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use sysinfo::Disks;

use crate::storage::model::PowerStatusInfo;

/// Capacity figures for one mounted filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskSpace {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reads the raw bytes of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Capacity of the filesystem that holds `path`.
    fn disk_space(&self, path: &Path) -> io::Result<DiskSpace>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    /// Picks the mounted filesystem whose mount point is the longest prefix
    /// of `path`, so `/home/user` resolves to `/home` when that is a
    /// separate mount.
    fn disk_space(&self, path: &Path) -> io::Result<DiskSpace> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| DiskSpace {
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no filesystem mounted at {}", path.display()),
                )
            })
    }
}

/// Runs an external program and captures its standard output.
pub trait CommandRunner: Send + Sync {
    /// Returns stdout of `program args...`.
    ///
    /// A program that cannot be started yields its spawn error (usually
    /// `NotFound`); a non-zero exit status is reported as an error too.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String>;
}

/// Spawns real processes via `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for RealCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{program} exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Access to the native power-status structure.
pub trait PowerStatusApi: Send + Sync {
    fn system_power_status(&self) -> io::Result<PowerStatusInfo>;
}

/// `GetSystemPowerStatus` on Windows; `Unsupported` everywhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePowerStatus;

impl NativePowerStatus {
    pub fn new() -> Self {
        Self
    }
}

impl PowerStatusApi for NativePowerStatus {
    #[cfg(windows)]
    fn system_power_status(&self) -> io::Result<PowerStatusInfo> {
        win32::system_power_status()
    }

    #[cfg(not(windows))]
    fn system_power_status(&self) -> io::Result<PowerStatusInfo> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "GetSystemPowerStatus is only available on Windows",
        ))
    }
}

#[cfg(windows)]
mod win32 {
    use std::io;

    use crate::storage::model::PowerStatusInfo;

    /// Layout of `SYSTEM_POWER_STATUS` from `winbase.h`.
    #[repr(C)]
    #[derive(Default)]
    struct SystemPowerStatus {
        ac_line_status: u8,
        battery_flag: u8,
        battery_life_percent: u8,
        system_status_flag: u8,
        battery_life_time: u32,
        battery_full_life_time: u32,
    }

    #[link(name = "kernel32")]
    unsafe extern "system" {
        fn GetSystemPowerStatus(status: *mut SystemPowerStatus) -> i32;
    }

    pub(super) fn system_power_status() -> io::Result<PowerStatusInfo> {
        let mut status = SystemPowerStatus::default();
        // SAFETY: `status` is a properly laid out, writable SYSTEM_POWER_STATUS
        // that outlives the call.
        let ok = unsafe { GetSystemPowerStatus(&mut status) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(PowerStatusInfo {
            ac_line_status: status.ac_line_status,
            battery_flag: status.battery_flag,
            battery_life_percent: status.battery_life_percent,
            battery_life_time: status.battery_life_time,
            battery_full_life_time: status.battery_full_life_time,
        })
    }
}

/// Source of wall-clock time for record timestamps and rate intervals.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_real_fs_read_to_string() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&cargo_toml).unwrap();
        assert!(content.contains("[package]"));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        assert!(fs.exists(&cargo_toml));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let fs = RealFs::new();
        let src_dir = env::current_dir().unwrap().join("src");
        let entries = fs.read_dir(&src_dir).unwrap();
        assert!(entries.iter().any(|p| p.ends_with("lib.rs")));
    }

    #[test]
    fn test_real_command_runner_missing_program() {
        let runner = RealCommandRunner::new();
        let err = runner
            .run("hostwatch-definitely-not-installed", &[])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_native_power_status_unsupported_off_windows() {
        let err = NativePowerStatus::new().system_power_status().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
