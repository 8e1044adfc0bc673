//! System-wide disk I/O totals from `/proc/diskstats`.

use std::path::PathBuf;

use tracing::trace;

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::parse_diskstats;
use crate::collector::traits::FileSystem;
use crate::rates::IoCounters;

/// Size of a diskstats sector, fixed by the kernel regardless of the
/// device's physical sector size.
const SECTOR_SIZE: u64 = 512;

/// Sums I/O counters over all whole block devices.
///
/// Partitions also appear in `/proc/diskstats`; counting them would double
/// the totals, so only names that have an entry under `<sys>/block/` are
/// included.
pub struct DiskIoCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    sys_path: PathBuf,
}

impl<F: FileSystem> DiskIoCollector<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
        }
    }

    pub fn collect(&self) -> Result<IoCounters, CollectError> {
        let path = self.proc_path.join("diskstats");
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| CollectError::io(&path, e))?;
        let disks = parse_diskstats(&content).map_err(|e| CollectError::parse(&path, e))?;

        let block_dir = self.sys_path.join("block");
        let mut totals = IoCounters::default();
        let mut devices = 0usize;

        for disk in disks {
            if !self.fs.exists(&block_dir.join(&disk.device)) {
                trace!(device = %disk.device, "not a whole block device");
                continue;
            }
            devices += 1;
            totals.read_bytes = totals
                .read_bytes
                .saturating_add(disk.read_sectors.saturating_mul(SECTOR_SIZE));
            totals.write_bytes = totals
                .write_bytes
                .saturating_add(disk.write_sectors.saturating_mul(SECTOR_SIZE));
            totals.read_ops = totals.read_ops.saturating_add(disk.reads);
            totals.write_ops = totals.write_ops.saturating_add(disk.writes);
        }

        if devices == 0 {
            return Err(CollectError::NoDevices(path));
        }

        Ok(totals)
    }
}
