//! Per-process I/O counters from `/proc/[pid]/`.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::collector::error::CollectError;
use crate::collector::procfs::ProcessIo;
use crate::collector::procfs::parser::{parse_proc_io, parse_proc_stat};
use crate::collector::traits::FileSystem;
use crate::rates::IoCounters;

/// Collects I/O counters of every visible process.
pub struct ProcessIoCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcessIoCollector<F> {
    /// Creates a new process I/O collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Reads the I/O counters of a single process.
    ///
    /// `io` is read first: it is the file most often denied (other users'
    /// processes) and nothing else is needed when it is missing.
    pub fn collect_process(&self, pid: u32) -> Result<ProcessIo, CollectError> {
        let proc_dir = self.proc_path.join(pid.to_string());

        let io_path = proc_dir.join("io");
        let io_content = self
            .fs
            .read_to_string(&io_path)
            .map_err(|e| CollectError::io(&io_path, e))?;
        let io = parse_proc_io(&io_content).map_err(|e| CollectError::parse(&io_path, e))?;

        let stat_path = proc_dir.join("stat");
        let stat_content = self
            .fs
            .read_to_string(&stat_path)
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let stat = parse_proc_stat(&stat_content).map_err(|e| CollectError::parse(&stat_path, e))?;

        let name = self
            .fs
            .read_to_string(&proc_dir.join("comm"))
            .map(|comm| comm.trim().to_string())
            .unwrap_or(stat.comm);

        Ok(ProcessIo {
            pid,
            name,
            start_time: stat.starttime,
            counters: IoCounters {
                read_bytes: io.read_bytes,
                write_bytes: io.write_bytes,
                read_ops: io.syscr,
                write_ops: io.syscw,
            },
        })
    }

    /// Collects counters of all processes.
    ///
    /// Processes whose counters cannot be read (exited mid-scan, permission
    /// denied, accounting disabled) are skipped.
    pub fn collect(&self) -> Result<Vec<ProcessIo>, CollectError> {
        let entries = self
            .fs
            .read_dir(&self.proc_path)
            .map_err(|e| CollectError::io(&self.proc_path, e))?;

        let mut processes = Vec::new();

        for entry in entries {
            let Some(pid) = pid_of(&entry) else {
                continue;
            };
            match self.collect_process(pid) {
                Ok(process) => processes.push(process),
                Err(e) => trace!(pid, error = %e, "skipping process"),
            }
        }

        Ok(processes)
    }
}

fn pid_of(entry: &Path) -> Option<u32> {
    entry.file_name()?.to_str()?.parse().ok()
}
