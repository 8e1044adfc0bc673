//! Collectors for Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for the cumulative I/O
//! counters the rate engine differentiates: system-wide disk totals and
//! per-process read/write counters.

pub mod disk;
pub mod parser;
pub mod process;

use crate::rates::IoCounters;

pub use disk::DiskIoCollector;
pub use parser::ParseError;
pub use process::ProcessIoCollector;

/// One process's cumulative I/O counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIo {
    pub pid: u32,
    pub name: String,
    /// Start time in clock ticks since boot; tells PID reuse apart.
    pub start_time: u64,
    pub counters: IoCounters,
}
