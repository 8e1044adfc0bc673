//! Differential rate engine.
//!
//! Converts cumulative OS counters into point-in-time rates by remembering the
//! previous reading of every tracked stream. One engine instance holds all
//! streams of an agent: the system-wide disk I/O stream and one write stream
//! per live process.
//!
//! The engine never commits a reading it could not use: a degenerate poll
//! (`dt <= 0`) leaves the stored baseline untouched so the next poll is
//! measured against the last good reading.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::collector::procfs::ProcessIo;
use crate::storage::model::{IoRates, ProcessWriteDelta};

/// Cumulative I/O counters as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
}

/// A counter reading together with its capture time (seconds since epoch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub counters: IoCounters,
    pub captured_at: f64,
}

impl RateSample {
    pub fn new(counters: IoCounters, captured_at: f64) -> Self {
        Self {
            counters,
            captured_at,
        }
    }
}

/// Signed per-field difference between two consecutive readings.
///
/// Negative when a counter went backwards (reset, wraparound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub read_bytes: i128,
    pub write_bytes: i128,
    pub read_ops: i128,
    pub write_ops: i128,
}

impl CounterDelta {
    fn between(current: &IoCounters, previous: &IoCounters) -> Self {
        let d = |c: u64, p: u64| i128::from(c) - i128::from(p);
        Self {
            read_bytes: d(current.read_bytes, previous.read_bytes),
            write_bytes: d(current.write_bytes, previous.write_bytes),
            read_ops: d(current.read_ops, previous.read_ops),
            write_ops: d(current.write_ops, previous.write_ops),
        }
    }

    fn per_second(&self, dt: f64) -> IoRates {
        IoRates {
            read_bytes_per_sec: self.read_bytes as f64 / dt,
            write_bytes_per_sec: self.write_bytes as f64 / dt,
            read_ops_per_sec: self.read_ops as f64 / dt,
            write_ops_per_sec: self.write_ops as f64 / dt,
        }
    }
}

/// Identity of a tracked counter stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// System-wide disk I/O totals.
    DiskIo,
    /// Per-process I/O counters. `start_time` tells a restarted process
    /// apart from an earlier one that held the same PID.
    Process { pid: u32, start_time: u64 },
}

/// Previous reading per stream.
#[derive(Debug)]
pub struct RateEngine<K> {
    prev: HashMap<K, RateSample>,
}

impl<K> Default for RateEngine<K> {
    fn default() -> Self {
        Self {
            prev: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> RateEngine<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `sample` and returns per-second rates against the previous
    /// reading of `key`.
    ///
    /// Returns `None` for the first reading of a stream (the sample becomes
    /// the baseline) and for a non-positive or non-finite interval (the
    /// sample is discarded).
    pub fn sample(&mut self, key: K, sample: RateSample) -> Option<IoRates> {
        let Some(prev) = self.prev.get(&key) else {
            self.prev.insert(key, sample);
            return None;
        };

        let dt = sample.captured_at - prev.captured_at;
        if !dt.is_finite() || dt <= 0.0 {
            return None;
        }

        let rates = CounterDelta::between(&sample.counters, &prev.counters).per_second(dt);
        self.prev.insert(key, sample);
        Some(rates)
    }

    /// Records `sample` and returns the raw counter difference against the
    /// previous reading of `key`, or `None` for the first reading.
    pub fn delta(&mut self, key: K, sample: RateSample) -> Option<CounterDelta> {
        let delta = self
            .prev
            .get(&key)
            .map(|prev| CounterDelta::between(&sample.counters, &prev.counters));
        self.prev.insert(key, sample);
        delta
    }

    /// Keeps only the streams for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.prev.retain(|key, _| keep(key));
    }

    pub fn contains(&self, key: &K) -> bool {
        self.prev.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.prev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev.is_empty()
    }

    pub fn reset(&mut self) {
        self.prev.clear();
    }
}

/// Computes per-process write deltas for one poll.
///
/// Emits an entry only when a process wrote more bytes than at the previous
/// poll. Process streams that were not observed in this poll are evicted
/// afterwards, so the engine does not grow with PID churn.
pub fn collect_write_deltas(
    engine: &mut RateEngine<StreamKey>,
    processes: &[ProcessIo],
    captured_at: f64,
) -> Vec<ProcessWriteDelta> {
    let mut seen = HashSet::with_capacity(processes.len());
    let mut deltas = Vec::new();

    for process in processes {
        let key = StreamKey::Process {
            pid: process.pid,
            start_time: process.start_time,
        };
        seen.insert(key);

        let sample = RateSample::new(process.counters, captured_at);
        if let Some(delta) = engine.delta(key, sample)
            && delta.write_bytes > 0
        {
            deltas.push(ProcessWriteDelta {
                pid: process.pid,
                process_name: process.name.clone(),
                write_bytes_delta: u64::try_from(delta.write_bytes).unwrap_or(u64::MAX),
            });
        }
    }

    engine.retain(|key| match key {
        StreamKey::DiskIo => true,
        StreamKey::Process { .. } => seen.contains(key),
    });

    deltas
}
