//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Fields of `/proc/[pid]/stat` needed for I/O stream identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    /// Start time in clock ticks since boot.
    pub starttime: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ... starttime (field 22)
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    // Fields after ')' start at `state` (field 3 in proc(5) numbering).
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 20 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 20+, got {}",
            fields.len()
        )));
    }

    let starttime = fields[19]
        .parse()
        .map_err(|_| ParseError::new("invalid starttime"))?;

    Ok(ProcStat {
        pid,
        comm,
        starttime,
    })
}

/// Storage-level counters from `/proc/[pid]/io`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcIo {
    /// Read syscalls.
    pub syscr: u64,
    /// Write syscalls.
    pub syscw: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is key: value pairs, one per line; character counters
/// (`rchar`, `wchar`) and `cancelled_write_bytes` are ignored. A file without a
/// `write_bytes` line is rejected (kernels without task I/O accounting).
pub fn parse_proc_io(content: &str) -> Result<ProcIo, ParseError> {
    let mut io = ProcIo::default();
    let mut has_write_bytes = false;

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value: u64 = value.trim().parse().unwrap_or(0);
            match key.trim() {
                "syscr" => io.syscr = value,
                "syscw" => io.syscw = value,
                "read_bytes" => io.read_bytes = value,
                "write_bytes" => {
                    io.write_bytes = value;
                    has_write_bytes = true;
                }
                _ => {}
            }
        }
    }

    if !has_write_bytes {
        return Err(ParseError::new("missing write_bytes in io"));
    }

    Ok(io)
}

/// Parsed data from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Block device major number.
    pub major: u32,
    /// Block device minor number.
    pub minor: u32,
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of reads completed
    pub reads: u64,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Number of writes completed
    pub writes: u64,
    /// Number of sectors written
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue; // Skip malformed lines
        }

        let major: u32 = parts[0].parse().unwrap_or(0);
        let minor: u32 = parts[1].parse().unwrap_or(0);

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            major,
            minor,
            device: parts[2].to_string(),
            reads: get_val(3),
            read_sectors: get_val(5),
            writes: get_val(7),
            write_sectors: get_val(9),
        });
    }

    Ok(disks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_stat_basic() {
        let content = "1234 (bash) S 1233 1234 1234 34816 1235 4194304 5000 50000 10 20 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 5 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.starttime, 100000);
    }

    #[test]
    fn test_parse_proc_stat_comm_with_parens_and_spaces() {
        let content = "5000 (Web Content (x)) R 1 5000 5000 0 -1 4194304 0 0 0 0 0 0 0 0 20 0 1 0 777 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.comm, "Web Content (x)");
        assert_eq!(stat.starttime, 777);
    }

    #[test]
    fn test_parse_proc_stat_invalid_starttime() {
        let content = "7 (x) S 1 7 7 0 -1 0 0 0 0 0 0 0 0 0 20 0 1 0 soon 0 0";
        let err = parse_proc_stat(content).unwrap_err();
        assert_eq!(err.message, "invalid starttime");
    }

    #[test]
    fn test_parse_proc_stat_truncated() {
        let err = parse_proc_stat("42 (short) S 1 2 3").unwrap_err();
        assert!(err.message.contains("not enough fields"));
    }

    #[test]
    fn test_parse_proc_stat_missing_parens() {
        assert!(parse_proc_stat("42 short S 1").is_err());
        assert!(parse_proc_stat("42 )short( S 1").is_err());
    }

    #[test]
    fn test_parse_proc_io() {
        let content = "\
rchar: 323934931
wchar: 323929600
syscr: 632687
syscw: 632675
read_bytes: 4096
write_bytes: 323932160
cancelled_write_bytes: 0
";
        let io = parse_proc_io(content).unwrap();
        assert_eq!(io.syscr, 632687);
        assert_eq!(io.syscw, 632675);
        assert_eq!(io.read_bytes, 4096);
        assert_eq!(io.write_bytes, 323932160);
    }

    #[test]
    fn test_parse_proc_io_without_write_bytes() {
        assert!(parse_proc_io("rchar: 1\nwchar: 2\n").is_err());
        assert!(parse_proc_io("").is_err());
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "\
   8       0 sda 12345 100 987654 5000 6789 200 543210 3000 0 4000 8000 0 0 0 0
   8       1 sda1 12000 90 980000 4900 6700 190 540000 2900 0 3900 7800
 259       0 nvme0n1 500 0 4000 100 250 0 2000 50 0 120 150
   7       0 loop0
";
        let disks = parse_diskstats(content).unwrap();
        assert_eq!(disks.len(), 3);

        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].major, 8);
        assert_eq!(disks[0].reads, 12345);
        assert_eq!(disks[0].read_sectors, 987654);
        assert_eq!(disks[0].writes, 6789);
        assert_eq!(disks[0].write_sectors, 543210);

        assert_eq!(disks[1].device, "sda1");
        assert_eq!(disks[2].device, "nvme0n1");
        assert_eq!(disks[2].minor, 0);
    }
}
