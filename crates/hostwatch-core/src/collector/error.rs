use std::io;
use std::path::PathBuf;

use crate::collector::procfs::ParseError;

/// Error type for counter collection failures.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Process disappeared during collection.
    #[error("process {0} disappeared")]
    ProcessGone(u32),
    /// I/O error reading a counter file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Malformed counter file.
    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    /// `/proc/diskstats` listed no whole block device.
    #[error("no block devices found in {0}")]
    NoDevices(PathBuf),
    /// Filesystem capacity lookup failed.
    #[error("cannot read disk usage of {path}: {source}")]
    Usage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        CollectError::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Rejected device identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceIdError {
    #[error("device id must not be empty")]
    Empty,
}
