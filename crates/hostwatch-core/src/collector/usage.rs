//! Capacity of the filesystem holding a configured path.

use std::path::PathBuf;

use crate::collector::error::CollectError;
use crate::collector::traits::FileSystem;
use crate::storage::model::DiskUsage;

pub struct DiskUsageCollector<F: FileSystem> {
    fs: F,
    mount: PathBuf,
}

impl<F: FileSystem> DiskUsageCollector<F> {
    pub fn new(fs: F, mount: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            mount: mount.into(),
        }
    }

    pub fn mount(&self) -> &std::path::Path {
        &self.mount
    }

    /// `used` counts space reserved for root as used, matching what `df`
    /// reports as unavailable to ordinary users.
    pub fn collect(&self) -> Result<DiskUsage, CollectError> {
        let space = self
            .fs
            .disk_space(&self.mount)
            .map_err(|source| CollectError::Usage {
                path: self.mount.clone(),
                source,
            })?;

        Ok(DiskUsage {
            total_bytes: space.total_bytes,
            used_bytes: space.total_bytes.saturating_sub(space.available_bytes),
            free_bytes: space.available_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_used_is_total_minus_available() {
        let fs = MockFs::new();
        fs.add_mount("/", 500_000_000_000, 200_000_000_000);

        let usage = DiskUsageCollector::new(fs, "/").collect().unwrap();
        assert_eq!(
            usage,
            DiskUsage {
                total_bytes: 500_000_000_000,
                used_bytes: 300_000_000_000,
                free_bytes: 200_000_000_000,
            }
        );
    }

    #[test]
    fn test_unknown_mount() {
        let err = DiskUsageCollector::new(MockFs::new(), "/data")
            .collect()
            .unwrap_err();
        assert!(matches!(err, CollectError::Usage { .. }));
    }
}
