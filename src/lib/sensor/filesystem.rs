use std::path::Path;

use async_trait::async_trait;
use tracing::*;

use super::{FilesystemUsage, FilesystemUsageSource, SensorError};

/// Filesystem usage through `statvfs(3)`.
///
/// Used space counts every non-free block, including the blocks reserved for
/// the superuser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statvfs;

#[async_trait]
impl FilesystemUsageSource for Statvfs {
    #[instrument(level = "trace", skip(self))]
    async fn read(&self, mount: &Path) -> Result<FilesystemUsage, SensorError> {
        statvfs_usage(mount)
    }
}

#[cfg(target_os = "linux")]
fn statvfs_usage(mount: &Path) -> Result<FilesystemUsage, SensorError> {
    use std::{ffi::CString, os::unix::ffi::OsStrExt};

    let c_path = CString::new(mount.as_os_str().as_bytes()).map_err(|error| SensorError::Parse {
        what: "mount path",
        detail: error.to_string(),
    })?;

    let mut stat = std::mem::MaybeUninit::<libc::statvfs>::uninit();
    if unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) } != 0 {
        return Err(SensorError::Io {
            path: mount.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }
    let stat = unsafe { stat.assume_init() };

    Ok(usage_from_blocks(
        u64::from(stat.f_blocks),
        u64::from(stat.f_bfree),
        u64::from(stat.f_frsize),
    ))
}

#[cfg(not(target_os = "linux"))]
fn statvfs_usage(_mount: &Path) -> Result<FilesystemUsage, SensorError> {
    Err(SensorError::Unsupported)
}

fn usage_from_blocks(blocks: u64, free_blocks: u64, fragment_size: u64) -> FilesystemUsage {
    FilesystemUsage {
        total_bytes: blocks.saturating_mul(fragment_size),
        used_bytes: blocks
            .saturating_sub(free_blocks)
            .saturating_mul(fragment_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_counts_non_free_blocks() {
        let usage = usage_from_blocks(1000, 250, 4096);
        assert_eq!(usage.total_bytes, 4_096_000);
        assert_eq!(usage.used_bytes, 3_072_000);
    }

    #[test]
    fn free_larger_than_total_does_not_underflow() {
        assert_eq!(usage_from_blocks(10, 20, 4096).used_bytes, 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn root_filesystem_is_readable() {
        let usage = Statvfs.read(Path::new("/")).await.unwrap();
        assert!(usage.total_bytes > 0);
        assert!(usage.used_bytes <= usage.total_bytes);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn missing_mount_fails() {
        assert!(matches!(
            Statvfs.read(Path::new("/nonexistent/mount/point")).await,
            Err(SensorError::Io { .. })
        ));
    }
}
