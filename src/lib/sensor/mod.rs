//! Health metric sources and the per-cycle sampling pipeline.
//!
//! Every source is independent: one failing never prevents the others from
//! being read. A failed reading shows up as `None` in the [`Snapshot`].

pub mod cache;
pub mod cpu;
pub mod device;
pub mod filesystem;
pub mod pipeline;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use pipeline::SensorPipeline;

/// Number of storage devices whose temperature is shown.
pub const MONITORED_DEVICES: usize = 2;

/// One cycle worth of normalized readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub cpu_temp_c: Option<i32>,
    /// Ordered as configured, the order decides the display position.
    pub device_temps_c: [Option<i32>; MONITORED_DEVICES],
    pub fs_total_bytes: Option<u64>,
    pub fs_used_bytes: Option<u64>,
}

impl Snapshot {
    pub fn has_any_temperature(&self) -> bool {
        self.cpu_temp_c.is_some() || self.device_temps_c.iter().any(Option::is_some)
    }

    pub fn filesystem(&self) -> Option<FilesystemUsage> {
        match (self.fs_total_bytes, self.fs_used_bytes) {
            (Some(total_bytes), Some(used_bytes)) => Some(FilesystemUsage {
                total_bytes,
                used_bytes,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesystemUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("Command {command:?} failed: {detail}")]
    Command { command: String, detail: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Not supported on this platform")]
    Unsupported,
}

#[async_trait]
pub trait CpuTemperatureSource: Send + Sync {
    /// CPU temperature in whole degrees Celsius.
    async fn read(&self) -> Result<i32, SensorError>;
}

#[async_trait]
pub trait DeviceTemperatureSource: Send + Sync {
    /// Temperature of the storage device at `device`, in whole degrees Celsius.
    async fn read(&self, device: &Path) -> Result<i32, SensorError>;
}

#[async_trait]
pub trait FilesystemUsageSource: Send + Sync {
    async fn read(&self, mount: &Path) -> Result<FilesystemUsage, SensorError>;
}
