use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use tracing::*;

use super::{
    cache::CachedDeviceTemperature, cpu::ThermalZone, device::Smartctl, filesystem::Statvfs,
    CpuTemperatureSource, DeviceTemperatureSource, FilesystemUsageSource, SensorError, Snapshot,
    MONITORED_DEVICES,
};
use crate::cli::manager::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Source {
    Cpu,
    Filesystem,
    /// Index into the configured devices
    Device(usize),
}

/// Gathers one [`Snapshot`] per cycle from the configured sources.
pub struct SensorPipeline {
    mount: PathBuf,
    devices: [PathBuf; MONITORED_DEVICES],
    cpu: Box<dyn CpuTemperatureSource>,
    device: Box<dyn DeviceTemperatureSource>,
    filesystem: Box<dyn FilesystemUsageSource>,
    // Sources whose last read failed, so a dead sensor warns once instead of every cycle
    failing: HashSet<Source>,
}

impl SensorPipeline {
    pub fn new(
        mount: impl AsRef<Path>,
        devices: [PathBuf; MONITORED_DEVICES],
        cpu: Box<dyn CpuTemperatureSource>,
        device: Box<dyn DeviceTemperatureSource>,
        filesystem: Box<dyn FilesystemUsageSource>,
    ) -> Self {
        Self {
            mount: mount.as_ref().to_path_buf(),
            devices,
            cpu,
            device,
            filesystem,
            failing: HashSet::new(),
        }
    }

    /// The Linux sources: sysfs thermal zone, smartctl and statvfs.
    pub fn from_config(config: &Config) -> Self {
        let smartctl = Smartctl::new(&config.smartctl, config.smart_attribute_index);

        Self::new(
            &config.mount,
            config.devices.clone(),
            Box::new(ThermalZone::new(&config.thermal_zone)),
            Box::new(CachedDeviceTemperature::new(
                Box::new(smartctl),
                config.device_refresh,
            )),
            Box::new(Statvfs),
        )
    }

    /// Read every source once. Never fails: a failed source leaves its
    /// fields empty.
    #[instrument(level = "debug", skip(self))]
    pub async fn sample(&mut self) -> Snapshot {
        let filesystem = self.filesystem.read(&self.mount).await;
        let filesystem = self.settle(Source::Filesystem, filesystem);

        let mut device_temps_c = [None; MONITORED_DEVICES];
        for (index, temperature) in device_temps_c.iter_mut().enumerate() {
            let reading = self.device.read(&self.devices[index]).await;
            *temperature = self.settle(Source::Device(index), reading);
        }

        let cpu = self.cpu.read().await;
        let cpu_temp_c = self.settle(Source::Cpu, cpu);

        let snapshot = Snapshot {
            cpu_temp_c,
            device_temps_c,
            fs_total_bytes: filesystem.map(|usage| usage.total_bytes),
            fs_used_bytes: filesystem.map(|usage| usage.used_bytes),
        };
        debug!("Sampled: {snapshot:?}");

        snapshot
    }

    fn settle<T>(&mut self, source: Source, result: Result<T, SensorError>) -> Option<T> {
        let name = self.name(source);
        match result {
            Ok(value) => {
                if self.failing.remove(&source) {
                    info!("Sensor {name} recovered");
                }
                Some(value)
            }
            Err(error) => {
                if self.failing.insert(source) {
                    warn!("Sensor {name} unavailable: {error}");
                } else {
                    debug!("Sensor {name} still unavailable: {error}");
                }
                None
            }
        }
    }

    fn name(&self, source: Source) -> String {
        match source {
            Source::Cpu => "cpu".to_string(),
            Source::Filesystem => format!("filesystem {:?}", self.mount),
            Source::Device(index) => self.devices[index].display().to_string(),
        }
    }
}
