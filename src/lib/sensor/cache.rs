use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::*;

use super::{DeviceTemperatureSource, SensorError};

/// Reuses successful device temperature readings for `refresh`.
///
/// Spawning smartctl on every cycle keeps the drives busy for a value that
/// changes slowly. Failures are never cached, so a failing device is retried
/// on the next sample. A zero `refresh` reads through every time.
pub struct CachedDeviceTemperature {
    inner: Box<dyn DeviceTemperatureSource>,
    refresh: Duration,
    readings: Mutex<HashMap<PathBuf, (Instant, i32)>>,
}

impl CachedDeviceTemperature {
    pub fn new(inner: Box<dyn DeviceTemperatureSource>, refresh: Duration) -> Self {
        Self {
            inner,
            refresh,
            readings: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, device: &Path) -> Option<i32> {
        let readings = self.readings.lock().ok()?;
        let (taken_at, temperature) = readings.get(device)?;
        (taken_at.elapsed() < self.refresh).then_some(*temperature)
    }
}

#[async_trait]
impl DeviceTemperatureSource for CachedDeviceTemperature {
    async fn read(&self, device: &Path) -> Result<i32, SensorError> {
        if self.refresh.is_zero() {
            return self.inner.read(device).await;
        }

        if let Some(temperature) = self.cached(device) {
            trace!("Using cached temperature for {device:?}: {temperature}");
            return Ok(temperature);
        }

        let result = self.inner.read(device).await;
        if let Ok(mut readings) = self.readings.lock() {
            match &result {
                Ok(temperature) => {
                    readings.insert(device.to_path_buf(), (Instant::now(), *temperature));
                }
                Err(_) => {
                    readings.remove(device);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl DeviceTemperatureSource for Counting {
        async fn read(&self, _device: &Path) -> Result<i32, SensorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as i32;
            if self.fail {
                return Err(SensorError::Unsupported);
            }
            Ok(30 + call)
        }
    }

    fn cached(refresh: Duration, fail: bool) -> (CachedDeviceTemperature, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Counting {
            calls: calls.clone(),
            fail,
        };
        (
            CachedDeviceTemperature::new(Box::new(source), refresh),
            calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn reuses_reading_within_refresh_period() {
        let (source, calls) = cached(Duration::from_secs(60), false);
        let sda = Path::new("/dev/sda");

        assert_eq!(source.read(sda).await.unwrap(), 30);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(source.read(sda).await.unwrap(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(source.read(sda).await.unwrap(), 31);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn devices_are_cached_separately() {
        let (source, calls) = cached(Duration::from_secs(60), false);

        assert_eq!(source.read(Path::new("/dev/sda")).await.unwrap(), 30);
        assert_eq!(source.read(Path::new("/dev/sdb")).await.unwrap(), 31);
        assert_eq!(source.read(Path::new("/dev/sda")).await.unwrap(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let (source, calls) = cached(Duration::from_secs(60), true);
        let sda = Path::new("/dev/sda");

        assert!(source.read(sda).await.is_err());
        assert!(source.read(sda).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_refresh_reads_through() {
        let (source, calls) = cached(Duration::ZERO, false);
        let sda = Path::new("/dev/sda");

        assert_eq!(source.read(sda).await.unwrap(), 30);
        assert_eq!(source.read(sda).await.unwrap(), 31);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
