use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::*;

use super::{CpuTemperatureSource, SensorError};

pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads a sysfs thermal zone, which reports millidegrees Celsius.
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CpuTemperatureSource for ThermalZone {
    #[instrument(level = "trace", skip(self), fields(path = ?self.path))]
    async fn read(&self) -> Result<i32, SensorError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SensorError::Io {
            path: self.path.clone(),
            source,
        })?;

        parse_millidegrees(&content)
    }
}

/// Parse a millidegree reading into whole degrees, truncating toward zero.
fn parse_millidegrees(content: &str) -> Result<i32, SensorError> {
    let millidegrees: i64 = content
        .trim()
        .parse()
        .map_err(|error: std::num::ParseIntError| SensorError::Parse {
            what: "thermal zone",
            detail: format!("{content:?}: {error}"),
        })?;

    i32::try_from(millidegrees / 1000).map_err(|error| SensorError::Parse {
        what: "thermal zone",
        detail: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_millidegrees() {
        assert_eq!(parse_millidegrees("48312\n").unwrap(), 48);
        assert_eq!(parse_millidegrees("999").unwrap(), 0);
        assert_eq!(parse_millidegrees("-4500").unwrap(), -4);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_millidegrees("hot"),
            Err(SensorError::Parse { .. })
        ));
        assert!(parse_millidegrees("").is_err());
    }

    #[tokio::test]
    async fn reads_from_file() {
        let path = std::env::temp_dir().join(format!("thermal-zone-{}", std::process::id()));
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"51250\n")
            .unwrap();

        let zone = ThermalZone::new(&path);
        assert_eq!(zone.read().await.unwrap(), 51);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let zone = ThermalZone::new("/nonexistent/thermal_zone/temp");
        assert!(matches!(zone.read().await, Err(SensorError::Io { .. })));
    }
}
