use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::*;

use super::{DeviceTemperatureSource, SensorError};

pub const DEFAULT_SMARTCTL: &str = "smartctl";
/// Position of the temperature attribute in the ATA attribute table of the
/// drives this agent was written for.
pub const DEFAULT_SMART_ATTRIBUTE_INDEX: usize = 17;

/// Reads drive temperatures through `smartctl -A --json`.
///
/// The temperature is taken from a fixed position in the ATA SMART attribute
/// table, so the index must match the attribute layout of the monitored drives.
#[derive(Debug, Clone)]
pub struct Smartctl {
    program: PathBuf,
    attribute_index: usize,
}

#[derive(Debug, Deserialize)]
struct SmartctlReport {
    ata_smart_attributes: Option<AtaSmartAttributes>,
}

#[derive(Debug, Deserialize)]
struct AtaSmartAttributes {
    table: Vec<SmartAttribute>,
}

#[derive(Debug, Deserialize)]
struct SmartAttribute {
    id: Option<u32>,
    name: Option<String>,
    value: Option<i64>,
}

impl Smartctl {
    pub fn new(program: impl AsRef<Path>, attribute_index: usize) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            attribute_index,
        }
    }
}

#[async_trait]
impl DeviceTemperatureSource for Smartctl {
    #[instrument(level = "debug", skip(self))]
    async fn read(&self, device: &Path) -> Result<i32, SensorError> {
        let command = format!("{} -A --json {}", self.program.display(), device.display());

        let output = Command::new(&self.program)
            .args(["-A", "--json"])
            .arg(device)
            .output()
            .await
            .map_err(|error| SensorError::Command {
                command: command.clone(),
                detail: error.to_string(),
            })?;

        // smartctl uses its exit status as a bitmask of drive conditions, so a
        // non-zero status can still come with a complete report.
        match parse_attribute(&output.stdout, self.attribute_index) {
            Ok(temperature) => Ok(temperature),
            Err(error) if !output.status.success() => {
                debug!("{command} exited with {}: {error}", output.status);
                Err(SensorError::Command {
                    command,
                    detail: format!("{}: {error}", output.status),
                })
            }
            Err(error) => Err(error),
        }
    }
}

/// Extract `ata_smart_attributes.table[index].value` from a smartctl JSON report.
fn parse_attribute(report: &[u8], index: usize) -> Result<i32, SensorError> {
    let report: SmartctlReport =
        serde_json::from_slice(report).map_err(|error| SensorError::Parse {
            what: "smartctl report",
            detail: error.to_string(),
        })?;

    let attribute = report
        .ata_smart_attributes
        .and_then(|attributes| attributes.table.into_iter().nth(index))
        .ok_or_else(|| SensorError::MissingField(format!("ata_smart_attributes.table[{index}]")))?;

    trace!(
        "Using SMART attribute {:?} ({:?}) at index {index}",
        attribute.id,
        attribute.name
    );

    let value = attribute.value.ok_or_else(|| {
        SensorError::MissingField(format!("ata_smart_attributes.table[{index}].value"))
    })?;

    i32::try_from(value).map_err(|error| SensorError::Parse {
        what: "smartctl attribute value",
        detail: error.to_string(),
    })
}
