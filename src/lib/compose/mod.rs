//! Turns a [`Snapshot`] into the two display lines.

pub mod units;

use crate::{display::line::DisplayLine, sensor::Snapshot};

pub use units::format_iec;

pub const FILESYSTEM_ERROR: &str = "FS err";
pub const NO_TEMPERATURE_DATA: &str = "No temp data";

/// Compose the usage line and the temperature line for `snapshot`.
pub fn compose(snapshot: &Snapshot) -> (DisplayLine, DisplayLine) {
    (usage_line(snapshot), temperature_line(snapshot))
}

/// `<used>/<total>` in IEC units, or `FS err` when the filesystem read failed.
pub fn usage_line(snapshot: &Snapshot) -> DisplayLine {
    match snapshot.filesystem() {
        Some(usage) => DisplayLine::new(&format!(
            "{}/{}",
            format_iec(usage.used_bytes),
            format_iec(usage.total_bytes)
        )),
        None => DisplayLine::new(FILESYSTEM_ERROR),
    }
}

/// `c:<cpu>C d:<dev0>C,<dev1>C`. A missing reading is shown as 0 unless every
/// reading is missing, then the line reads `No temp data`.
pub fn temperature_line(snapshot: &Snapshot) -> DisplayLine {
    if !snapshot.has_any_temperature() {
        return DisplayLine::new(NO_TEMPERATURE_DATA);
    }

    let [first, second] = snapshot.device_temps_c.map(|temperature| temperature.unwrap_or(0));
    DisplayLine::new(&format!(
        "c:{}C d:{first}C,{second}C",
        snapshot.cpu_temp_c.unwrap_or(0)
    ))
}
