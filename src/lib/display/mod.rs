//! Character display devices and the differential renderer driving them.

pub mod hd44780;
pub mod line;
pub mod log;
pub mod renderer;

use tracing::*;

use crate::cli::manager::{Config, DisplayBackend};

pub use line::{DisplayLine, DISPLAY_COLUMNS, DISPLAY_ROWS};
pub use renderer::{DifferentialRenderer, RenderReport};

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Failed to open display on {bus}: {reason}")]
    Open { bus: String, reason: String },

    #[error("Display bus error: {0}")]
    Bus(String),

    #[error("Row {row} is outside the {rows}-row display")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Column {column} is outside the {columns}-column display")]
    ColumnOutOfRange { column: usize, columns: usize },
}

/// A character display addressed one cell at a time.
pub trait DisplayDevice {
    /// Switch the backlight and the visible content on or off. Content written
    /// while off is kept by the controller.
    fn set_power(&mut self, on: bool) -> Result<(), DisplayError>;

    /// Put `character` at (`row`, `column`).
    fn write_cell(&mut self, row: usize, column: usize, character: char)
        -> Result<(), DisplayError>;

    /// (rows, columns)
    fn geometry(&self) -> (usize, usize) {
        (DISPLAY_ROWS, DISPLAY_COLUMNS)
    }
}

impl<T: DisplayDevice + ?Sized> DisplayDevice for Box<T> {
    fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        (**self).set_power(on)
    }

    fn write_cell(
        &mut self,
        row: usize,
        column: usize,
        character: char,
    ) -> Result<(), DisplayError> {
        (**self).write_cell(row, column, character)
    }

    fn geometry(&self) -> (usize, usize) {
        (**self).geometry()
    }
}

pub(crate) fn check_bounds(row: usize, column: usize) -> Result<(), DisplayError> {
    if row >= DISPLAY_ROWS {
        return Err(DisplayError::RowOutOfRange {
            row,
            rows: DISPLAY_ROWS,
        });
    }
    if column >= DISPLAY_COLUMNS {
        return Err(DisplayError::ColumnOutOfRange {
            column,
            columns: DISPLAY_COLUMNS,
        });
    }
    Ok(())
}

/// Open the configured backend. The returned display is initialized, blank
/// and powered off.
#[instrument(level = "debug", skip(config))]
pub fn open(config: &Config) -> Result<Box<dyn DisplayDevice>, DisplayError> {
    match config.display {
        DisplayBackend::Hd44780 => {
            info!(
                "Opening HD44780 display at {:#04x} on {:?}",
                config.i2c_address, config.i2c_bus
            );
            hd44780::open(&config.i2c_bus, config.i2c_address)
        }
        DisplayBackend::Log => {
            info!("Using the log display");
            Ok(Box::new(log::LogDisplay::new()))
        }
    }
}
