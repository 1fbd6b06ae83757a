use tracing::*;

use super::{check_bounds, DisplayDevice, DisplayError, DisplayLine, DISPLAY_ROWS};

/// A display that only exists in the log, for hosts without the LCD attached.
#[derive(Debug, Default)]
pub struct LogDisplay {
    frame: [DisplayLine; DISPLAY_ROWS],
    powered: bool,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &[DisplayLine; DISPLAY_ROWS] {
        &self.frame
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }
}

impl DisplayDevice for LogDisplay {
    fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.powered = on;
        info!("Display {}", if on { "on" } else { "off" });
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: usize,
        column: usize,
        character: char,
    ) -> Result<(), DisplayError> {
        check_bounds(row, column)?;

        self.frame[row].cells_mut()[column] = character;
        debug!("[{row}] |{}|", self.frame[row]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_frame() {
        let mut display = LogDisplay::new();
        display.set_power(true).unwrap();
        for (column, character) in "hi".chars().enumerate() {
            display.write_cell(1, column, character).unwrap();
        }

        assert!(display.is_powered());
        assert_eq!(display.geometry(), (2, 16));
        assert_eq!(display.frame()[0], DisplayLine::blank());
        assert_eq!(display.frame()[1], DisplayLine::new("hi"));
        assert!(display.write_cell(2, 0, 'x').is_err());
    }
}
