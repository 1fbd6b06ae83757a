//! HD44780 character LCD behind a PCF8574 I2C port expander.
//!
//! The expander drives the controller in 4-bit mode. Its pins are wired as
//! P0 RS, P1 RW, P2 EN, P3 backlight and P4..P7 to D4..D7, which is the layout
//! of the common "I2C LCD1602" backpacks.

use std::path::Path;

use embedded_hal::{
    delay::DelayNs,
    i2c::{Error as _, I2c},
};
use tracing::*;

use super::{check_bounds, DisplayDevice, DisplayError, DISPLAY_ROWS};

pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;

// Expander pins
const REGISTER_SELECT: u8 = 1 << 0;
const READ_WRITE: u8 = 1 << 1;
const ENABLE: u8 = 1 << 2;
const BACKLIGHT: u8 = 1 << 3;

// Controller instructions
const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const ENTRY_INCREMENT: u8 = 0x02;
const DISPLAY_CONTROL: u8 = 0x08;
const DISPLAY_ON: u8 = 0x04;
const FUNCTION_SET: u8 = 0x20;
const FUNCTION_4_BIT: u8 = 0x00;
const FUNCTION_8_BIT: u8 = 0x10;
const FUNCTION_TWO_LINES: u8 = 0x08;
const SET_DDRAM_ADDRESS: u8 = 0x80;

const ROW_OFFSETS: [u8; DISPLAY_ROWS] = [0x00, 0x40];

pub struct Hd44780<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    backlight: bool,
    // A bus error may have split a byte, the next access resets the interface first
    resync: bool,
}

impl<I: I2c, D: DelayNs> Hd44780<I, D> {
    /// Initialize the controller: 4-bit, two lines, display off and cleared,
    /// backlight off.
    pub fn new(i2c: I, delay: D, address: u8) -> Result<Self, DisplayError> {
        let mut display = Self {
            i2c,
            delay,
            address,
            backlight: false,
            resync: false,
        };
        display.initialize()?;
        Ok(display)
    }

    fn initialize(&mut self) -> Result<(), DisplayError> {
        // Power-on wait, the controller needs >40ms after Vcc rises
        self.delay.delay_ms(50);
        self.expander_write(0)?;

        self.reset_interface()?;
        self.command(DISPLAY_CONTROL)?;
        self.command(CLEAR_DISPLAY)?;
        self.delay.delay_us(2_000);
        self.command(ENTRY_MODE_SET | ENTRY_INCREMENT)?;

        debug!("HD44780 at {:#04x} initialized", self.address);
        Ok(())
    }

    /// Reset by instruction: three times 8-bit, then switch to 4-bit. Works
    /// from any nibble phase.
    fn reset_interface(&mut self) -> Result<(), DisplayError> {
        for wait_us in [4_500, 4_500, 150] {
            self.write_nibble(FUNCTION_SET | FUNCTION_8_BIT, 0)?;
            self.delay.delay_us(wait_us);
        }
        self.write_nibble(FUNCTION_SET | FUNCTION_4_BIT, 0)?;

        self.command(FUNCTION_SET | FUNCTION_4_BIT | FUNCTION_TWO_LINES)
    }

    /// Bring the interface back in phase without clearing DDRAM, restoring
    /// the last requested power state.
    fn resynchronize(&mut self) -> Result<(), DisplayError> {
        self.reset_interface()?;
        self.command(self.display_control())?;
        self.command(ENTRY_MODE_SET | ENTRY_INCREMENT)?;

        info!("HD44780 at {:#04x} resynchronized", self.address);
        Ok(())
    }

    /// Run `operation`, resynchronizing first if an earlier one failed.
    fn in_sync(
        &mut self,
        operation: impl FnOnce(&mut Self) -> Result<(), DisplayError>,
    ) -> Result<(), DisplayError> {
        let result = if self.resync {
            self.resynchronize().and_then(|()| operation(self))
        } else {
            operation(self)
        };

        self.resync = result.is_err();
        if let Err(error) = &result {
            warn!("HD44780 access failed, resetting on the next one: {error}");
        }
        result
    }

    fn display_control(&self) -> u8 {
        if self.backlight {
            DISPLAY_CONTROL | DISPLAY_ON
        } else {
            DISPLAY_CONTROL
        }
    }

    fn expander_write(&mut self, pins: u8) -> Result<(), DisplayError> {
        let pins = if self.backlight {
            pins | BACKLIGHT
        } else {
            pins & !BACKLIGHT
        };

        self.i2c
            .write(self.address, &[pins & !READ_WRITE])
            .map_err(|error| DisplayError::Bus(format!("{:?}", error.kind())))
    }

    /// Latch the upper four bits of `value` on D4..D7.
    fn write_nibble(&mut self, value: u8, mode: u8) -> Result<(), DisplayError> {
        let pins = (value & 0xF0) | mode;
        self.expander_write(pins | ENABLE)?;
        self.delay.delay_us(1);
        self.expander_write(pins)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), DisplayError> {
        self.write_nibble(value, mode)?;
        self.write_nibble(value << 4, mode)
    }

    fn command(&mut self, value: u8) -> Result<(), DisplayError> {
        self.send(value, 0)
    }
}

impl<I: I2c, D: DelayNs> DisplayDevice for Hd44780<I, D> {
    fn set_power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.backlight = on;
        self.in_sync(|display| display.command(display.display_control()))
    }

    fn write_cell(
        &mut self,
        row: usize,
        column: usize,
        character: char,
    ) -> Result<(), DisplayError> {
        check_bounds(row, column)?;

        self.in_sync(|display| {
            display.command(SET_DDRAM_ADDRESS | (ROW_OFFSETS[row] + column as u8))?;
            display.send(glyph(character), REGISTER_SELECT)
        })
    }
}

/// The character ROM matches ASCII for printable characters only.
fn glyph(character: char) -> u8 {
    if character.is_ascii() && !character.is_ascii_control() {
        character as u8
    } else {
        b'?'
    }
}

/// Open the display on a Linux I2C character device such as `/dev/i2c-1`.
#[cfg(target_os = "linux")]
pub fn open(bus: &Path, address: u8) -> Result<Box<dyn DisplayDevice>, DisplayError> {
    let to_open_error = |reason: String| DisplayError::Open {
        bus: bus.display().to_string(),
        reason,
    };

    let i2c = linux_embedded_hal::I2cdev::new(bus)
        .map_err(|error| to_open_error(format!("{error:?}")))?;
    let display = Hd44780::new(i2c, linux_embedded_hal::Delay, address)
        .map_err(|error| to_open_error(error.to_string()))?;

    Ok(Box::new(display))
}

#[cfg(not(target_os = "linux"))]
pub fn open(bus: &Path, _address: u8) -> Result<Box<dyn DisplayDevice>, DisplayError> {
    Err(DisplayError::Open {
        bus: bus.display().to_string(),
        reason: "I2C displays are only supported on Linux".into(),
    })
}
