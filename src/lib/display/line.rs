use std::fmt;

/// Number of physical rows on the character display.
pub const DISPLAY_ROWS: usize = 2;
/// Number of character cells on each row.
pub const DISPLAY_COLUMNS: usize = 16;

/// Exactly one row worth of characters, blank padded.
///
/// Text longer than [`DISPLAY_COLUMNS`] is truncated, shorter text is padded
/// with spaces, so every cell always holds a character.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayLine([char; DISPLAY_COLUMNS]);

impl DisplayLine {
    pub const fn blank() -> Self {
        Self([' '; DISPLAY_COLUMNS])
    }

    pub fn new(text: &str) -> Self {
        let mut cells = [' '; DISPLAY_COLUMNS];
        for (cell, character) in cells.iter_mut().zip(text.chars()) {
            *cell = character;
        }
        Self(cells)
    }

    pub fn cells(&self) -> &[char; DISPLAY_COLUMNS] {
        &self.0
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [char; DISPLAY_COLUMNS] {
        &mut self.0
    }

    pub fn get(&self, column: usize) -> Option<char> {
        self.0.get(column).copied()
    }

    /// The text without trailing padding.
    pub fn trimmed(&self) -> String {
        self.to_string().trim_end().to_string()
    }
}

impl Default for DisplayLine {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|character| write!(f, "{character}"))
    }
}

impl fmt::Debug for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayLine({:?})", self.to_string())
    }
}
