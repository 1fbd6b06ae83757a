use std::ops::AddAssign;

use tracing::*;

use super::{DisplayDevice, DisplayError, DisplayLine, DISPLAY_ROWS};

/// Outcome of rendering one or more lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    /// Cells written successfully.
    pub writes: usize,
    /// Cells whose write failed, retried on the next render.
    pub failures: usize,
}

impl AddAssign for RenderReport {
    fn add_assign(&mut self, other: Self) {
        self.writes += other.writes;
        self.failures += other.failures;
    }
}

/// Writes only the cells that differ from what is already on the display.
///
/// The renderer remembers, per row, the characters it has successfully
/// written. Both rows start blank, matching a freshly cleared display. A cell
/// whose write fails keeps its previous content here, so it still differs on
/// the next render and gets written again.
#[derive(Debug, Clone)]
pub struct DifferentialRenderer {
    rows: [DisplayLine; DISPLAY_ROWS],
}

impl Default for DifferentialRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DifferentialRenderer {
    pub fn new() -> Self {
        Self {
            rows: [DisplayLine::blank(); DISPLAY_ROWS],
        }
    }

    /// What the renderer believes `row` currently shows.
    pub fn rendered(&self, row: usize) -> Option<&DisplayLine> {
        self.rows.get(row)
    }

    pub fn render<D: DisplayDevice + ?Sized>(
        &mut self,
        device: &mut D,
        row: usize,
        line: &DisplayLine,
    ) -> Result<RenderReport, DisplayError> {
        let rendered = self
            .rows
            .get_mut(row)
            .ok_or(DisplayError::RowOutOfRange {
                row,
                rows: DISPLAY_ROWS,
            })?;

        let mut report = RenderReport::default();
        for (column, (&wanted, shown)) in line
            .cells()
            .iter()
            .zip(rendered.cells_mut().iter_mut())
            .enumerate()
        {
            if wanted == *shown {
                continue;
            }

            match device.write_cell(row, column, wanted) {
                Ok(()) => {
                    *shown = wanted;
                    report.writes += 1;
                }
                Err(error) => {
                    report.failures += 1;
                    warn!("Failed to write {wanted:?} at row {row}, column {column}: {error}");
                }
            }
        }

        trace!("Row {row}: {line:?}, {report:?}");
        Ok(report)
    }
}
