//! Excel workbook loader
//!
//! Reads `.xlsx`, `.xls` and `.ods` workbooks through calamine into
//! [`MemoryGrid`]s. Cells keep their numeric or text nature; all semantic
//! parsing happens later against the inferred schema.

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

use sheetcfg_core::literal::{DATE_FORMAT, cell_label};
use sheetcfg_core::{CellValue, Grid, MemoryGrid, Result, SheetCfgError};

/// An open workbook
pub struct ExcelLoader {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl ExcelLoader {
    /// Open a workbook, detecting its format from the extension
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::SpreadsheetError` if the file cannot be opened
    pub fn open(path: &Path) -> Result<Self> {
        let workbook = open_workbook_auto(path).map_err(|e| {
            SheetCfgError::spreadsheet(format!("Failed to open {}: {e}", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in workbook order
    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Load one sheet into memory
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::SpreadsheetError` for missing sheets and error cells
    pub fn load_sheet(&mut self, sheet_name: &str) -> Result<MemoryGrid> {
        let range = self.workbook.worksheet_range(sheet_name).map_err(|e| {
            SheetCfgError::spreadsheet(format!(
                "Failed to read sheet {sheet_name} of {}: {e}",
                self.path.display()
            ))
        })?;
        let grid = range_to_grid(sheet_name, &range)?;
        debug!(
            "Loaded sheet {} with {} rows from {}",
            sheet_name,
            grid.row_count(),
            self.path.display()
        );
        Ok(grid)
    }
}

/// Copy a range into a grid anchored at `A1`
///
/// # Errors
///
/// Returns `SheetCfgError::SpreadsheetError` for cells holding spreadsheet errors
pub fn range_to_grid(sheet_name: &str, range: &Range<Data>) -> Result<MemoryGrid> {
    let (row0, col0) = range
        .start()
        .map_or((0, 0), |(r, c)| (r as usize, c as usize));
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row0];
    for (r, cells) in range.rows().enumerate() {
        let mut row = vec![CellValue::Empty; col0];
        for (c, cell) in cells.iter().enumerate() {
            let value = convert_cell(cell).map_err(|e| {
                SheetCfgError::spreadsheet(format!(
                    "{e} in sheet {sheet_name} at {}",
                    cell_label(row0 + r, col0 + c)
                ))
            })?;
            row.push(value);
        }
        rows.push(row);
    }
    Ok(MemoryGrid::new(sheet_name, rows))
}

/// Convert a calamine cell, rendering dates in the literal form the parser expects
fn convert_cell(cell: &Data) -> std::result::Result<CellValue, String> {
    let value = match cell {
        Data::Empty => CellValue::Empty,
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => dt
            .as_duration()
            .map_or(CellValue::Empty, |d| CellValue::Text(d.num_seconds().to_string())),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Empty, |d| CellValue::Text(d.format(DATE_FORMAT).to_string())),
        Data::DateTimeIso(s) => CellValue::Text(s.replace('T', " ")),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => return Err(format!("cell error {e:?}")),
    };
    Ok(value)
}
