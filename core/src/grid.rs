//! Read-only access to a sheet's cell grid
//!
//! Inference and encoding only ever look at cells through [`Grid`], so the
//! same code runs against workbooks loaded from disk and grids built in tests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row holding the field rule (`optional`, `required`, `repeated`)
pub const ROW_RULE: usize = 0;
/// Row holding the field type token
pub const ROW_TYPE: usize = 1;
/// Row holding `name` or `name=default`
pub const ROW_NAME: usize = 2;
/// Row holding the access scope
pub const ROW_ACCESS: usize = 3;
/// Row holding the free-text description
pub const ROW_DESCRIPTION: usize = 4;
/// First data row
pub const ROW_DATA: usize = 5;

/// Loosely typed cell content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Kind of a cell, without its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Empty,
    Text,
    Number,
    Bool,
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    #[must_use]
    pub fn cell_type(&self) -> CellType {
        match self {
            Self::Empty => CellType::Empty,
            Self::Text(_) => CellType::Text,
            Self::Number(_) => CellType::Number,
            Self::Bool(_) => CellType::Bool,
        }
    }

    /// Empty cells and whitespace-only text both count as empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual rendering; integral numbers print without a fraction
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Two-dimensional cell source for one sheet
pub trait Grid {
    fn sheet_name(&self) -> &str;

    fn row_count(&self) -> usize;

    fn col_count(&self) -> usize;

    /// Cell content; out-of-range coordinates read as empty
    fn cell(&self, row: usize, col: usize) -> &CellValue;

    fn cell_type(&self, row: usize, col: usize) -> CellType {
        self.cell(row, col).cell_type()
    }

    /// Trimmed text of a cell
    fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).text()
    }

    /// Data rows carrying a record; rows with an empty first cell are skipped
    fn data_rows(&self) -> Vec<usize> {
        (ROW_DATA..self.row_count())
            .filter(|&r| !self.cell(r, 0).is_empty())
            .collect()
    }
}

/// Grid held entirely in memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGrid {
    name: String,
    rows: Vec<Vec<CellValue>>,
    cols: usize,
}

impl MemoryGrid {
    /// Build a grid from rows; short rows are padded with empty cells
    #[must_use]
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            rows,
            cols,
        }
    }

    /// Build a grid from text rows, empty strings becoming empty cells
    #[must_use]
    pub fn from_text_rows<R, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| CellValue::from(cell.as_ref()))
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.cols = self.cols.max(row.len());
        self.rows.push(row);
    }
}

impl Grid for MemoryGrid {
    fn sheet_name(&self) -> &str {
        &self.name
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_rendering() {
        assert_eq!(CellValue::Number(3.0).text(), "3");
        assert_eq!(CellValue::Number(-12.0).text(), "-12");
        assert_eq!(CellValue::Number(2.5).text(), "2.5");
        assert_eq!(CellValue::Bool(true).text(), "true");
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let grid = MemoryGrid::from_text_rows("ITEM", [["a", "b"], ["c", ""]]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.col_count(), 2);
        assert_eq!(grid.text(0, 1), "b");
        assert!(grid.cell(1, 1).is_empty());
        assert_eq!(grid.cell_type(7, 9), CellType::Empty);
    }

    #[test]
    fn test_ragged_rows_padded() {
        let mut grid = MemoryGrid::new("ITEM", vec![vec![CellValue::from("x")]]);
        grid.push_row(vec![CellValue::from(1_i64), CellValue::from(2_i64), CellValue::from(3_i64)]);
        assert_eq!(grid.col_count(), 3);
        assert!(grid.cell(0, 2).is_empty());
        assert_eq!(grid.text(1, 2), "3");
    }

    #[test]
    fn test_data_rows_skip_blank_first_cell() {
        let mut rows = vec![vec!["h"]; ROW_DATA];
        rows.push(vec!["1"]);
        rows.push(vec![""]);
        rows.push(vec!["3"]);
        let grid = MemoryGrid::from_text_rows("ITEM", rows);
        assert_eq!(grid.data_rows(), vec![5, 7]);
    }

    #[test]
    fn test_whitespace_text_is_empty() {
        assert!(CellValue::Text("   ".to_string()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }
}
