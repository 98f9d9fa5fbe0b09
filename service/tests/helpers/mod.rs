//! Helpers shared by the integration tests

#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use sheetcfg_core::{MemoryGrid, SheetCfgConfig};
use std::path::Path;

/// Header of one column: rule, type, `name[=default]`, access, description
pub type Column<'a> = [&'a str; 5];

/// Build a sheet from column headers and data rows
pub fn sheet(name: &str, columns: &[Column<'_>], data: &[&[&str]]) -> MemoryGrid {
    MemoryGrid::from_text_rows(name, rows(columns, data))
}

/// The `id`, `name`, `scores` sheet used across tests
pub fn items_sheet() -> MemoryGrid {
    sheet(
        "ITEM",
        &[
            ["required", "int32", "id", "", "identifier"],
            ["optional", "string", "name", "", ""],
            ["repeated", "int32", "scores", "", ""],
        ],
        &[&["1", "Alice", "10;20;30"]],
    )
}

/// Configuration writing into `workspace`
pub fn config_in(workspace: &Path) -> SheetCfgConfig {
    SheetCfgConfig {
        workspace: workspace.to_path_buf(),
        ..SheetCfgConfig::default()
    }
}

/// Write sheets of text cells into an `.xlsx` file
///
/// Cells that parse as numbers are written as numbers, like a user typing
/// them into a spreadsheet.
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<&str>>)]) -> Result<(), Box<dyn std::error::Error>> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let (r, c) = (u32::try_from(r)?, u16::try_from(c)?);
                match cell.parse::<f64>() {
                    Ok(number) => worksheet.write_number(r, c, number)?,
                    Err(_) => worksheet.write_string(r, c, *cell)?,
                };
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Header rows plus data rows of a sheet, in row order
pub fn rows<'a>(columns: &[Column<'a>], data: &[&[&'a str]]) -> Vec<Vec<&'a str>> {
    let mut rows: Vec<Vec<&str>> = (0..5)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    rows.extend(data.iter().map(|row| row.to_vec()));
    rows
}
