//! Workbook loading
//!
//! Only sheets whose names follow the export convention are turned into
//! schemas; everything else in a workbook (notes, lookup tables, scratch
//! sheets) is left alone.

pub mod excel;

pub use excel::{ExcelLoader, range_to_grid};

/// Whether a sheet takes part in export
///
/// With `uppercase_only`, a sheet qualifies when its name has at least one
/// letter and no lowercase letters, such as `ITEM` or `HERO_2`.
#[must_use]
pub fn is_export_sheet(sheet_name: &str, uppercase_only: bool) -> bool {
    let name = sheet_name.trim();
    if name.is_empty() {
        return false;
    }
    if !uppercase_only {
        return true;
    }
    name.chars().any(char::is_alphabetic) && !name.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_sheet_names() {
        assert!(is_export_sheet("ITEM", true));
        assert!(is_export_sheet("HERO_2", true));
        assert!(!is_export_sheet("Notes", true));
        assert!(!is_export_sheet("123", true));
        assert!(is_export_sheet("Notes", false));
        assert!(!is_export_sheet("  ", false));
    }
}
