//! Enum case discovery from data rows

use tracing::debug;

use sheetcfg_core::literal::split_list;
use sheetcfg_core::{CellType, FieldId, FieldKind, Grid, Schema};

use crate::registry::EnumRegistry;

/// Distinct case names found in a column, in first-seen order
///
/// Only text cells name cases; numbers, bools and dates are ignored.
pub fn unique_values<G: Grid + ?Sized>(grid: &G, col: usize) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for row in grid.data_rows() {
        if grid.cell_type(row, col) != CellType::Text {
            continue;
        }
        for value in split_list(&grid.text(row, col)) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// Register every enum case used by the sheet and settle each enum field's
/// default case
///
/// Fields are visited in column order so that new cases are numbered the way
/// they appear in the sheet.
pub fn resolve_enums<G: Grid + ?Sized>(
    schema: &mut Schema,
    grid: &G,
    registry: &mut EnumRegistry,
    auto_default_case: bool,
) {
    let mut enum_fields: Vec<(usize, FieldId)> = schema
        .fields()
        .filter(|(_, f)| matches!(f.kind, FieldKind::Enum(_)))
        .map(|(id, f)| (f.offset, id))
        .collect();
    enum_fields.sort_unstable();

    for (col, id) in enum_fields {
        let field = schema.field(id);
        let FieldKind::Enum(ref e) = field.kind else {
            continue;
        };
        let enum_name = e.enum_name.clone();
        let preferred = field.default.clone();
        let repeated = field.is_repeated();
        let discovered = unique_values(grid, col);
        debug!(
            "enum {} at {}: {} distinct values",
            enum_name,
            field.column(),
            discovered.len()
        );
        let resolved = registry.import_cases(&enum_name, &discovered, auto_default_case, &preferred);
        schema.field_mut(id).default = if repeated {
            String::new()
        } else {
            resolved.unwrap_or_default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceOptions, SchemaInferencer};
    use sheetcfg_core::MemoryGrid;

    #[test]
    fn test_scan_registers_cases_in_column_order() {
        let grid = MemoryGrid::from_text_rows(
            "HERO",
            [
                ["required", "optional", "repeated"],
                ["int32", "enum.HeroClass", "enum.HeroClass"],
                ["id", "class", "allowed"],
                ["", "", ""],
                ["", "", ""],
                ["1", "MAGE", "MAGE;ROGUE"],
                ["2", "WARRIOR", "PRIEST"],
                ["", "IGNORED", ""],
            ],
        );
        let mut schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let mut registry = EnumRegistry::new();
        resolve_enums(&mut schema, &grid, &mut registry, true);

        assert_eq!(
            registry.sorted_cases("HeroClass"),
            vec![
                ("HC_NONE", 0),
                ("MAGE", 1),
                ("WARRIOR", 2),
                ("ROGUE", 3),
                ("PRIEST", 4)
            ]
        );
        assert_eq!(registry.ordinal("HeroClass", "IGNORED"), None);

        let root = schema.table(schema.root().unwrap()).unwrap();
        assert_eq!(schema.field(root.members[1]).default, "HC_NONE");
        assert!(schema.field(root.members[2]).default.is_empty());
    }
}
