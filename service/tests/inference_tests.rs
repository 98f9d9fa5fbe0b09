//! Integration tests for schema inference through `infer_schema`

mod helpers;

use helpers::{rows, sheet};
use pretty_assertions::assert_eq;
use sheetcfg_core::prelude::*;
use sheetcfg_service::inference::infer_schema;
use sheetcfg_service::registry::EnumRegistry;

fn member_names(schema: &Schema, table: FieldId) -> Vec<String> {
    schema
        .table(table)
        .unwrap()
        .members
        .iter()
        .map(|&m| schema.field(m).name.clone())
        .collect()
}

#[test]
fn test_hero_sheet_structure() {
    let grid = sheet(
        "HERO",
        &[
            ["required", "int32", "id", "", "hero id"],
            ["optional", "enum.HeroClass", "class", "", ""],
            ["optional", "2", "stats", "", ""],
            ["optional", "int32", "hp", "", ""],
            ["optional", "int32", "mp", "s", ""],
            ["repeated", "2", "skills", "", ""],
            ["optional", "2", "skill", "", ""],
            ["optional", "int32", "skill_id", "", ""],
            ["optional", "uint8", "level=1", "", ""],
            ["optional", "int32", "skill_id", "", ""],
            ["optional", "uint8", "level=1", "", ""],
            ["optional", "date", "released", "c", ""],
        ],
        &[&["1", "WARRIOR", "", "100", "20", "2", "", "11", "1", "12", "3", "2024-01-01 00:00:00"]],
    );
    let mut registry = EnumRegistry::new();
    let schema = infer_schema(&grid, &mut registry, &SheetCfgConfig::default()).unwrap();

    let root = schema.root().unwrap();
    assert_eq!(schema.root_type_name().unwrap(), "HERO");
    assert_eq!(
        member_names(&schema, root),
        ["id", "class", "stats", "skills", "released"]
    );

    let stats = schema.layout("HeroStats").unwrap();
    assert_eq!(member_names(&schema, stats), ["hp", "mp"]);
    let skill = schema.layout("HeroSkill").unwrap();
    assert_eq!(member_names(&schema, skill), ["skill_id", "level"]);

    let skills = schema.field(schema.table(root).unwrap().members[3]);
    let array = skills.as_array().unwrap();
    assert_eq!(array.count, 2);
    assert_eq!(skills.offset, 5);
    assert_eq!(schema.field(array.elements[1]).offset, 9);

    assert_eq!(schema.id_field().map(|id| schema.field(id).name.as_str()), Some("id"));
    assert_eq!(registry.ordinal("HeroClass", "WARRIOR"), Some(0));
}

#[test]
fn test_access_filter_drops_fields_and_empty_tables() {
    let grid = sheet(
        "SHOP",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "1", "secret", "s", ""],
            ["optional", "int32", "margin", "s", ""],
            ["optional", "string", "title", "c", ""],
            ["optional", "1", "server_only", "", ""],
            ["optional", "int32", "cost", "s", ""],
        ],
        &[],
    );
    let schema = infer_schema(&grid, &mut EnumRegistry::new(), &SheetCfgConfig::default()).unwrap();
    let root = schema.root().unwrap();
    let names = |access| -> Vec<String> {
        schema
            .exported_members(root, access)
            .iter()
            .map(|&m| schema.field(m).name.clone())
            .collect()
    };

    assert_eq!(names(FieldAccess::Default), ["id", "secret", "title", "server_only"]);
    assert_eq!(names(FieldAccess::Client), ["id", "title"]);
    assert_eq!(names(FieldAccess::Server), ["id", "secret", "server_only"]);
    assert_eq!(schema.slot_of("SHOP", "title", FieldAccess::Client), Some(1));
}

#[test]
fn test_comment_column_is_skipped() {
    let grid = sheet(
        "ITEM",
        &[
            ["required", "int32", "id", "", ""],
            ["", "", "designer notes", "", ""],
            ["optional", "string", "name", "", ""],
        ],
        &[&["1", "anything", "Sword"]],
    );
    let schema = infer_schema(&grid, &mut EnumRegistry::new(), &SheetCfgConfig::default()).unwrap();
    let root = schema.root().unwrap();
    assert_eq!(member_names(&schema, root), ["id", "name"]);
    assert_eq!(schema.field(schema.table(root).unwrap().members[1]).offset, 2);
}

#[test]
fn test_rejected_sheet_leaves_registry_unchanged() {
    let grid = sheet(
        "BROKEN",
        &[
            ["optional", "enum.Color", "color", "", ""],
            ["optional", "vector3", "pos", "", ""],
        ],
        &[&["RED", "1"]],
    );
    let mut registry = EnumRegistry::new();
    let err = infer_schema(&grid, &mut registry, &SheetCfgConfig::default()).unwrap_err();
    assert!(matches!(err, SheetCfgError::UnresolvedType { .. }), "{err}");
    assert!(err.to_string().contains("B2"), "{err}");
    assert!(registry.is_empty());
}

#[test]
fn test_same_type_name_in_any_member_order() {
    let grid = sheet(
        "ROUTE",
        &[
            ["optional", "2", "src=point", "", ""],
            ["optional", "int32", "x", "", ""],
            ["optional", "int32", "y", "", ""],
            ["optional", "2", "dst=point", "", ""],
            ["optional", "int32", "y", "", ""],
            ["optional", "int32", "x", "", ""],
        ],
        &[],
    );
    let schema = infer_schema(&grid, &mut EnumRegistry::new(), &SheetCfgConfig::default()).unwrap();
    let point = schema.layout("RoutePoint").unwrap();
    assert_eq!(member_names(&schema, point), ["x", "y"]);
    assert_eq!(schema.slot_of("RoutePoint", "y", FieldAccess::Default), Some(1));
}

#[test]
fn test_same_type_name_with_different_members() {
    let grid = sheet(
        "ROUTE",
        &[
            ["optional", "1", "src=point", "", ""],
            ["optional", "int32", "x", "", ""],
            ["optional", "1", "dst=point", "", ""],
            ["optional", "int32", "z", "", ""],
        ],
        &[],
    );
    let err = infer_schema(&grid, &mut EnumRegistry::new(), &SheetCfgConfig::default()).unwrap_err();
    assert!(matches!(err, SheetCfgError::SchemaShapeMismatch { ref type_name, .. } if type_name == "RoutePoint"));
}

#[test]
fn test_same_type_name_with_different_access() {
    let grid = sheet(
        "ROUTE",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "1", "src=point", "", ""],
            ["optional", "int32", "x", "s", ""],
            ["optional", "1", "dst=point", "", ""],
            ["optional", "int32", "x", "", ""],
        ],
        &[&["1", "", "5", "", "6"]],
    );
    let config = SheetCfgConfig {
        access: FieldAccess::Client,
        ..SheetCfgConfig::default()
    };
    let err = infer_schema(&grid, &mut EnumRegistry::new(), &config).unwrap_err();
    assert!(
        matches!(err, SheetCfgError::SchemaShapeMismatch { ref type_name, .. } if type_name == "RoutePoint"),
        "{err}"
    );
    assert!(err.to_string().contains("access"), "{err}");
}

#[test]
fn test_type_name_keeps_inner_capitals() {
    let grid = sheet(
        "HERO_INFO",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "1", "HPMax", "", ""],
            ["optional", "int32", "value", "", ""],
            ["optional", "1", "base_MP", "", ""],
            ["optional", "int32", "value", "", ""],
        ],
        &[],
    );
    let schema = infer_schema(&grid, &mut EnumRegistry::new(), &SheetCfgConfig::default()).unwrap();
    assert!(schema.layout("HeroInfoHPMax").is_some());
    assert!(schema.layout("HeroInfoBaseMP").is_some());
}

#[test]
fn test_numeric_cells_never_become_enum_cases() {
    let mut cells: Vec<Vec<CellValue>> = rows(
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "enum.HeroClass", "class", "", ""],
        ],
        &[&["1", "MAGE"], &["2", ""]],
    )
    .into_iter()
    .map(|row| row.into_iter().map(CellValue::from).collect())
    .collect();
    cells[6][1] = CellValue::Number(3.0);
    let grid = MemoryGrid::new("HERO", cells);

    let mut registry = EnumRegistry::new();
    infer_schema(&grid, &mut registry, &SheetCfgConfig::default()).unwrap();
    assert_eq!(registry.sorted_cases("HeroClass"), vec![("MAGE", 0)]);
}

#[test]
fn test_fixed_point_from_config() {
    let grid = sheet(
        "UNIT",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "float", "speed=1.5", "", ""],
            ["optional", "double", "mass", "", ""],
        ],
        &[],
    );
    let mut config = SheetCfgConfig::default();
    config.fixed32.enabled = true;
    config.unsigned_encoding = true;
    let schema = infer_schema(&grid, &mut EnumRegistry::new(), &config).unwrap();
    let root = schema.table(schema.root().unwrap()).unwrap();

    let speed = schema.field(root.members[1]);
    assert_eq!(speed.tag, FieldTag::FixedFloat32);
    let memory = schema.field(speed.as_table().unwrap().members[0]);
    assert_eq!(memory.kind, FieldKind::Scalar(ScalarType::UInt32));

    let mass = schema.field(root.members[2]);
    assert_eq!(mass.tag, FieldTag::None);
    assert_eq!(mass.kind, FieldKind::Scalar(ScalarType::Float64));
}

#[test]
fn test_rows_with_empty_first_cell_are_not_data() {
    let grid = sheet(
        "ITEM",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "enum.Kind", "kind", "", ""],
        ],
        &[&["1", "A"], &["", "B"], &["2", "C"]],
    );
    assert_eq!(grid.data_rows(), vec![5, 7]);
    let mut registry = EnumRegistry::new();
    infer_schema(&grid, &mut registry, &SheetCfgConfig::default()).unwrap();
    assert_eq!(registry.sorted_cases("Kind"), vec![("A", 0), ("C", 1)]);
}
