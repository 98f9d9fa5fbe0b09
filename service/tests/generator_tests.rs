//! Integration tests for `.fbs` and `.proto` emission

mod helpers;

use helpers::sheet;
use pretty_assertions::assert_eq;
use sheetcfg_core::prelude::*;
use sheetcfg_service::generator::{
    FlatBuffersGenerator, GeneratorOptions, IndentStyle, ProtobufGenerator, SchemaGenerator,
    generator_for,
};
use sheetcfg_service::inference::infer_schema;
use sheetcfg_service::registry::EnumRegistry;

fn shop() -> (Schema, EnumRegistry) {
    let grid = sheet(
        "SHOP",
        &[
            ["required", "int32", "id", "", "item id"],
            ["optional", "enum.Rarity", "rarity", "", ""],
            ["optional", "1", "price", "", ""],
            ["optional", "uint32", "gold=10", "", ""],
            ["repeated", "1", "slots", "", ""],
            ["optional", "1", "slot", "", ""],
            ["optional", "int16", "level", "", ""],
            ["optional", "float", "weight", "", ""],
        ],
        &[&["1", "RARE", "", "5", "1", "", "3", "0.5"]],
    );
    let mut config = SheetCfgConfig::default();
    config.fixed32.enabled = true;
    let mut registry = EnumRegistry::new();
    let schema = infer_schema(&grid, &mut registry, &config).unwrap();
    (schema, registry)
}

#[test]
fn test_flatbuffers_files() {
    let (schema, registry) = shop();
    let files = FlatBuffersGenerator::new().generate_all(&schema, &registry).unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["shared_enum.fbs", "shared_FixedFloat32.fbs", "shop.fbs"]);

    assert_eq!(
        files[0].content,
        "namespace dataconfig;\n\
         \n\
         enum Rarity:ubyte {\n\
         \x20   RARE = 0,\n\
         }\n\
         \n"
    );
    assert_eq!(
        files[1].content,
        "namespace dataconfig;\n\
         \n\
         table FixedFloat32 {\n\
         \x20   memory:int;\n\
         }\n"
    );
    assert_eq!(
        files[2].content,
        r#"// Generated by sheetcfg from sheet SHOP

include "shared_enum.fbs";
include "shared_FixedFloat32.fbs";

namespace dataconfig;

table ShopPrice {
    gold:uint = 10;
}

table ShopSlot {
    level:short = 0;
}

// One row of sheet SHOP
table SHOP {
    // item id
    id:int (key);
    rarity:Rarity = RARE;
    price:ShopPrice;
    slots:[ShopSlot];
    weight:FixedFloat32;
}

table SHOP_ARRAY {
    items:[SHOP];
}

root_type SHOP_ARRAY;
"#
    );
}

#[test]
fn test_protobuf_sheet() {
    let (schema, registry) = shop();
    let text = ProtobufGenerator::new().generate_sheet(&schema, &registry).unwrap();
    assert_eq!(
        text,
        r#"// Generated by sheetcfg from sheet SHOP
syntax = "proto2";

package dataconfig;

import "shared_enum.proto";
import "shared_FixedFloat32.proto";

message ShopPrice {
    optional uint32 gold = 1 [default = 10];
}

message ShopSlot {
    optional int32 level = 1 [default = 0];
}

// One row of sheet SHOP
message SHOP {
    // item id
    required int32 id = 1;
    optional Rarity rarity = 2 [default = RARE];
    optional ShopPrice price = 3;
    repeated ShopSlot slots = 4;
    optional FixedFloat32 weight = 5;
}

message SHOP_ARRAY {
    repeated SHOP items = 1;
}
"#
    );
}

#[test]
fn test_protobuf_shared_files() {
    let (schema, registry) = shop();
    let generator = ProtobufGenerator::new();
    let enums = generator.generate_enums(&registry).unwrap();
    assert!(enums.contains("enum Rarity {\n    RARE = 0;\n}"), "{enums}");
    let fixed = generator.generate_fixed("FixedFloat32", ScalarType::UInt32).unwrap();
    assert!(fixed.ends_with("message FixedFloat32 {\n    required uint32 memory = 1;\n}\n"), "{fixed}");
    assert_eq!(generator.sheet_filename(&schema), "shop.proto");
}

#[test]
fn test_access_filter_and_options() {
    let grid = sheet(
        "NPC",
        &[
            ["required", "int32", "id", "", ""],
            ["optional", "string", "dialog", "c", ""],
            ["optional", "1", "ai", "", ""],
            ["optional", "int32", "aggro", "s", ""],
        ],
        &[],
    );
    let mut registry = EnumRegistry::new();
    let schema = infer_schema(&grid, &mut registry, &SheetCfgConfig::default()).unwrap();

    let options = GeneratorOptions::new()
        .with_namespace("game.npc")
        .with_access(FieldAccess::Client)
        .with_indent(IndentStyle::Tabs);
    let text = generator_for(BinaryFormat::Flatbuffers, options)
        .generate_sheet(&schema, &registry)
        .unwrap();
    assert!(text.contains("namespace game.npc;"));
    assert!(text.contains("table NPC {\n\tid:int (key);\n\tdialog:string;\n}"), "{text}");
    assert!(!text.contains("NpcAi"), "{text}");
    assert!(!text.contains("include"));
}

#[test]
fn test_no_enum_file_without_cases() {
    let (schema, _) = shop();
    let files = ProtobufGenerator::new()
        .generate_all(&schema, &EnumRegistry::new())
        .unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["shared_FixedFloat32.proto", "shop.proto"]);
}
