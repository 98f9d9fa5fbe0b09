//! Property-based tests for fixed-point, enum ordinals and row ordering
//!
//! These run the real inference, encoding and decoding paths over randomly
//! generated inputs.

mod helpers;

use helpers::sheet;
use proptest::prelude::*;
use sheetcfg_core::FixedCodec;
use sheetcfg_core::prelude::*;
use sheetcfg_service::decoder::{DecodeOptions, decode_sheet};
use sheetcfg_service::encoder::{EncodeOptions, encode_sheet};
use sheetcfg_service::inference::infer_schema;
use sheetcfg_service::registry::EnumRegistry;

// Strategy: a 32-bit codec together with a value it represents without clamping
fn codec_and_value() -> impl Strategy<Value = (FixedCodec, f64)> {
    (1u32..24).prop_flat_map(|bits| {
        let codec = FixedCodec::new(bits, 32).unwrap();
        (Just(codec), codec.min_value()..codec.max_value())
    })
}

// Strategy: upper-case case names
fn case_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z]{1,6}", 0..max)
}

fn roundtrip_rows(grid: &MemoryGrid, format: BinaryFormat) -> serde_json::Value {
    let mut registry = EnumRegistry::new();
    let config = SheetCfgConfig::default();
    let schema = infer_schema(grid, &mut registry, &config).unwrap();
    let bytes = encode_sheet(&schema, grid, &registry, EncodeOptions::default(), format).unwrap();
    decode_sheet(&schema, &registry, DecodeOptions::default(), format, &bytes).unwrap()
}

proptest! {
    #[test]
    fn test_fixed_point_reencode_is_stable((codec, value) in codec_and_value(), signed in any::<bool>()) {
        let memory = codec.encode(value, signed);
        let decoded = codec.decode(memory);
        prop_assert_eq!(codec.encode(decoded, signed), memory);
        prop_assert!((decoded - value).abs() < codec.resolution());
    }

    #[test]
    fn test_fixed_point_signedness_decodes_alike((codec, value) in codec_and_value()) {
        let signed = codec.decode(codec.encode(value, true));
        let unsigned = codec.decode(codec.encode(value, false));
        prop_assert_eq!(signed.to_bits(), unsigned.to_bits());
    }

    #[test]
    fn test_enum_ordinals_never_renumber(first in case_names(8), second in case_names(8)) {
        let mut registry = EnumRegistry::new();
        registry.import_cases("Kind", &first, false, "");
        let before: Vec<(String, u32)> = registry
            .sorted_cases("Kind")
            .into_iter()
            .map(|(name, ordinal)| (name.to_string(), ordinal))
            .collect();

        // a later sheet lists new names first and old names backwards
        let mut later = second.clone();
        later.extend(first.iter().rev().cloned());
        registry.import_cases("Kind", &later, false, "");

        for (name, ordinal) in &before {
            prop_assert_eq!(registry.ordinal("Kind", name), Some(*ordinal));
        }
        let ordinals: Vec<u32> = registry.sorted_cases("Kind").iter().map(|(_, o)| *o).collect();
        let dense: Vec<u32> = (0..u32::try_from(ordinals.len()).unwrap()).collect();
        prop_assert_eq!(ordinals, dense);
    }

    #[test]
    fn test_decoded_rows_are_sorted_by_id(ids in prop::collection::vec(any::<i32>(), 1..16)) {
        let cells: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let data: Vec<[&str; 1]> = cells.iter().map(|c| [c.as_str()]).collect();
        let data: Vec<&[&str]> = data.iter().map(|row| row.as_slice()).collect();
        let grid = sheet("ITEM", &[["required", "int32", "id", "", ""]], &data);

        let mut expected = ids.clone();
        expected.sort_unstable();
        for format in [BinaryFormat::Flatbuffers, BinaryFormat::Protobuf] {
            let rows = roundtrip_rows(&grid, format);
            let decoded: Vec<i64> = rows
                .as_array()
                .unwrap()
                .iter()
                .map(|row| row["id"].as_i64().unwrap())
                .collect();
            let expected: Vec<i64> = expected.iter().copied().map(i64::from).collect();
            prop_assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn test_integers_clamp_to_their_width(value in any::<i64>()) {
        let cell = value.to_string();
        let grid = sheet(
            "ITEM",
            &[["required", "int32", "id", "", ""], ["optional", "int8", "tier", "", ""]],
            &[&["1", cell.as_str()]],
        );
        let rows = roundtrip_rows(&grid, BinaryFormat::Protobuf);
        prop_assert_eq!(rows[0]["tier"].as_i64(), Some(value.clamp(-128, 127)));
    }
}
