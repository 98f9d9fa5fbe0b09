//! Binary encoding of sheet rows
//!
//! [`RecordEncoder`] walks a sheet's schema together with its data rows and
//! drives a [`BinaryBuilder`]. Two sinks are provided:
//!
//! - **FlatBuffers** (`flatbuffers.rs`) - tables written back to front
//! - **Protocol Buffers** (`protobuf.rs`) - proto2 wire format via `prost`
//!
//! Every row becomes one record of the sheet's root type. The rows are sorted
//! by `id` when the sheet has such a column and wrapped into a single
//! `<SHEET>_ARRAY` record whose only field is the `items` vector.

pub mod flatbuffers;
pub mod protobuf;
pub mod traits;

pub use self::flatbuffers::FlatBuffersBuilder;
pub use self::protobuf::{ProtoRef, ProtobufBuilder};
pub use self::traits::{BinaryBuilder, Scalar, VectorKind};

use std::cmp::Ordering;

use tracing::{debug, warn};

use sheetcfg_core::literal::{
    cell_label, parse_bool, parse_date, parse_duration, parse_float, parse_int, split_list,
};
use sheetcfg_core::{
    BinaryFormat, Field, FieldAccess, FieldId, FieldKind, FieldTag, FixedCodec, Grid, Result,
    ScalarType, Schema, SheetCfgConfig, SheetCfgError,
};

use crate::registry::EnumRegistry;

/// Run settings the encoder needs
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Only fields visible to this side are written
    pub access: FieldAccess,
    /// Hours east of UTC for date cells
    pub time_zone: f64,
    pub fixed32: Option<FixedCodec>,
    pub fixed64: Option<FixedCodec>,
    /// Store fixed-point memory as unsigned integers
    pub unsigned_encoding: bool,
}

impl EncodeOptions {
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` for invalid fixed-point settings
    pub fn from_config(config: &SheetCfgConfig) -> Result<Self> {
        Ok(Self {
            access: config.access,
            time_zone: config.time_zone,
            fixed32: config.fixed32_codec()?,
            fixed64: config.fixed64_codec()?,
            unsigned_encoding: config.unsigned_encoding,
        })
    }

    fn codec(&self, tag: FieldTag) -> Option<FixedCodec> {
        match tag {
            FieldTag::FixedFloat32 => self.fixed32,
            FieldTag::FixedFloat64 => self.fixed64,
            FieldTag::None => None,
        }
    }
}

/// Value of one record member, ready to be attached
enum Member<R> {
    Scalar(Scalar, Scalar),
    Ref(R),
}

/// Sort key taken from a row's `id` cell
#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum SortKey {
    Number(f64),
    Text(String),
}

/// Walks schema and rows in lockstep
pub struct RecordEncoder<'a, G: Grid + ?Sized> {
    schema: &'a Schema,
    grid: &'a G,
    registry: &'a EnumRegistry,
    options: EncodeOptions,
}

impl<'a, G: Grid + ?Sized> RecordEncoder<'a, G> {
    #[must_use]
    pub fn new(schema: &'a Schema, grid: &'a G, registry: &'a EnumRegistry, options: EncodeOptions) -> Self {
        Self {
            schema,
            grid,
            registry,
            options,
        }
    }

    /// Data rows in output order
    ///
    /// Rows are sorted ascending by the `id` column when there is one:
    /// numerically for numeric types, as text otherwise. Ties keep sheet order.
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::MalformedLiteral` for a non-numeric id in a
    /// numeric column
    pub fn ordered_rows(&self) -> Result<Vec<usize>> {
        let rows = self.grid.data_rows();
        let Some(id) = self.schema.id_field() else {
            return Ok(rows);
        };
        let field = self.schema.field(id);
        let numeric = matches!(field.kind, FieldKind::Scalar(s) if s.is_numeric());
        let mut keyed = rows
            .into_iter()
            .map(|row| -> Result<(SortKey, usize)> {
                let text = self.grid.text(row, field.offset);
                let key = if numeric {
                    let value = match field.kind {
                        FieldKind::Scalar(ScalarType::Date) => {
                            f64::from(parse_date(&text, self.options.time_zone)?)
                        }
                        FieldKind::Scalar(ScalarType::Duration) => f64::from(parse_duration(&text)?),
                        _ => parse_float(&text)?,
                    };
                    SortKey::Number(value)
                } else {
                    SortKey::Text(text)
                };
                Ok((key, row))
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.with_location(field.column()))?;
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    /// Encode every data row and wrap them into the root array record
    ///
    /// # Errors
    ///
    /// Returns the first malformed cell, with its location
    pub fn encode_sheet<B: BinaryBuilder>(&self, mut builder: B) -> Result<Vec<u8>> {
        let root = self.schema.root()?;
        let rows = self.ordered_rows()?;
        let mut items = Vec::with_capacity(rows.len());
        for &row in &rows {
            items.push(self.encode_table(&mut builder, root, row)?);
        }
        builder.begin_vector(VectorKind::Refs, items.len());
        for &item in &items {
            builder.push_ref(item);
        }
        let items = builder.end_vector()?;
        builder.begin_record(&self.schema.root_array_name()?);
        builder.add_ref(0, items);
        let root_array = builder.end_record()?;
        debug!("encoded {} rows of {}", rows.len(), self.schema.sheet_name());
        builder.finish(root_array)
    }

    fn encode_table<B: BinaryBuilder>(&self, builder: &mut B, table: FieldId, row: usize) -> Result<B::Ref> {
        let type_name = self.schema.table(table)?.type_name.as_str();
        let access = self.options.access;
        let mut values = Vec::new();
        for member in self.schema.exported_members(table, access) {
            let field = self.schema.field(member);
            let slot = self
                .schema
                .slot_of(type_name, &field.name, access)
                .ok_or_else(|| {
                    SheetCfgError::generation(format!("no slot for {}.{}", type_name, field.name))
                })?;
            let value = self
                .encode_member(builder, member, row)
                .map_err(|e| e.with_location(cell_label(row, field.offset)))?;
            values.push((slot, value));
        }
        builder.begin_record(type_name);
        for (slot, value) in values {
            match value {
                Member::Scalar(v, d) => builder.add_scalar(slot, v, d),
                Member::Ref(r) => builder.add_ref(slot, r),
            }
        }
        builder.end_record()
    }

    fn encode_member<B: BinaryBuilder>(&self, builder: &mut B, id: FieldId, row: usize) -> Result<Member<B::Ref>> {
        let field = self.schema.field(id);
        let text = self.grid.text(row, field.offset);
        match &field.kind {
            FieldKind::Table(_) if field.tag != FieldTag::None => self.encode_fixed(builder, field, &text),
            FieldKind::Table(_) => Ok(Member::Ref(self.encode_table(builder, id, row)?)),
            FieldKind::Array(array) => {
                let populated = array_population(&text, array.count);
                let mut refs = Vec::with_capacity(populated);
                for &element in array.elements.iter().take(populated) {
                    refs.push(self.encode_table(builder, element, row)?);
                }
                builder.begin_vector(VectorKind::Refs, refs.len());
                for r in refs {
                    builder.push_ref(r);
                }
                Ok(Member::Ref(builder.end_vector()?))
            }
            FieldKind::Enum(e) if field.is_repeated() => {
                let repr = self.registry.repr(&e.enum_name);
                let ordinals = split_list(&text)
                    .iter()
                    .map(|case| self.enum_ordinal(&e.enum_name, case, field))
                    .collect::<Vec<_>>();
                builder.begin_vector(VectorKind::Scalars, ordinals.len());
                for ordinal in ordinals {
                    builder.push_scalar(Scalar::Enum(ordinal, repr));
                }
                Ok(Member::Ref(builder.end_vector()?))
            }
            FieldKind::Enum(e) => {
                let repr = self.registry.repr(&e.enum_name);
                let default = self.enum_ordinal(&e.enum_name, &field.default, field);
                let value = if text.trim().is_empty() {
                    default
                } else {
                    self.enum_ordinal(&e.enum_name, text.trim(), field)
                };
                Ok(Member::Scalar(Scalar::Enum(value, repr), Scalar::Enum(default, repr)))
            }
            FieldKind::Scalar(scalar) if field.is_repeated() => {
                let items = split_list(&text);
                if scalar.is_reference() {
                    let refs: Vec<_> = items.iter().map(|v| reference(builder, *scalar, v)).collect();
                    builder.begin_vector(VectorKind::Refs, refs.len());
                    for r in refs {
                        builder.push_ref(r);
                    }
                } else {
                    let values = items
                        .iter()
                        .map(|v| self.cell_scalar(*scalar, v))
                        .collect::<Result<Vec<_>>>()?;
                    builder.begin_vector(VectorKind::Scalars, values.len());
                    for v in values {
                        builder.push_scalar(v);
                    }
                }
                Ok(Member::Ref(builder.end_vector()?))
            }
            FieldKind::Scalar(scalar) if scalar.is_reference() => {
                let value = if text.is_empty() { field.default.as_str() } else { text.as_str() };
                Ok(Member::Ref(reference(builder, *scalar, value)))
            }
            FieldKind::Scalar(scalar) => {
                let default = default_scalar(*scalar, &field.default)?;
                let value = if text.trim().is_empty() {
                    default
                } else {
                    self.cell_scalar(*scalar, &text)?
                };
                Ok(Member::Scalar(value, default))
            }
        }
    }

    /// Wrap a float into its fixed-point record, or a vector of them
    fn encode_fixed<B: BinaryBuilder>(&self, builder: &mut B, field: &Field, text: &str) -> Result<Member<B::Ref>> {
        let codec = self.options.codec(field.tag).ok_or_else(|| {
            SheetCfgError::generation(format!("fixed-point field '{}' without a codec", field.name))
        })?;
        let memory_type = match (codec.total_bits(), self.options.unsigned_encoding) {
            (32, false) => ScalarType::Int32,
            (32, true) => ScalarType::UInt32,
            (_, false) => ScalarType::Int64,
            (_, true) => ScalarType::UInt64,
        };
        let type_name = field.tag.record_name().unwrap_or_default();
        let values = if field.is_repeated() {
            split_list(text)
        } else {
            vec![text.to_string()]
        };
        let mut records = Vec::with_capacity(values.len());
        for v in &values {
            let value = parse_float(v)?;
            if codec.clamps(value) {
                warn!(
                    "{} = {} is outside [{}, {}) and was clamped",
                    field.name,
                    value,
                    codec.min_value(),
                    codec.max_value()
                );
            }
            let memory = codec.encode(value, !self.options.unsigned_encoding);
            builder.begin_record(type_name);
            builder.add_scalar(0, integer_scalar(memory_type, memory), integer_scalar(memory_type, 0));
            records.push(builder.end_record()?);
        }
        if !field.is_repeated() {
            return records
                .pop()
                .map(Member::Ref)
                .ok_or_else(|| SheetCfgError::generation("fixed-point record missing"));
        }
        builder.begin_vector(VectorKind::Refs, records.len());
        for r in records {
            builder.push_ref(r);
        }
        Ok(Member::Ref(builder.end_vector()?))
    }

    /// Ordinal of a case, falling back to the field's default case
    fn enum_ordinal(&self, enum_name: &str, case: &str, field: &Field) -> u32 {
        if let Some(ordinal) = self.registry.ordinal(enum_name, case) {
            return ordinal;
        }
        if !case.is_empty() {
            warn!("unknown case '{case}' of enum {enum_name} in '{}'", field.name);
        }
        self.registry
            .ordinal(enum_name, &field.default)
            .or_else(|| {
                self.registry
                    .hook_default(enum_name)
                    .and_then(|d| self.registry.ordinal(enum_name, &d))
            })
            .unwrap_or(0)
    }

    fn cell_scalar(&self, scalar: ScalarType, text: &str) -> Result<Scalar> {
        let value = match scalar {
            ScalarType::Bool => Scalar::Bool(parse_bool(text)?),
            #[allow(clippy::cast_possible_truncation)]
            ScalarType::Float32 => Scalar::F32(parse_float(text)? as f32),
            ScalarType::Float64 => Scalar::F64(parse_float(text)?),
            ScalarType::Date => Scalar::U32(parse_date(text, self.options.time_zone)?),
            ScalarType::Duration => Scalar::U32(parse_duration(text)?),
            _ => integer_scalar(scalar, clamp_integer(scalar, parse_int(text)?)),
        };
        Ok(value)
    }
}

/// Scalar for a default literal in schema-text form
///
/// Date and duration defaults are already stored as seconds.
fn default_scalar(scalar: ScalarType, literal: &str) -> Result<Scalar> {
    let value = match scalar {
        ScalarType::Bool => Scalar::Bool(parse_bool(literal)?),
        #[allow(clippy::cast_possible_truncation)]
        ScalarType::Float32 => Scalar::F32(parse_float(literal)? as f32),
        ScalarType::Float64 => Scalar::F64(parse_float(literal)?),
        _ => integer_scalar(scalar, clamp_integer(scalar, parse_int(literal)?)),
    };
    Ok(value)
}

fn reference<B: BinaryBuilder>(builder: &mut B, scalar: ScalarType, value: &str) -> B::Ref {
    if scalar == ScalarType::Bytes {
        builder.create_bytes(value.as_bytes())
    } else {
        builder.create_string(value)
    }
}

/// Clamp into the type's range, logging when the cell did not fit
fn clamp_integer(scalar: ScalarType, value: i128) -> i128 {
    let Some((lo, hi)) = scalar.integer_range() else {
        return value;
    };
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        warn!("{value} does not fit {scalar} and was clamped to {clamped}");
    }
    clamped
}

/// Narrow an in-range integer into its scalar variant
fn integer_scalar(scalar: ScalarType, value: i128) -> Scalar {
    match scalar {
        ScalarType::Int8 => Scalar::I8(i8::try_from(value).unwrap_or_default()),
        ScalarType::UInt8 => Scalar::U8(u8::try_from(value).unwrap_or_default()),
        ScalarType::Int16 => Scalar::I16(i16::try_from(value).unwrap_or_default()),
        ScalarType::UInt16 => Scalar::U16(u16::try_from(value).unwrap_or_default()),
        ScalarType::Int32 => Scalar::I32(i32::try_from(value).unwrap_or_default()),
        ScalarType::Int64 => Scalar::I64(i64::try_from(value).unwrap_or_default()),
        ScalarType::UInt64 => Scalar::U64(u64::try_from(value).unwrap_or_default()),
        _ => Scalar::U32(u32::try_from(value).unwrap_or_default()),
    }
}

/// Populated elements of an array: the count cell if it is within
/// `1..=declared`, otherwise none
fn array_population(text: &str, declared: usize) -> usize {
    parse_int(text)
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0 && n <= declared)
        .unwrap_or(0)
}

/// Encode a sheet in the requested format
///
/// # Errors
///
/// Returns the first malformed cell, with its location
pub fn encode_sheet<G: Grid + ?Sized>(
    schema: &Schema,
    grid: &G,
    registry: &EnumRegistry,
    options: EncodeOptions,
    format: BinaryFormat,
) -> Result<Vec<u8>> {
    let encoder = RecordEncoder::new(schema, grid, registry, options);
    match format {
        BinaryFormat::Flatbuffers => encoder.encode_sheet(FlatBuffersBuilder::new()),
        BinaryFormat::Protobuf => encoder.encode_sheet(ProtobufBuilder::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceOptions, SchemaInferencer};
    use sheetcfg_core::MemoryGrid;

    #[test]
    fn test_array_population() {
        assert_eq!(array_population("2", 3), 2);
        assert_eq!(array_population("3.0", 3), 3);
        assert_eq!(array_population("4", 3), 0);
        assert_eq!(array_population("-1", 3), 0);
        assert_eq!(array_population("", 3), 0);
        assert_eq!(array_population("x", 3), 0);
    }

    #[test]
    fn test_integer_clamping() {
        assert_eq!(clamp_integer(ScalarType::Int8, 300), 127);
        assert_eq!(clamp_integer(ScalarType::UInt16, -5), 0);
        assert_eq!(integer_scalar(ScalarType::Int8, 127), Scalar::I8(127));
    }

    #[test]
    fn test_default_scalar_reads_seconds() {
        assert_eq!(default_scalar(ScalarType::Date, "86400").unwrap(), Scalar::U32(86400));
        assert_eq!(default_scalar(ScalarType::Bool, "true").unwrap(), Scalar::Bool(true));
    }

    #[test]
    fn test_rows_sorted_by_numeric_id() {
        let grid = MemoryGrid::from_text_rows(
            "ITEM",
            [
                ["required", "optional"],
                ["int32", "string"],
                ["id", "name"],
                ["", ""],
                ["", ""],
                ["10", "c"],
                ["9", "b"],
                ["10", "d"],
                ["1", "a"],
            ],
        );
        let schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let registry = EnumRegistry::new();
        let encoder = RecordEncoder::new(&schema, &grid, &registry, EncodeOptions::default());
        assert_eq!(encoder.ordered_rows().unwrap(), vec![8, 6, 5, 7]);
    }

    #[test]
    fn test_malformed_cell_has_location() {
        let grid = MemoryGrid::from_text_rows(
            "ITEM",
            [
                ["required", "optional"],
                ["int32", "int32"],
                ["id", "level"],
                ["", ""],
                ["", ""],
                ["1", "high"],
            ],
        );
        let schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let registry = EnumRegistry::new();
        let err = encode_sheet(&schema, &grid, &registry, EncodeOptions::default(), BinaryFormat::Protobuf)
            .unwrap_err();
        assert!(err.to_string().contains("B6"), "{err}");
    }
}
