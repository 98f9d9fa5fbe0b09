//! Reading encoded sheets back into JSON
//!
//! Both formats are read through a [`RecordReader`], the read-side mirror of
//! the encoder's builder, so that rendering records to JSON is shared:
//! enum ordinals become case names, fixed-point records become floats and
//! dates become local date text. Absent fields read as their defaults.

pub mod flatbuffers;
pub mod protobuf;

use serde_json::{Map, Number, Value};

use sheetcfg_core::literal::{format_date, parse_bool, parse_float, parse_int};
use sheetcfg_core::{
    BinaryFormat, EnumRepr, FieldAccess, FieldId, FieldKind, FieldTag, FixedCodec, Result,
    ScalarType, Schema, SheetCfgConfig, SheetCfgError,
};

use crate::registry::EnumRegistry;

/// A scalar as read from the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Int(i128),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Access to the fields of one encoded record
pub trait RecordReader: Sized {
    /// Scalar in `slot` stored as `scalar`, `None` when absent
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for truncated or corrupt data
    fn scalar(&self, slot: usize, scalar: ScalarType) -> Result<Option<Raw>>;

    /// Repeated scalars in `slot`
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for truncated or corrupt data
    fn scalars(&self, slot: usize, scalar: ScalarType) -> Result<Vec<Raw>>;

    /// Nested record in `slot`
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for truncated or corrupt data
    fn record(&self, slot: usize) -> Result<Option<Self>>;

    /// Repeated nested records in `slot`
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for truncated or corrupt data
    fn records(&self, slot: usize) -> Result<Vec<Self>>;
}

/// Settings needed to render decoded values
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub access: FieldAccess,
    pub time_zone: f64,
    pub fixed32: Option<FixedCodec>,
    pub fixed64: Option<FixedCodec>,
}

impl DecodeOptions {
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` for invalid fixed-point settings
    pub fn from_config(config: &SheetCfgConfig) -> Result<Self> {
        Ok(Self {
            access: config.access,
            time_zone: config.time_zone,
            fixed32: config.fixed32_codec()?,
            fixed64: config.fixed64_codec()?,
        })
    }
}

/// Renders records of one schema
struct Renderer<'a> {
    schema: &'a Schema,
    registry: &'a EnumRegistry,
    options: DecodeOptions,
    /// FlatBuffers stores enums in their narrow representation
    narrow_enums: bool,
}

impl Renderer<'_> {
    fn sheet<R: RecordReader>(&self, root_array: &R) -> Result<Value> {
        let root = self.schema.root()?;
        let rows = root_array
            .records(0)?
            .iter()
            .map(|row| self.table(root, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(rows))
    }

    fn table<R: RecordReader>(&self, table: FieldId, reader: &R) -> Result<Value> {
        let canonical = self.schema.canonical(table);
        let mut object = Map::new();
        for (slot, member) in self
            .schema
            .exported_members(canonical, self.options.access)
            .into_iter()
            .enumerate()
        {
            let field = self.schema.field(member);
            object.insert(field.name.clone(), self.member(member, slot, reader)?);
        }
        Ok(Value::Object(object))
    }

    fn member<R: RecordReader>(&self, member: FieldId, slot: usize, reader: &R) -> Result<Value> {
        let field = self.schema.field(member);
        let value = match &field.kind {
            FieldKind::Table(_) if field.tag != FieldTag::None => {
                if field.is_repeated() {
                    let items = reader
                        .records(slot)?
                        .iter()
                        .map(|r| self.fixed(member, r))
                        .collect::<Result<Vec<_>>>()?;
                    Value::Array(items)
                } else {
                    match reader.record(slot)? {
                        Some(r) => self.fixed(member, &r)?,
                        None => Value::Null,
                    }
                }
            }
            FieldKind::Table(_) => match reader.record(slot)? {
                Some(r) => self.table(member, &r)?,
                None => Value::Null,
            },
            FieldKind::Array(array) => {
                let items = reader
                    .records(slot)?
                    .iter()
                    .map(|r| self.table(array.element, r))
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(items)
            }
            FieldKind::Enum(e) => {
                let storage = self.enum_storage(&e.enum_name);
                if field.is_repeated() {
                    let items = reader
                        .scalars(slot, storage)?
                        .into_iter()
                        .map(|raw| self.enum_value(&e.enum_name, &raw))
                        .collect();
                    Value::Array(items)
                } else {
                    match reader.scalar(slot, storage)? {
                        Some(raw) => self.enum_value(&e.enum_name, &raw),
                        None if field.default.is_empty() => Value::Null,
                        None => Value::String(field.default.clone()),
                    }
                }
            }
            FieldKind::Scalar(scalar) if field.is_repeated() => {
                let items = reader
                    .scalars(slot, *scalar)?
                    .into_iter()
                    .map(|raw| self.scalar_value(*scalar, raw))
                    .collect();
                Value::Array(items)
            }
            FieldKind::Scalar(scalar) => {
                let raw = match reader.scalar(slot, *scalar)? {
                    Some(raw) => raw,
                    None => default_raw(*scalar, &field.default)?,
                };
                self.scalar_value(*scalar, raw)
            }
        };
        Ok(value)
    }

    fn enum_storage(&self, enum_name: &str) -> ScalarType {
        match (self.narrow_enums, self.registry.repr(enum_name)) {
            (false, _) => ScalarType::Int32,
            (true, EnumRepr::UByte) => ScalarType::UInt8,
            (true, EnumRepr::UShort) => ScalarType::UInt16,
        }
    }

    fn enum_value(&self, enum_name: &str, raw: &Raw) -> Value {
        let Raw::Int(ordinal) = raw else {
            return Value::Null;
        };
        u32::try_from(*ordinal)
            .ok()
            .and_then(|o| self.registry.case_name(enum_name, o))
            .map_or_else(|| int_value(*ordinal), |name| Value::String(name.to_string()))
    }

    fn fixed<R: RecordReader>(&self, member: FieldId, reader: &R) -> Result<Value> {
        let field = self.schema.field(member);
        let codec = match field.tag {
            FieldTag::FixedFloat32 => self.options.fixed32,
            FieldTag::FixedFloat64 => self.options.fixed64,
            FieldTag::None => None,
        }
        .ok_or_else(|| SheetCfgError::decode(format!("no fixed-point codec for '{}'", field.name)))?;
        let holder = self
            .schema
            .table(member)?
            .members
            .first()
            .copied()
            .ok_or_else(|| SheetCfgError::decode(format!("fixed-point record '{}' has no memory", field.name)))?;
        let FieldKind::Scalar(memory_type) = self.schema.field(holder).kind else {
            return Err(SheetCfgError::decode("fixed-point memory is not a scalar"));
        };
        let memory = match reader.scalar(0, memory_type)? {
            Some(Raw::Int(m)) => m,
            _ => 0,
        };
        Ok(float_value(codec.decode(memory)))
    }

    fn scalar_value(&self, scalar: ScalarType, raw: Raw) -> Value {
        match (scalar, raw) {
            (ScalarType::Date, Raw::Int(v)) => {
                Value::String(format_date(u32::try_from(v).unwrap_or_default(), self.options.time_zone))
            }
            (_, Raw::Int(v)) => int_value(v),
            (_, Raw::Float(v)) => float_value(v),
            (_, Raw::Bool(v)) => Value::Bool(v),
            (_, Raw::Text(v)) => Value::String(v),
        }
    }
}

/// Value a reader sees for an absent scalar
fn default_raw(scalar: ScalarType, literal: &str) -> Result<Raw> {
    let raw = match scalar {
        ScalarType::Bool => Raw::Bool(parse_bool(literal)?),
        ScalarType::Float32 | ScalarType::Float64 => Raw::Float(parse_float(literal)?),
        ScalarType::String | ScalarType::Bytes => Raw::Text(literal.to_string()),
        _ => Raw::Int(parse_int(literal)?),
    };
    Ok(raw)
}

fn int_value(v: i128) -> Value {
    if let Ok(i) = i64::try_from(v) {
        Value::from(i)
    } else if let Ok(u) = u64::try_from(v) {
        Value::from(u)
    } else {
        Value::Null
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// Widen an `f32` keeping its shortest decimal form, so `0.1` stays `0.1`
pub(crate) fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or_else(|_| f64::from(v))
}

/// Decode a FlatBuffers sheet into a JSON array of rows
///
/// # Errors
///
/// Returns `SheetCfgError::DecodeError` for corrupt buffers
pub fn decode_flatbuffers(schema: &Schema, registry: &EnumRegistry, options: DecodeOptions, bytes: &[u8]) -> Result<Value> {
    let renderer = Renderer {
        schema,
        registry,
        options,
        narrow_enums: true,
    };
    renderer.sheet(&self::flatbuffers::FbTable::root(bytes)?)
}

/// Decode a Protocol Buffers sheet into a JSON array of rows
///
/// # Errors
///
/// Returns `SheetCfgError::DecodeError` for corrupt buffers
pub fn decode_protobuf(schema: &Schema, registry: &EnumRegistry, options: DecodeOptions, bytes: &[u8]) -> Result<Value> {
    let renderer = Renderer {
        schema,
        registry,
        options,
        narrow_enums: false,
    };
    renderer.sheet(&self::protobuf::PbMessage::parse(bytes)?)
}

/// Decode a sheet in either format
///
/// # Errors
///
/// Returns `SheetCfgError::DecodeError` for corrupt buffers
pub fn decode_sheet(
    schema: &Schema,
    registry: &EnumRegistry,
    options: DecodeOptions,
    format: BinaryFormat,
    bytes: &[u8],
) -> Result<Value> {
    match format {
        BinaryFormat::Flatbuffers => decode_flatbuffers(schema, registry, options, bytes),
        BinaryFormat::Protobuf => decode_protobuf(schema, registry, options, bytes),
    }
}
