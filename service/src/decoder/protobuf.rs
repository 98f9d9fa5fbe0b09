//! Protocol Buffers message reader built on `prost::encoding` primitives

use std::collections::HashMap;

use prost::bytes::Buf;
use prost::encoding::{WireType, decode_key, decode_varint};

use sheetcfg_core::{Result, ScalarType, SheetCfgError};

use super::{Raw, RecordReader, widen_f32};

#[derive(Debug, Clone, Copy)]
enum WireValue<'a> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(&'a [u8]),
}

fn decode_error(e: prost::DecodeError) -> SheetCfgError {
    SheetCfgError::decode(e.to_string())
}

fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if buf.len() < len {
        return Err(SheetCfgError::decode(format!(
            "field of {len} bytes but only {} remain",
            buf.len()
        )));
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

/// All fields of one message, grouped by field number in wire order
#[derive(Debug, Clone, Default)]
pub struct PbMessage<'a> {
    fields: HashMap<u32, Vec<WireValue<'a>>>,
}

impl<'a> PbMessage<'a> {
    /// Split a message into its fields
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for truncated data or group wire types
    pub fn parse(mut buf: &'a [u8]) -> Result<Self> {
        let mut fields: HashMap<u32, Vec<WireValue<'a>>> = HashMap::new();
        while buf.has_remaining() {
            let (tag, wire_type) = decode_key(&mut buf).map_err(decode_error)?;
            let value = match wire_type {
                WireType::Varint => WireValue::Varint(decode_varint(&mut buf).map_err(decode_error)?),
                WireType::ThirtyTwoBit => {
                    let bytes = take(&mut buf, 4)?;
                    WireValue::Fixed32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
                }
                WireType::SixtyFourBit => {
                    let mut bytes = [0_u8; 8];
                    bytes.copy_from_slice(take(&mut buf, 8)?);
                    WireValue::Fixed64(u64::from_le_bytes(bytes))
                }
                WireType::LengthDelimited => {
                    let len = decode_varint(&mut buf).map_err(decode_error)?;
                    let len = usize::try_from(len).map_err(|_| SheetCfgError::decode("length overflows"))?;
                    WireValue::Bytes(take(&mut buf, len)?)
                }
                WireType::StartGroup | WireType::EndGroup => {
                    return Err(SheetCfgError::decode(format!("field {tag} uses a group wire type")));
                }
            };
            fields.entry(tag).or_default().push(value);
        }
        Ok(Self { fields })
    }

    fn values(&self, slot: usize) -> &[WireValue<'a>] {
        u32::try_from(slot + 1)
            .ok()
            .and_then(|tag| self.fields.get(&tag))
            .map_or(&[][..], Vec::as_slice)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn convert(value: WireValue<'_>, scalar: ScalarType) -> Result<Raw> {
    let raw = match (scalar, value) {
        (ScalarType::Bool, WireValue::Varint(v)) => Raw::Bool(v != 0),
        (ScalarType::Int8 | ScalarType::Int16 | ScalarType::Int32, WireValue::Varint(v)) => {
            Raw::Int(i128::from(v as i64 as i32))
        }
        (ScalarType::Int64, WireValue::Varint(v)) => Raw::Int(i128::from(v as i64)),
        (ScalarType::UInt64, WireValue::Varint(v)) => Raw::Int(i128::from(v)),
        (
            ScalarType::UInt8 | ScalarType::UInt16 | ScalarType::UInt32 | ScalarType::Date | ScalarType::Duration,
            WireValue::Varint(v),
        ) => Raw::Int(i128::from(v as u32)),
        (ScalarType::Float32, WireValue::Fixed32(v)) => Raw::Float(widen_f32(f32::from_bits(v))),
        (ScalarType::Float64, WireValue::Fixed64(v)) => Raw::Float(f64::from_bits(v)),
        (ScalarType::String | ScalarType::Bytes, WireValue::Bytes(b)) => {
            Raw::Text(String::from_utf8_lossy(b).into_owned())
        }
        (scalar, value) => {
            return Err(SheetCfgError::decode(format!("{scalar} field holds {value:?}")));
        }
    };
    Ok(raw)
}

/// Elements of a packed repeated scalar field
fn unpack(mut buf: &[u8], scalar: ScalarType) -> Result<Vec<Raw>> {
    let mut items = Vec::new();
    while buf.has_remaining() {
        let value = match scalar {
            ScalarType::Float32 => {
                let b = take(&mut buf, 4)?;
                WireValue::Fixed32(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
            ScalarType::Float64 => {
                let mut bytes = [0_u8; 8];
                bytes.copy_from_slice(take(&mut buf, 8)?);
                WireValue::Fixed64(u64::from_le_bytes(bytes))
            }
            _ => WireValue::Varint(decode_varint(&mut buf).map_err(decode_error)?),
        };
        items.push(convert(value, scalar)?);
    }
    Ok(items)
}

impl RecordReader for PbMessage<'_> {
    fn scalar(&self, slot: usize, scalar: ScalarType) -> Result<Option<Raw>> {
        self.values(slot)
            .last()
            .map(|&v| convert(v, scalar))
            .transpose()
    }

    fn scalars(&self, slot: usize, scalar: ScalarType) -> Result<Vec<Raw>> {
        let mut items = Vec::new();
        for &value in self.values(slot) {
            match value {
                WireValue::Bytes(b) if !scalar.is_reference() => items.extend(unpack(b, scalar)?),
                other => items.push(convert(other, scalar)?),
            }
        }
        Ok(items)
    }

    fn record(&self, slot: usize) -> Result<Option<Self>> {
        match self.values(slot).last() {
            Some(&WireValue::Bytes(b)) => Self::parse(b).map(Some),
            Some(other) => Err(SheetCfgError::decode(format!("message field holds {other:?}"))),
            None => Ok(None),
        }
    }

    fn records(&self, slot: usize) -> Result<Vec<Self>> {
        self.values(slot)
            .iter()
            .map(|value| match *value {
                WireValue::Bytes(b) => Self::parse(b),
                other => Err(SheetCfgError::decode(format!("message field holds {other:?}"))),
            })
            .collect()
    }
}
