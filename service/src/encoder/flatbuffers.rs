//! FlatBuffers sink backed by `flatbuffers::FlatBufferBuilder`

use std::collections::HashMap;

use ::flatbuffers::{
    FlatBufferBuilder, Push, TableUnfinishedWIPOffset, UnionWIPOffset, VOffsetT, WIPOffset,
};

use sheetcfg_core::{EnumRepr, Result, SheetCfgError};

use super::traits::{BinaryBuilder, Scalar, VectorKind};

const INITIAL_CAPACITY: usize = 1024 * 1024;

/// Vtable entry of the field in `slot`
fn field_voffset(slot: usize) -> VOffsetT {
    VOffsetT::try_from(4 + 2 * slot).unwrap_or(VOffsetT::MAX)
}

fn offset(value: u32) -> WIPOffset<UnionWIPOffset> {
    WIPOffset::new(value)
}

enum PendingVector {
    Scalars(Vec<Scalar>),
    Refs(Vec<u32>),
}

/// Writes records as FlatBuffers tables
///
/// Vectors are collected until `end_vector` and then written back to front,
/// as the format requires. Identical strings share one offset.
pub struct FlatBuffersBuilder {
    fbb: FlatBufferBuilder<'static>,
    vector: Option<(usize, PendingVector)>,
    table: Option<WIPOffset<TableUnfinishedWIPOffset>>,
    strings: HashMap<String, u32>,
}

impl Default for FlatBuffersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatBuffersBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fbb: FlatBufferBuilder::with_capacity(INITIAL_CAPACITY),
            vector: None,
            table: None,
            strings: HashMap::new(),
        }
    }

    /// Number of distinct strings written so far
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    fn write_vector<T: Push + Copy + 'static>(&mut self, items: &[T]) -> u32 {
        self.fbb.start_vector::<T>(items.len());
        for &item in items.iter().rev() {
            self.fbb.push(item);
        }
        self.fbb.end_vector::<T>(items.len()).value()
    }

    fn write_scalar_vector(&mut self, items: &[Scalar]) -> Result<u32> {
        macro_rules! typed {
            ($variant:ident) => {
                items
                    .iter()
                    .map(|s| match s {
                        Scalar::$variant(v) => Ok(*v),
                        other => Err(mixed_vector(other)),
                    })
                    .collect::<Result<Vec<_>>>()?
            };
        }
        let Some(first) = items.first() else {
            return Ok(self.write_vector::<u8>(&[]));
        };
        let written = match first {
            Scalar::Bool(_) => self.write_vector(&typed!(Bool)),
            Scalar::I8(_) => self.write_vector(&typed!(I8)),
            Scalar::U8(_) => self.write_vector(&typed!(U8)),
            Scalar::I16(_) => self.write_vector(&typed!(I16)),
            Scalar::U16(_) => self.write_vector(&typed!(U16)),
            Scalar::I32(_) => self.write_vector(&typed!(I32)),
            Scalar::U32(_) => self.write_vector(&typed!(U32)),
            Scalar::I64(_) => self.write_vector(&typed!(I64)),
            Scalar::U64(_) => self.write_vector(&typed!(U64)),
            Scalar::F32(_) => self.write_vector(&typed!(F32)),
            Scalar::F64(_) => self.write_vector(&typed!(F64)),
            Scalar::Enum(_, EnumRepr::UByte) => {
                let ordinals = enum_ordinals(items)?;
                let narrow: Vec<u8> = ordinals.iter().map(|&o| u8::try_from(o).unwrap_or(u8::MAX)).collect();
                self.write_vector(&narrow)
            }
            Scalar::Enum(_, EnumRepr::UShort) => {
                let ordinals = enum_ordinals(items)?;
                let narrow: Vec<u16> = ordinals.iter().map(|&o| u16::try_from(o).unwrap_or(u16::MAX)).collect();
                self.write_vector(&narrow)
            }
        };
        Ok(written)
    }
}

fn mixed_vector(item: &Scalar) -> SheetCfgError {
    SheetCfgError::generation(format!("vector mixes scalar kinds at {item:?}"))
}

fn enum_ordinals(items: &[Scalar]) -> Result<Vec<u32>> {
    items
        .iter()
        .map(|s| match s {
            Scalar::Enum(o, _) => Ok(*o),
            other => Err(mixed_vector(other)),
        })
        .collect()
}

impl BinaryBuilder for FlatBuffersBuilder {
    type Ref = u32;

    fn create_string(&mut self, value: &str) -> u32 {
        if let Some(&existing) = self.strings.get(value) {
            return existing;
        }
        let written = self.fbb.create_string(value).value();
        self.strings.insert(value.to_string(), written);
        written
    }

    fn create_bytes(&mut self, value: &[u8]) -> u32 {
        self.fbb.create_vector(value).value()
    }

    fn begin_vector(&mut self, kind: VectorKind, len: usize) {
        let pending = match kind {
            VectorKind::Scalars => PendingVector::Scalars(Vec::with_capacity(len)),
            VectorKind::Refs => PendingVector::Refs(Vec::with_capacity(len)),
        };
        self.vector = Some((len, pending));
    }

    fn push_scalar(&mut self, value: Scalar) {
        if let Some((_, PendingVector::Scalars(items))) = self.vector.as_mut() {
            items.push(value);
        }
    }

    fn push_ref(&mut self, value: u32) {
        if let Some((_, PendingVector::Refs(items))) = self.vector.as_mut() {
            items.push(value);
        }
    }

    fn end_vector(&mut self) -> Result<u32> {
        let (len, pending) = self
            .vector
            .take()
            .ok_or_else(|| SheetCfgError::generation("end_vector without begin_vector"))?;
        match pending {
            PendingVector::Scalars(items) if items.len() == len => self.write_scalar_vector(&items),
            PendingVector::Refs(items) if items.len() == len => {
                let offsets: Vec<_> = items.into_iter().map(offset).collect();
                Ok(self.write_vector(&offsets))
            }
            _ => Err(SheetCfgError::generation(format!(
                "vector declared {len} items but a different number was pushed"
            ))),
        }
    }

    fn begin_record(&mut self, _type_name: &str) {
        self.table = Some(self.fbb.start_table());
    }

    fn add_scalar(&mut self, slot: usize, value: Scalar, default: Scalar) {
        let at = field_voffset(slot);
        let fbb = &mut self.fbb;
        match (value, default) {
            (Scalar::Bool(v), Scalar::Bool(d)) => fbb.push_slot(at, v, d),
            (Scalar::I8(v), Scalar::I8(d)) => fbb.push_slot(at, v, d),
            (Scalar::U8(v), Scalar::U8(d)) => fbb.push_slot(at, v, d),
            (Scalar::I16(v), Scalar::I16(d)) => fbb.push_slot(at, v, d),
            (Scalar::U16(v), Scalar::U16(d)) => fbb.push_slot(at, v, d),
            (Scalar::I32(v), Scalar::I32(d)) => fbb.push_slot(at, v, d),
            (Scalar::U32(v), Scalar::U32(d)) => fbb.push_slot(at, v, d),
            (Scalar::I64(v), Scalar::I64(d)) => fbb.push_slot(at, v, d),
            (Scalar::U64(v), Scalar::U64(d)) => fbb.push_slot(at, v, d),
            (Scalar::F32(v), Scalar::F32(d)) => fbb.push_slot(at, v, d),
            (Scalar::F64(v), Scalar::F64(d)) => fbb.push_slot(at, v, d),
            (Scalar::Enum(v, EnumRepr::UByte), Scalar::Enum(d, _)) => fbb.push_slot(
                at,
                u8::try_from(v).unwrap_or(u8::MAX),
                u8::try_from(d).unwrap_or(0),
            ),
            (Scalar::Enum(v, EnumRepr::UShort), Scalar::Enum(d, _)) => fbb.push_slot(
                at,
                u16::try_from(v).unwrap_or(u16::MAX),
                u16::try_from(d).unwrap_or(0),
            ),
            // mismatched default kinds never elide the value
            (value, _) => match value {
                Scalar::Bool(v) => fbb.push_slot_always(at, v),
                Scalar::I8(v) => fbb.push_slot_always(at, v),
                Scalar::U8(v) => fbb.push_slot_always(at, v),
                Scalar::I16(v) => fbb.push_slot_always(at, v),
                Scalar::U16(v) => fbb.push_slot_always(at, v),
                Scalar::I32(v) => fbb.push_slot_always(at, v),
                Scalar::U32(v) => fbb.push_slot_always(at, v),
                Scalar::I64(v) => fbb.push_slot_always(at, v),
                Scalar::U64(v) => fbb.push_slot_always(at, v),
                Scalar::F32(v) => fbb.push_slot_always(at, v),
                Scalar::F64(v) => fbb.push_slot_always(at, v),
                Scalar::Enum(v, EnumRepr::UByte) => {
                    fbb.push_slot_always(at, u8::try_from(v).unwrap_or(u8::MAX));
                }
                Scalar::Enum(v, EnumRepr::UShort) => {
                    fbb.push_slot_always(at, u16::try_from(v).unwrap_or(u16::MAX));
                }
            },
        }
    }

    fn add_ref(&mut self, slot: usize, value: u32) {
        self.fbb.push_slot_always(field_voffset(slot), offset(value));
    }

    fn end_record(&mut self) -> Result<u32> {
        let start = self
            .table
            .take()
            .ok_or_else(|| SheetCfgError::generation("end_record without begin_record"))?;
        Ok(self.fbb.end_table(start).value())
    }

    fn finish(mut self, root: u32) -> Result<Vec<u8>> {
        if self.table.is_some() || self.vector.is_some() {
            return Err(SheetCfgError::generation("finish called with an open record or vector"));
        }
        self.fbb.finish(offset(root), None);
        Ok(self.fbb.finished_data().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_deduplicated() {
        let mut builder = FlatBuffersBuilder::new();
        let a = builder.create_string("sword");
        let b = builder.create_string("shield");
        let c = builder.create_string("sword");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(builder.string_count(), 2);
    }

    #[test]
    fn test_minimal_buffer_layout() {
        let mut builder = FlatBuffersBuilder::new();
        builder.begin_record("Item");
        builder.add_scalar(0, Scalar::I32(7), Scalar::I32(0));
        let root = builder.end_record().unwrap();
        let bytes = builder.finish(root).unwrap();

        // root offset, then a table whose first field holds 7
        let table = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let soffset = i32::from_le_bytes(bytes[table..table + 4].try_into().unwrap());
        let vtable = (table as i64 - i64::from(soffset)) as usize;
        let field = u16::from_le_bytes(bytes[vtable + 4..vtable + 6].try_into().unwrap()) as usize;
        let value = i32::from_le_bytes(bytes[table + field..table + field + 4].try_into().unwrap());
        assert_eq!(value, 7);
    }

    #[test]
    fn test_vector_length_mismatch() {
        let mut builder = FlatBuffersBuilder::new();
        builder.begin_vector(VectorKind::Scalars, 2);
        builder.push_scalar(Scalar::I32(1));
        assert!(builder.end_vector().is_err());
        assert!(builder.end_record().is_err());
    }
}
