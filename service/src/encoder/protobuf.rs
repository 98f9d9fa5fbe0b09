//! Protocol Buffers sink writing proto2 wire format through `prost::encoding`

use prost::encoding::{bool as pb_bool, bytes, double, float, int32, int64, string, uint32, uint64};

use sheetcfg_core::{Result, SheetCfgError};

use super::traits::{BinaryBuilder, Scalar, VectorKind};

/// Handle into the builder's value table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoRef(usize);

#[derive(Debug)]
enum ProtoValue {
    Message(Vec<u8>),
    Text(String),
    Blob(Vec<u8>),
    Scalars(Vec<Scalar>),
    Refs(Vec<ProtoRef>),
}

/// Writes records as length-delimited messages
///
/// Field numbers are slots plus one. Every set field is written, defaults
/// included, so presence survives a round trip. Repeated scalars use the
/// unpacked proto2 encoding.
#[derive(Debug, Default)]
pub struct ProtobufBuilder {
    values: Vec<ProtoValue>,
    record: Option<Vec<u8>>,
    vector: Option<(usize, ProtoValue)>,
}

impl ProtobufBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, value: ProtoValue) -> ProtoRef {
        self.values.push(value);
        ProtoRef(self.values.len() - 1)
    }
}

fn tag_of(slot: usize) -> u32 {
    u32::try_from(slot + 1).unwrap_or(u32::MAX)
}

fn encode_scalar(tag: u32, value: Scalar, buf: &mut Vec<u8>) {
    match value {
        Scalar::Bool(v) => pb_bool::encode(tag, &v, buf),
        Scalar::I8(v) => int32::encode(tag, &i32::from(v), buf),
        Scalar::I16(v) => int32::encode(tag, &i32::from(v), buf),
        Scalar::I32(v) => int32::encode(tag, &v, buf),
        Scalar::U8(v) => uint32::encode(tag, &u32::from(v), buf),
        Scalar::U16(v) => uint32::encode(tag, &u32::from(v), buf),
        Scalar::U32(v) => uint32::encode(tag, &v, buf),
        Scalar::I64(v) => int64::encode(tag, &v, buf),
        Scalar::U64(v) => uint64::encode(tag, &v, buf),
        Scalar::F32(v) => float::encode(tag, &v, buf),
        Scalar::F64(v) => double::encode(tag, &v, buf),
        Scalar::Enum(v, _) => int32::encode(tag, &i32::try_from(v).unwrap_or(i32::MAX), buf),
    }
}

fn encode_value(values: &[ProtoValue], tag: u32, value: ProtoRef, buf: &mut Vec<u8>) {
    match &values[value.0] {
        ProtoValue::Message(b) | ProtoValue::Blob(b) => bytes::encode(tag, b, buf),
        ProtoValue::Text(s) => string::encode(tag, s, buf),
        ProtoValue::Scalars(items) => {
            for &item in items {
                encode_scalar(tag, item, buf);
            }
        }
        ProtoValue::Refs(items) => {
            for &item in items {
                encode_value(values, tag, item, buf);
            }
        }
    }
}

impl BinaryBuilder for ProtobufBuilder {
    type Ref = ProtoRef;

    fn create_string(&mut self, value: &str) -> ProtoRef {
        self.store(ProtoValue::Text(value.to_string()))
    }

    fn create_bytes(&mut self, value: &[u8]) -> ProtoRef {
        self.store(ProtoValue::Blob(value.to_vec()))
    }

    fn begin_vector(&mut self, kind: VectorKind, len: usize) {
        let pending = match kind {
            VectorKind::Scalars => ProtoValue::Scalars(Vec::with_capacity(len)),
            VectorKind::Refs => ProtoValue::Refs(Vec::with_capacity(len)),
        };
        self.vector = Some((len, pending));
    }

    fn push_scalar(&mut self, value: Scalar) {
        if let Some((_, ProtoValue::Scalars(items))) = self.vector.as_mut() {
            items.push(value);
        }
    }

    fn push_ref(&mut self, value: ProtoRef) {
        if let Some((_, ProtoValue::Refs(items))) = self.vector.as_mut() {
            items.push(value);
        }
    }

    fn end_vector(&mut self) -> Result<ProtoRef> {
        let (len, pending) = self
            .vector
            .take()
            .ok_or_else(|| SheetCfgError::generation("end_vector without begin_vector"))?;
        let pushed = match &pending {
            ProtoValue::Scalars(items) => items.len(),
            ProtoValue::Refs(items) => items.len(),
            _ => 0,
        };
        if pushed != len {
            return Err(SheetCfgError::generation(format!(
                "vector declared {len} items but {pushed} were pushed"
            )));
        }
        Ok(self.store(pending))
    }

    fn begin_record(&mut self, _type_name: &str) {
        self.record = Some(Vec::new());
    }

    fn add_scalar(&mut self, slot: usize, value: Scalar, _default: Scalar) {
        if let Some(buf) = self.record.as_mut() {
            encode_scalar(tag_of(slot), value, buf);
        }
    }

    fn add_ref(&mut self, slot: usize, value: ProtoRef) {
        if let Some(buf) = self.record.as_mut() {
            encode_value(&self.values, tag_of(slot), value, buf);
        }
    }

    fn end_record(&mut self) -> Result<ProtoRef> {
        let record = self
            .record
            .take()
            .ok_or_else(|| SheetCfgError::generation("end_record without begin_record"))?;
        Ok(self.store(ProtoValue::Message(record)))
    }

    fn finish(mut self, root: ProtoRef) -> Result<Vec<u8>> {
        match self.values.get_mut(root.0) {
            Some(ProtoValue::Message(bytes)) => Ok(std::mem::take(bytes)),
            _ => Err(SheetCfgError::generation("root is not a message")),
        }
    }
}
