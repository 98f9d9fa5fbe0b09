//! Bounds-checked FlatBuffers table reader
//!
//! Reads only what the encoder writes: tables with a vtable, strings, and
//! vectors of scalars or table offsets. Every offset is checked against the
//! buffer before it is followed.

use sheetcfg_core::{Result, ScalarType, SheetCfgError};

use super::{Raw, RecordReader, widen_f32};

fn eof(at: usize, len: usize) -> SheetCfgError {
    SheetCfgError::decode(format!("read of {len} bytes at {at} runs past the buffer"))
}

fn read<const N: usize>(buf: &[u8], at: usize) -> Result<[u8; N]> {
    let end = at.checked_add(N).ok_or_else(|| eof(at, N))?;
    buf.get(at..end)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| eof(at, N))
}

fn read_u16(buf: &[u8], at: usize) -> Result<u16> {
    read::<2>(buf, at).map(u16::from_le_bytes)
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32> {
    read::<4>(buf, at).map(u32::from_le_bytes)
}

/// Follow the unsigned offset stored at `at`
fn deref(buf: &[u8], at: usize) -> Result<usize> {
    let offset = usize::try_from(read_u32(buf, at)?).map_err(|_| eof(at, 4))?;
    at.checked_add(offset).ok_or_else(|| eof(at, 4))
}

/// Start and length of the vector whose length prefix is at `at`
fn vector(buf: &[u8], at: usize) -> Result<(usize, usize)> {
    let len = usize::try_from(read_u32(buf, at)?).map_err(|_| eof(at, 4))?;
    Ok((at + 4, len))
}

fn scalar_width(scalar: ScalarType) -> usize {
    match scalar {
        ScalarType::Int8 | ScalarType::UInt8 | ScalarType::Bool => 1,
        ScalarType::Int16 | ScalarType::UInt16 => 2,
        ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        _ => 4,
    }
}

fn read_scalar(buf: &[u8], at: usize, scalar: ScalarType) -> Result<Raw> {
    let raw = match scalar {
        ScalarType::Bool => Raw::Bool(read::<1>(buf, at)?[0] != 0),
        ScalarType::Int8 => Raw::Int(i128::from(i8::from_le_bytes(read(buf, at)?))),
        ScalarType::UInt8 => Raw::Int(i128::from(read::<1>(buf, at)?[0])),
        ScalarType::Int16 => Raw::Int(i128::from(i16::from_le_bytes(read(buf, at)?))),
        ScalarType::UInt16 => Raw::Int(i128::from(read_u16(buf, at)?)),
        ScalarType::Int32 => Raw::Int(i128::from(i32::from_le_bytes(read(buf, at)?))),
        ScalarType::Int64 => Raw::Int(i128::from(i64::from_le_bytes(read(buf, at)?))),
        ScalarType::UInt64 => Raw::Int(i128::from(u64::from_le_bytes(read(buf, at)?))),
        ScalarType::Float32 => Raw::Float(widen_f32(f32::from_le_bytes(read(buf, at)?))),
        ScalarType::Float64 => Raw::Float(f64::from_le_bytes(read(buf, at)?)),
        ScalarType::String | ScalarType::Bytes => {
            let (start, len) = vector(buf, deref(buf, at)?)?;
            let bytes = buf.get(start..start + len).ok_or_else(|| eof(start, len))?;
            Raw::Text(String::from_utf8_lossy(bytes).into_owned())
        }
        ScalarType::UInt32 | ScalarType::Date | ScalarType::Duration => {
            Raw::Int(i128::from(read_u32(buf, at)?))
        }
    };
    Ok(raw)
}

/// One table inside a finished buffer
#[derive(Debug, Clone, Copy)]
pub struct FbTable<'a> {
    buf: &'a [u8],
    pos: usize,
    vtable: usize,
    vtable_len: usize,
}

impl<'a> FbTable<'a> {
    /// Table at `pos`
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` if the vtable lies outside the buffer
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let soffset = i64::from(i32::from_le_bytes(read(buf, pos)?));
        let vtable = i64::try_from(pos)
            .ok()
            .map(|p| p - soffset)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| SheetCfgError::decode(format!("vtable of table at {pos} is out of range")))?;
        let vtable_len = usize::from(read_u16(buf, vtable)?);
        Ok(Self {
            buf,
            pos,
            vtable,
            vtable_len,
        })
    }

    /// The buffer's root table
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::DecodeError` for buffers too short to hold a root
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        Self::at(buf, deref(buf, 0)?)
    }

    /// Absolute position of the field in `slot`, if present
    fn field(&self, slot: usize) -> Result<Option<usize>> {
        let entry = 4 + 2 * slot;
        if entry + 2 > self.vtable_len {
            return Ok(None);
        }
        let offset = read_u16(self.buf, self.vtable + entry)?;
        Ok((offset != 0).then(|| self.pos + usize::from(offset)))
    }

    /// Start and length of the vector in `slot`
    fn vector(&self, slot: usize) -> Result<Option<(usize, usize)>> {
        match self.field(slot)? {
            Some(at) => vector(self.buf, deref(self.buf, at)?).map(Some),
            None => Ok(None),
        }
    }
}

impl RecordReader for FbTable<'_> {
    fn scalar(&self, slot: usize, scalar: ScalarType) -> Result<Option<Raw>> {
        self.field(slot)?
            .map(|at| read_scalar(self.buf, at, scalar))
            .transpose()
    }

    fn scalars(&self, slot: usize, scalar: ScalarType) -> Result<Vec<Raw>> {
        let Some((start, len)) = self.vector(slot)? else {
            return Ok(Vec::new());
        };
        let width = if scalar.is_reference() { 4 } else { scalar_width(scalar) };
        (0..len)
            .map(|i| read_scalar(self.buf, start + i * width, scalar))
            .collect()
    }

    fn record(&self, slot: usize) -> Result<Option<Self>> {
        match self.field(slot)? {
            Some(at) => Self::at(self.buf, deref(self.buf, at)?).map(Some),
            None => Ok(None),
        }
    }

    fn records(&self, slot: usize) -> Result<Vec<Self>> {
        let Some((start, len)) = self.vector(slot)? else {
            return Ok(Vec::new());
        };
        (0..len)
            .map(|i| Self::at(self.buf, deref(self.buf, start + i * 4)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{BinaryBuilder, FlatBuffersBuilder, Scalar, VectorKind};

    #[test]
    fn test_reads_builder_output() {
        let mut builder = FlatBuffersBuilder::new();
        let name = builder.create_string("Alice");
        builder.begin_vector(VectorKind::Scalars, 3);
        for v in [10, 20, 30] {
            builder.push_scalar(Scalar::I32(v));
        }
        let scores = builder.end_vector().unwrap();
        builder.begin_record("Row");
        builder.add_scalar(0, Scalar::I32(1), Scalar::I32(0));
        builder.add_ref(1, name);
        builder.add_ref(2, scores);
        builder.add_scalar(3, Scalar::I16(0), Scalar::I16(0));
        let root = builder.end_record().unwrap();
        let bytes = builder.finish(root).unwrap();

        let table = FbTable::root(&bytes).unwrap();
        assert_eq!(table.scalar(0, ScalarType::Int32).unwrap(), Some(Raw::Int(1)));
        assert_eq!(
            table.scalar(1, ScalarType::String).unwrap(),
            Some(Raw::Text("Alice".to_string()))
        );
        assert_eq!(
            table.scalars(2, ScalarType::Int32).unwrap(),
            vec![Raw::Int(10), Raw::Int(20), Raw::Int(30)]
        );
        // equal to its default, so never written
        assert_eq!(table.scalar(3, ScalarType::Int16).unwrap(), None);
        assert_eq!(table.scalar(9, ScalarType::Int16).unwrap(), None);
    }

    #[test]
    fn test_truncated_buffer() {
        assert!(FbTable::root(&[1, 0]).is_err());
        assert!(FbTable::root(&[200, 0, 0, 0, 0, 0]).is_err());
    }
}
