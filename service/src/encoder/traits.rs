//! Builder interface shared by the binary formats
//!
//! The record walker drives a [`BinaryBuilder`] strictly children first:
//! strings, vectors and nested records are finished before the record that
//! refers to them is begun, which is what table-oriented formats require and
//! costs nothing for length-prefixed messages.

use sheetcfg_core::{EnumRepr, Result};

/// A fully converted inline value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Enum(u32, EnumRepr),
}

/// Element kind of a vector being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    /// Inline scalars
    Scalars,
    /// Strings, byte blobs or records created earlier
    Refs,
}

/// Per-format sink for records, vectors and out-of-line values
pub trait BinaryBuilder {
    /// Handle to a finished string, byte blob, vector or record
    type Ref: Copy + std::fmt::Debug;

    fn create_string(&mut self, value: &str) -> Self::Ref;

    fn create_bytes(&mut self, value: &[u8]) -> Self::Ref;

    /// Start a vector of `len` items; items are pushed in declared order
    fn begin_vector(&mut self, kind: VectorKind, len: usize);

    fn push_scalar(&mut self, value: Scalar);

    fn push_ref(&mut self, value: Self::Ref);

    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` without an open vector or when
    /// the pushed items disagree with `begin_vector`
    fn end_vector(&mut self) -> Result<Self::Ref>;

    fn begin_record(&mut self, type_name: &str);

    /// Set a scalar field; `default` is what a reader sees when it is absent
    fn add_scalar(&mut self, slot: usize, value: Scalar, default: Scalar);

    fn add_ref(&mut self, slot: usize, value: Self::Ref);

    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` without an open record
    fn end_record(&mut self) -> Result<Self::Ref>;

    /// Serialize with `root` as the top-level record
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` if `root` is not a record
    fn finish(self, root: Self::Ref) -> Result<Vec<u8>>;
}
