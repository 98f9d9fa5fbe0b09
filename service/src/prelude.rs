//! Prelude module for the sheetcfg service
//!
//! This module re-exports commonly used types and functions for convenient import.

// Re-export core types
pub use sheetcfg_core::prelude::*;

// Re-export the conversion stages
pub use crate::decoder::{DecodeOptions, decode_sheet};
pub use crate::encoder::{BinaryBuilder, EncodeOptions, encode_sheet};
pub use crate::generator::{GeneratedFile, GeneratorOptions, SchemaGenerator, generator_for};
pub use crate::inference::infer_schema;
pub use crate::loader::ExcelLoader;
pub use crate::pipeline::{Pipeline, SheetOutcome, SheetStatus};
pub use crate::registry::EnumRegistry;
pub use crate::report::SizeReport;
