//! # sheetcfg Service
//!
//! Turns spreadsheet sheets into typed record schemas and serializes their
//! rows into FlatBuffers or Protocol Buffers.
//!
//! ## Overview
//!
//! Each export sheet describes one record type in its header rows (rule,
//! type, `name[=default]`, access scope, description). From those rows the
//! service:
//!
//! - **Infers a schema**: scalars, enums, nested tables and fixed-count arrays
//! - **Keeps enum ordinals stable** across sheets and runs in a JSON registry
//! - **Emits schema text**: `.fbs` and proto2 `.proto` files
//! - **Encodes the data rows** sorted by `id` into one binary per sheet
//! - **Decodes them back** to JSON for inspection and verification
//!
//! ## Quick Start
//!
//! ```rust
//! use sheetcfg_core::{BinaryFormat, MemoryGrid, SheetCfgConfig};
//! use sheetcfg_service::decoder::{DecodeOptions, decode_sheet};
//! use sheetcfg_service::encoder::{EncodeOptions, encode_sheet};
//! use sheetcfg_service::inference::infer_schema;
//! use sheetcfg_service::registry::EnumRegistry;
//!
//! # fn main() -> sheetcfg_core::Result<()> {
//! let grid = MemoryGrid::from_text_rows(
//!     "ITEM",
//!     [
//!         ["required", "optional", "repeated"],
//!         ["int32", "string", "int32"],
//!         ["id", "name", "scores"],
//!         ["", "", ""],
//!         ["", "", ""],
//!         ["1", "Alice", "10;20;30"],
//!     ],
//! );
//! let config = SheetCfgConfig::default();
//! let mut registry = EnumRegistry::new();
//! let schema = infer_schema(&grid, &mut registry, &config)?;
//!
//! let bytes = encode_sheet(
//!     &schema,
//!     &grid,
//!     &registry,
//!     EncodeOptions::from_config(&config)?,
//!     BinaryFormat::Flatbuffers,
//! )?;
//! let rows = decode_sheet(
//!     &schema,
//!     &registry,
//!     DecodeOptions::from_config(&config)?,
//!     BinaryFormat::Flatbuffers,
//!     &bytes,
//! )?;
//! assert_eq!(rows[0]["name"], "Alice");
//! # Ok(())
//! # }
//! ```
//!
//! For whole workbooks, [`pipeline::Pipeline`] drives loading, inference,
//! generation and encoding, writing every artifact into the configured
//! workspace.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // FlatBuffers, proto2 and friends are proper nouns
#![allow(clippy::missing_errors_doc)]

/// Persistent enum case registry
pub mod registry;

/// Schema inference from header rows
pub mod inference;

/// Binary encoders
pub mod encoder;

/// Schema text generators
pub mod generator;

/// Readers turning encoded bytes back into JSON
pub mod decoder;

/// Workbook loading
pub mod loader;

/// Batch conversion of workbooks
pub mod pipeline;

/// Output size comparison
pub mod report;

/// Command-line interface
pub mod cli;

/// Commonly used types
pub mod prelude;

pub use decoder::{DecodeOptions, decode_sheet};
pub use encoder::{EncodeOptions, encode_sheet};
pub use generator::{GeneratorOptions, SchemaGenerator, generator_for};
pub use inference::infer_schema;
pub use pipeline::{Pipeline, SheetOutcome, SheetStatus};
pub use registry::EnumRegistry;
