//! # sheetcfg Core
//!
//! Core types for turning spreadsheet column headers into typed record
//! schemas.
//!
//! This crate holds everything the inference engine and the binary encoders
//! share: the field vocabulary, the arena-based schema model, grid access,
//! literal parsing, the fixed-point codec, configuration and errors.
//!
//! ## Header convention
//!
//! Each sheet starts with six rows per column: rule, type, `name[=default]`,
//! access scope, description, then data from the sixth row on.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)] // Documentation is covered by module-level docs

/// Core error types for sheetcfg operations
pub mod error;

/// Field types, rules, access scopes and tags
pub mod types;

/// Arena-based schema model
pub mod schema;

/// Cell grid access
pub mod grid;

/// Fixed-point float codec
pub mod fixed;

/// Cell literal parsing
pub mod literal;

/// Configuration types for sheet conversion
pub mod config;

// Re-export commonly used types
pub use config::{FixedPointConfig, SheetCfgConfig};
pub use error::{Result, SheetCfgError};
pub use fixed::FixedCodec;
pub use grid::{CellType, CellValue, Grid, MemoryGrid};
pub use schema::{ArrayField, EnumField, Field, FieldId, FieldKind, Schema, TableField};
pub use types::{BinaryFormat, EnumRepr, FieldAccess, FieldRule, FieldTag, ScalarType};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::SheetCfgConfig;
    pub use crate::error::{Result, SheetCfgError};
    pub use crate::grid::{CellValue, Grid, MemoryGrid};
    pub use crate::schema::{Field, FieldId, FieldKind, Schema};
    pub use crate::types::{BinaryFormat, FieldAccess, FieldRule, FieldTag, ScalarType};
}
