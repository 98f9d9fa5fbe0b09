//! Schema inference from sheet headers
//!
//! - **Engine** (`engine.rs`) - recursive descent over the header rows
//! - **Enums** (`enums.rs`) - case discovery and default-case resolution
//!
//! # Usage Example
//!
//! ```rust
//! use sheetcfg_core::{MemoryGrid, SheetCfgConfig};
//! use sheetcfg_service::inference::infer_schema;
//! use sheetcfg_service::registry::EnumRegistry;
//!
//! let grid = MemoryGrid::from_text_rows(
//!     "ITEM",
//!     [
//!         ["required", "optional"],
//!         ["int32", "enum.Rarity"],
//!         ["id", "rarity"],
//!         ["", ""],
//!         ["", ""],
//!         ["1", "RARE"],
//!     ],
//! );
//! let mut registry = EnumRegistry::new();
//! let schema = infer_schema(&grid, &mut registry, &SheetCfgConfig::default())?;
//! assert_eq!(schema.root_array_name()?, "ITEM_ARRAY");
//! assert_eq!(registry.ordinal("Rarity", "RARE"), Some(0));
//! # Ok::<(), sheetcfg_core::SheetCfgError>(())
//! ```

pub mod engine;
pub mod enums;

pub use engine::{InferenceOptions, SchemaInferencer};
pub use enums::{resolve_enums, unique_values};

use sheetcfg_core::{Grid, Result, Schema, SheetCfgConfig};

use crate::registry::EnumRegistry;

impl InferenceOptions {
    /// Options taken from a run configuration
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` for invalid fixed-point settings
    pub fn from_config(config: &SheetCfgConfig) -> Result<Self> {
        Ok(Self {
            fixed32: config.fixed32_codec()?,
            fixed64: config.fixed64_codec()?,
            unsigned_encoding: config.unsigned_encoding,
            time_zone: config.time_zone,
        })
    }
}

/// Infer a sheet's schema and register the enum cases it uses
///
/// The registry is only touched once the header rows parse cleanly, so a
/// rejected sheet leaves it unchanged.
///
/// # Errors
///
/// Returns the schema construction error that aborted the sheet
pub fn infer_schema<G: Grid + ?Sized>(
    grid: &G,
    registry: &mut EnumRegistry,
    config: &SheetCfgConfig,
) -> Result<Schema> {
    let options = InferenceOptions::from_config(config)?;
    let mut schema = SchemaInferencer::new(grid, options).infer()?;
    resolve_enums(&mut schema, grid, registry, config.auto_default_case);
    Ok(schema)
}
