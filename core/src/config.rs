//! Configuration for sheet conversion
//!
//! Settings load from a YAML file with `${VAR:-default}` environment
//! substitution; every field has a default so a partial file is enough.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SheetCfgError};
use crate::fixed::FixedCodec;
use crate::types::{BinaryFormat, FieldAccess};

static ENV_VAR_PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::(-)?([^}]*))?\}").expect("Valid environment variable regex pattern")
});

/// Default file name of the persisted enum registry
pub const ENUM_REGISTRY_FILE: &str = "shared_enum.json";

/// Fraction bits of `float` fields when not configured
pub const DEFAULT_FIXED32_FRACTION_BITS: u32 = 10;

/// Fraction bits of `double` fields when not configured
pub const DEFAULT_FIXED64_FRACTION_BITS: u32 = 20;

/// Fixed-point re-encoding of one float width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPointConfig {
    /// Encode floats of this width as fixed-point records
    pub enabled: bool,

    /// Bits used for the fractional part
    pub fraction_bits: Option<u32>,
}

impl FixedPointConfig {
    /// Configured fraction bits, or the width's default
    #[must_use]
    pub fn fraction_bits_for(&self, total_bits: u32) -> u32 {
        self.fraction_bits.unwrap_or(if total_bits == 64 {
            DEFAULT_FIXED64_FRACTION_BITS
        } else {
            DEFAULT_FIXED32_FRACTION_BITS
        })
    }

    /// Codec for this width, or `None` when disabled
    pub fn codec(&self, total_bits: u32) -> Result<Option<FixedCodec>> {
        if self.enabled {
            FixedCodec::new(self.fraction_bits_for(total_bits), total_bits).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Complete configuration for converting workbooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetCfgConfig {
    /// Output directory for schema texts and encoded data
    pub workspace: PathBuf,

    /// Namespace of FlatBuffers schemas, package of proto schemas
    pub namespace: String,

    /// Binary format to produce
    pub format: BinaryFormat,

    /// Hours east of UTC used to read date cells
    pub time_zone: f64,

    /// Which side's fields to export
    pub access: FieldAccess,

    /// Synthesize an `XY_NONE` default case for new enums
    pub auto_default_case: bool,

    /// Fixed-point encoding of `float` fields
    pub fixed32: FixedPointConfig,

    /// Fixed-point encoding of `double` fields
    pub fixed64: FixedPointConfig,

    /// Store fixed-point memory as unsigned integers
    pub unsigned_encoding: bool,

    /// Only convert sheets whose name is entirely uppercase
    pub uppercase_sheets_only: bool,

    /// Enum registry file; defaults to `shared_enum.json` in the workspace
    pub enum_registry: Option<PathBuf>,

    /// Stop the batch at the first failing sheet
    pub halt_on_error: bool,
}

impl Default for SheetCfgConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("./sheetcfg-out"),
            namespace: "dataconfig".to_string(),
            format: BinaryFormat::Flatbuffers,
            time_zone: 8.0,
            access: FieldAccess::Default,
            auto_default_case: false,
            fixed32: FixedPointConfig::default(),
            fixed64: FixedPointConfig::default(),
            unsigned_encoding: false,
            uppercase_sheets_only: true,
            enum_registry: None,
            halt_on_error: false,
        }
    }
}

impl SheetCfgConfig {
    /// Load configuration from a `YAML` file with environment variable substitution
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::IoError` if the file cannot be read
    /// Returns `SheetCfgError::ConfigError` if the YAML cannot be parsed or fails validation
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from `YAML` text
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` if the YAML cannot be parsed or fails validation
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let substituted = substitute_env_vars(contents);
        let config: Self = serde_yaml::from_str(&substituted)
            .map_err(|e| SheetCfgError::config(format!("Failed to parse YAML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::ConfigError` for non-finite time zones, empty
    /// namespaces and fixed-point widths that leave no integer bits
    pub fn validate(&self) -> Result<()> {
        if !self.time_zone.is_finite() || self.time_zone.abs() > 14.0 {
            return Err(SheetCfgError::config(format!(
                "time zone must be within -14..=14 hours, got {}",
                self.time_zone
            )));
        }
        if self.namespace.trim().is_empty() {
            return Err(SheetCfgError::config("namespace must not be empty"));
        }
        self.fixed32_codec()?;
        self.fixed64_codec()?;
        Ok(())
    }

    pub fn fixed32_codec(&self) -> Result<Option<FixedCodec>> {
        self.fixed32.codec(32)
    }

    pub fn fixed64_codec(&self) -> Result<Option<FixedCodec>> {
        self.fixed64.codec(64)
    }

    /// Effective enum registry path
    #[must_use]
    pub fn enum_registry_path(&self) -> PathBuf {
        self.enum_registry
            .clone()
            .unwrap_or_else(|| self.workspace.join(ENUM_REGISTRY_FILE))
    }
}

/// Substitute environment variables in the format `${VAR:-default}`
fn substitute_env_vars(content: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(3).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
