//! Field type and rule vocabulary shared by inference, encoding and generation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SheetCfgError;

/// Prefix marking an enum reference in the type row
pub const ENUM_TYPE_PREFIX: &str = "enum.";

/// Scalar value types that may appear in the type row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    Bytes,
    /// `YYYY-MM-DD HH:MM:SS` literal stored as Unix seconds
    Date,
    /// `[[[d:]h:]m:]s` literal stored as seconds
    Duration,
}

impl ScalarType {
    /// Resolve a type token, accepting the usual width aliases
    ///
    /// Tokens are matched case-insensitively, so `DateTime`, `datetime` and
    /// `date` all resolve to [`ScalarType::Date`].
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let lowered = token.trim().to_ascii_lowercase();
        let t = match lowered.as_str() {
            "byte" | "int8" => Self::Int8,
            "ubyte" | "uint8" => Self::UInt8,
            "short" | "int16" => Self::Int16,
            "ushort" | "uint16" => Self::UInt16,
            "int" | "int32" => Self::Int32,
            "uint" | "uint32" => Self::UInt32,
            "long" | "int64" => Self::Int64,
            "ulong" | "uint64" => Self::UInt64,
            "float" | "float32" => Self::Float32,
            "double" | "float64" => Self::Float64,
            "bool" => Self::Bool,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "date" | "datetime" => Self::Date,
            "duration" => Self::Duration,
            _ => return None,
        };
        Some(t)
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Date
                | Self::Duration
        )
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Numeric types sort numerically when used as an `id` column
    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Whether the value travels as an out-of-line object rather than inline
    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Inclusive integer range for integer types, `None` otherwise
    #[must_use]
    pub fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Self::Int8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            Self::UInt8 => (0, i128::from(u8::MAX)),
            Self::Int16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            Self::UInt16 => (0, i128::from(u16::MAX)),
            Self::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            Self::UInt32 | Self::Date | Self::Duration => (0, i128::from(u32::MAX)),
            Self::Int64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            Self::UInt64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(range)
    }

    /// Literal used when a column declares no default
    #[must_use]
    pub fn default_literal(self) -> &'static str {
        match self {
            Self::Bool => "false",
            Self::String | Self::Bytes => "",
            _ => "0",
        }
    }

    /// Type name in FlatBuffers schema text
    #[must_use]
    pub fn fbs_name(self) -> &'static str {
        match self {
            Self::Int8 => "byte",
            Self::UInt8 => "ubyte",
            Self::Int16 => "short",
            Self::UInt16 => "ushort",
            Self::Int32 => "int",
            Self::UInt32 | Self::Date | Self::Duration => "uint",
            Self::Int64 => "long",
            Self::UInt64 => "ulong",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "[ubyte]",
        }
    }

    /// Type name in proto2 schema text
    ///
    /// Protocol Buffers has no 8 or 16 bit integers, so those widen to 32 bits.
    #[must_use]
    pub fn proto_name(self) -> &'static str {
        match self {
            Self::Int8 | Self::Int16 | Self::Int32 => "int32",
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::Date | Self::Duration => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::Duration => "duration",
        };
        f.write_str(name)
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRule {
    #[default]
    Optional,
    Required,
    Repeated,
}

impl FieldRule {
    /// Parse a rule cell, case-insensitively
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "repeated" => Some(Self::Repeated),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Repeated => "repeated",
        }
    }
}

/// Which side of the game a field is exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAccess {
    #[default]
    Default,
    Client,
    Server,
}

impl FieldAccess {
    /// Parse an access cell; unknown tokens mean shared
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "s" | "svr" | "server" => Self::Server,
            "c" | "cli" | "client" => Self::Client,
            _ => Self::Default,
        }
    }

    /// Whether a field with this scope is exported under the `filter` setting
    #[must_use]
    pub fn is_visible_to(self, filter: Self) -> bool {
        filter == Self::Default || self == Self::Default || self == filter
    }
}

impl FromStr for FieldAccess {
    type Err = SheetCfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(SheetCfgError::config(format!(
                "unknown access scope '{other}', expected default, client or server"
            ))),
        }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Client => "client",
            Self::Server => "server",
        })
    }
}

/// Special encoding applied to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldTag {
    #[default]
    None,
    FixedFloat32,
    FixedFloat64,
}

impl FieldTag {
    /// Record type wrapping a fixed-point value
    #[must_use]
    pub fn record_name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::FixedFloat32 => Some("FixedFloat32"),
            Self::FixedFloat64 => Some("FixedFloat64"),
        }
    }

    /// Storage width in bits of the fixed-point memory
    #[must_use]
    pub fn total_bits(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::FixedFloat32 => Some(32),
            Self::FixedFloat64 => Some(64),
        }
    }
}

/// Storage width of an enum in table-oriented schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnumRepr {
    UByte,
    UShort,
}

impl EnumRepr {
    /// Pick the narrowest width holding `case_count` cases
    #[must_use]
    pub fn for_case_count(case_count: usize) -> Self {
        if case_count < 0xFF {
            Self::UByte
        } else {
            Self::UShort
        }
    }

    #[must_use]
    pub fn fbs_name(self) -> &'static str {
        match self {
            Self::UByte => "ubyte",
            Self::UShort => "ushort",
        }
    }
}

/// Output binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryFormat {
    #[default]
    Flatbuffers,
    Protobuf,
}

impl BinaryFormat {
    /// Extension of the schema text file
    #[must_use]
    pub fn schema_extension(self) -> &'static str {
        match self {
            Self::Flatbuffers => "fbs",
            Self::Protobuf => "proto",
        }
    }

    /// Extension of the encoded data file
    #[must_use]
    pub fn data_extension(self) -> &'static str {
        match self {
            Self::Flatbuffers => "fpb",
            Self::Protobuf => "ppb",
        }
    }
}
