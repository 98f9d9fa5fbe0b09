//! Error types for sheetcfg operations

use thiserror::Error;

/// Main error type for schema inference, encoding and artifact generation
#[derive(Error, Debug)]
pub enum SheetCfgError {
    /// Array elements or same-named tables disagree in structure
    #[error("Shape mismatch for '{type_name}': {message}")]
    SchemaShapeMismatch {
        /// Record type whose layouts disagree
        type_name: String,
        /// Description of the first difference found
        message: String,
    },

    /// Two members of one table share a name
    #[error("Duplicate field name '{name}' at {location}")]
    DuplicateFieldName {
        /// Offending member name
        name: String,
        /// Cell location of the second declaration
        location: String,
    },

    /// Type token is neither a scalar, an enum reference nor a count
    #[error("Unresolved type '{token}' at {location}")]
    UnresolvedType {
        /// Raw type cell content
        token: String,
        /// Cell location
        location: String,
    },

    /// A cell literal could not be parsed as the declared type
    #[error("Malformed literal '{value}', expected {expected}{}", location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default())]
    MalformedLiteral {
        /// Raw literal
        value: String,
        /// Expected shape of the literal
        expected: String,
        /// Cell location if available
        location: Option<String>,
    },

    /// Other schema construction errors
    #[error("Schema error: {message}{}", location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default())]
    SchemaError {
        /// Error message
        message: String,
        /// Cell location if available
        location: Option<String>,
    },

    /// Encoded bytes could not be read back
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Workbook loading errors
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    /// Schema text generation errors
    #[error("Generation error: {0}")]
    GenerationError(String),
}

/// Result type alias for sheetcfg operations
pub type Result<T> = std::result::Result<T, SheetCfgError>;

impl SheetCfgError {
    /// Create a new schema error
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError {
            message: message.into(),
            location: None,
        }
    }

    /// Create a new schema error with location
    #[must_use]
    pub fn schema_at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::SchemaError {
            message: message.into(),
            location: Some(location.into()),
        }
    }

    /// Create a new shape mismatch error
    #[must_use]
    pub fn shape_mismatch(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaShapeMismatch {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create a new malformed literal error
    #[must_use]
    pub fn malformed(value: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            value: value.into(),
            expected: expected.into(),
            location: None,
        }
    }

    /// Attach a cell location to literal and schema errors that lack one
    #[must_use]
    pub fn with_location(self, at: impl Into<String>) -> Self {
        match self {
            Self::MalformedLiteral {
                value,
                expected,
                location: None,
            } => Self::MalformedLiteral {
                value,
                expected,
                location: Some(at.into()),
            },
            Self::SchemaError {
                message,
                location: None,
            } => Self::SchemaError {
                message,
                location: Some(at.into()),
            },
            other => other,
        }
    }

    /// Create a new decode error
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeError(message.into())
    }

    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a spreadsheet loading error
    #[must_use]
    pub fn spreadsheet(message: impl Into<String>) -> Self {
        Self::SpreadsheetError(message.into())
    }

    /// Create a generation error
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationError(message.into())
    }

    /// Whether the error only concerns the sheet being processed
    #[must_use]
    pub fn is_sheet_local(&self) -> bool {
        matches!(
            self,
            Self::SchemaShapeMismatch { .. }
                | Self::DuplicateFieldName { .. }
                | Self::UnresolvedType { .. }
                | Self::MalformedLiteral { .. }
                | Self::SchemaError { .. }
                | Self::SpreadsheetError(_)
                | Self::GenerationError(_)
        )
    }
}

// Implement conversions for common error types
impl From<serde_json::Error> for SheetCfgError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SheetCfgError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<regex::Error> for SheetCfgError {
    fn from(err: regex::Error) -> Self {
        Self::SchemaError {
            message: err.to_string(),
            location: None,
        }
    }
}

impl From<std::fmt::Error> for SheetCfgError {
    fn from(err: std::fmt::Error) -> Self {
        Self::GenerationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SheetCfgError::schema("bad count");
        assert!(matches!(err, SheetCfgError::SchemaError { .. }));

        let err = SheetCfgError::schema_at("bad count", "B2");
        match err {
            SheetCfgError::SchemaError { location, .. } => {
                assert_eq!(location.as_deref(), Some("B2"));
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = SheetCfgError::DuplicateFieldName {
            name: "level".to_string(),
            location: "D3".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("level"));
        assert!(display.contains("D3"));

        let err = SheetCfgError::malformed("2020-13-01", "date").with_location("F7");
        assert_eq!(
            err.to_string(),
            "Malformed literal '2020-13-01', expected date at F7"
        );
    }

    #[test]
    fn test_location_not_overwritten() {
        let err = SheetCfgError::schema_at("truncated", "C2").with_location("Z9");
        assert!(err.to_string().ends_with("at C2"));
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: SheetCfgError = json_err.into();
        assert!(matches!(err, SheetCfgError::SerializationError(_)));
        assert!(!err.is_sheet_local());
    }
}
