//! Core generator traits and types
//!
//! A [`SchemaGenerator`] turns one sheet's schema plus the shared enum
//! registry into schema-definition text for an external schema compiler.

use sheetcfg_core::prelude::*;
use sheetcfg_core::schema::FIXED_MEMORY_NAME;

use crate::registry::EnumRegistry;

/// Base name of the file holding every registered enum
pub const SHARED_ENUM_STEM: &str = "shared_enum";

/// Prefix of the files holding the fixed-point wrapper records
pub const SHARED_PREFIX: &str = "shared_";

/// Options for schema text generation
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// `namespace` in FlatBuffers, `package` in Protocol Buffers
    pub namespace: String,

    /// Only fields visible to this side are emitted
    pub access: FieldAccess,

    /// Indentation style
    pub indent: IndentStyle,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            namespace: "dataconfig".to_string(),
            access: FieldAccess::Default,
            indent: IndentStyle::default(),
        }
    }
}

impl GeneratorOptions {
    /// Create new generator options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options taken from a run configuration
    #[must_use]
    pub fn from_config(config: &SheetCfgConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            access: config.access,
            indent: IndentStyle::default(),
        }
    }

    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the access filter
    #[must_use]
    pub fn with_access(mut self, access: FieldAccess) -> Self {
        self.access = access;
        self
    }

    /// Set indentation style
    #[must_use]
    pub fn with_indent(mut self, indent: IndentStyle) -> Self {
        self.indent = indent;
        self
    }
}

/// Indentation style for generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndentStyle {
    /// Use spaces for indentation
    Spaces(usize),
    /// Use tabs for indentation
    Tabs,
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self::Spaces(4)
    }
}

impl IndentStyle {
    /// Get single indentation string
    #[must_use]
    pub fn single(&self) -> String {
        match self {
            Self::Spaces(n) => " ".repeat(*n),
            Self::Tabs => "\t".to_string(),
        }
    }
}

/// One generated schema file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name relative to the output directory
    pub filename: String,
    /// Generated content
    pub content: String,
}

/// Emits schema text for one binary format
pub trait SchemaGenerator {
    /// Get generator name
    fn name(&self) -> &str;

    /// Format whose schema text is produced
    fn format(&self) -> BinaryFormat;

    /// Text declaring every non-empty enum of the registry
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` if formatting fails
    fn generate_enums(&self, registry: &EnumRegistry) -> Result<String>;

    /// Text declaring a fixed-point wrapper record with `memory` as its field
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` if formatting fails
    fn generate_fixed(&self, record_name: &str, memory: ScalarType) -> Result<String>;

    /// Text declaring every record of a sheet plus its root array record
    ///
    /// # Errors
    ///
    /// Returns `SheetCfgError::GenerationError` for fields the format cannot
    /// express
    fn generate_sheet(&self, schema: &Schema, registry: &EnumRegistry) -> Result<String>;

    /// File extension of the schema text
    fn file_extension(&self) -> &'static str {
        self.format().schema_extension()
    }

    /// File name of a sheet's schema text
    fn sheet_filename(&self, schema: &Schema) -> String {
        format!(
            "{}.{}",
            schema.sheet_name().to_lowercase(),
            self.file_extension()
        )
    }

    /// Every file a sheet needs: the shared enum file, the shared
    /// fixed-point records it uses and its own schema text
    ///
    /// # Errors
    ///
    /// Returns the first generation error
    fn generate_all(&self, schema: &Schema, registry: &EnumRegistry) -> Result<Vec<GeneratedFile>> {
        let ext = self.file_extension();
        let mut files = Vec::new();
        if registry.iter().any(|(_, cases)| !cases.is_empty()) {
            files.push(GeneratedFile {
                filename: format!("{SHARED_ENUM_STEM}.{ext}"),
                content: self.generate_enums(registry)?,
            });
        }
        for (record_name, memory) in fixed_records(schema) {
            files.push(GeneratedFile {
                filename: format!("{SHARED_PREFIX}{record_name}.{ext}"),
                content: self.generate_fixed(&record_name, memory)?,
            });
        }
        files.push(GeneratedFile {
            filename: self.sheet_filename(schema),
            content: self.generate_sheet(schema, registry)?,
        });
        Ok(files)
    }
}

/// Fixed-point wrapper records used by a schema, with their memory type
#[must_use]
pub fn fixed_records(schema: &Schema) -> Vec<(String, ScalarType)> {
    [FieldTag::FixedFloat32, FieldTag::FixedFloat64]
        .into_iter()
        .filter_map(|tag| {
            let name = tag.record_name()?;
            let layout = schema.layout(name)?;
            let member = *schema.table(layout).ok()?.members.first()?;
            let field = schema.field(member);
            match field.kind {
                FieldKind::Scalar(memory) if field.name == FIXED_MEMORY_NAME => {
                    Some((name.to_string(), memory))
                }
                _ => None,
            }
        })
        .collect()
}

/// Whether any exported field of the schema reads from an enum
#[must_use]
pub fn uses_enums(schema: &Schema, access: FieldAccess) -> bool {
    schema
        .layouts()
        .flat_map(|(_, table)| schema.exported_members(table, access))
        .any(|m| matches!(schema.field(m).kind, FieldKind::Enum(_)))
}

/// Record types in declaration order: every nested record precedes the
/// records that refer to it, the root comes last, and fixed-point wrappers
/// are left to their shared files
#[must_use]
pub fn records_in_order(schema: &Schema, access: FieldAccess) -> Vec<FieldId> {
    fn visit(schema: &Schema, table: FieldId, access: FieldAccess, seen: &mut Vec<FieldId>) {
        let canonical = schema.canonical(table);
        if seen.contains(&canonical) {
            return;
        }
        for member in schema.exported_members(canonical, access) {
            let field = schema.field(member);
            if field.tag != FieldTag::None {
                continue;
            }
            match &field.kind {
                FieldKind::Table(_) => visit(schema, member, access, seen),
                FieldKind::Array(a) => visit(schema, a.element, access, seen),
                _ => {}
            }
        }
        seen.push(canonical);
    }

    let mut seen = Vec::new();
    if let Ok(root) = schema.root() {
        visit(schema, root, access, &mut seen);
    }
    seen
}

/// Name of the type a member is declared with, without repetition
#[must_use]
pub fn member_type_name<'a>(schema: &'a Schema, field: &'a Field, scalar_name: fn(ScalarType) -> &'static str) -> &'a str {
    match &field.kind {
        FieldKind::Scalar(s) => scalar_name(*s),
        FieldKind::Enum(e) => &e.enum_name,
        FieldKind::Table(t) => &t.type_name,
        FieldKind::Array(a) => schema.record_type_name(a.element).unwrap_or_default(),
    }
}

/// Single-line comment text for a description
#[must_use]
pub fn comment_text(description: &str) -> Option<String> {
    let text = description.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Convert `fmt::Error` into a generation error
pub(crate) fn fmt_error(e: std::fmt::Error) -> SheetCfgError {
    SheetCfgError::generation(e.to_string())
}
