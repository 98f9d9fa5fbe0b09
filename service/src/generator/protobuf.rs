//! Protocol Buffers code generator for sheet schemas
//!
//! Emits proto2 so that field labels and `[default = ..]` options survive;
//! field numbers follow the slot order of each record's canonical layout.

use std::fmt::Write;

use sheetcfg_core::prelude::*;
use sheetcfg_core::schema::FIXED_MEMORY_NAME;

use super::traits::{
    GeneratorOptions, SHARED_ENUM_STEM, SHARED_PREFIX, SchemaGenerator, comment_text, fixed_records,
    fmt_error, member_type_name, records_in_order, uses_enums,
};
use crate::registry::EnumRegistry;

/// Protocol Buffers generator
#[derive(Debug, Clone, Default)]
pub struct ProtobufGenerator {
    /// Generator options
    options: GeneratorOptions,
}

impl ProtobufGenerator {
    /// Create a new Protocol Buffers generator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub fn with_options(options: GeneratorOptions) -> Self {
        Self { options }
    }

    /// Generate proto file header
    fn generate_header(&self, output: &mut String, imports: &[String]) -> Result<()> {
        writeln!(output, "syntax = \"proto2\";").map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)?;
        writeln!(output, "package {};", self.options.namespace).map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)?;
        for import in imports {
            writeln!(output, "import \"{import}\";").map_err(fmt_error)?;
        }
        if !imports.is_empty() {
            writeln!(output).map_err(fmt_error)?;
        }
        Ok(())
    }

    /// Generate message definition
    fn generate_message(&self, output: &mut String, schema: &Schema, table: FieldId, comment: Option<&str>) -> Result<()> {
        let indent = self.options.indent.single();
        let type_name = &schema.table(table)?.type_name;
        let id_field = schema.id_field();
        if let Some(comment) = comment {
            writeln!(output, "// {comment}").map_err(fmt_error)?;
        }
        writeln!(output, "message {type_name} {{").map_err(fmt_error)?;
        for (index, member) in schema.exported_members(table, self.options.access).into_iter().enumerate() {
            let field = schema.field(member);
            if let Some(desc) = comment_text(&field.description) {
                writeln!(output, "{indent}// {desc}").map_err(fmt_error)?;
            }
            let label = if matches!(field.kind, FieldKind::Array(_)) {
                FieldRule::Repeated.as_str()
            } else {
                field.rule.as_str()
            };
            let type_name = member_type_name(schema, field, ScalarType::proto_name);
            write!(output, "{indent}{label} {type_name} {} = {}", field.name, index + 1).map_err(fmt_error)?;
            if Some(member) != id_field {
                if let Some(default) = default_option(field) {
                    write!(output, " [default = {default}]").map_err(fmt_error)?;
                }
            }
            writeln!(output, ";").map_err(fmt_error)?;
        }
        writeln!(output, "}}").map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)
    }
}

/// Value of the `default` option, for non-repeated scalars and enums
fn default_option(field: &Field) -> Option<String> {
    if field.is_repeated() || field.default.is_empty() {
        return None;
    }
    match &field.kind {
        FieldKind::Scalar(ScalarType::String | ScalarType::Bytes) => Some(format!("{:?}", field.default)),
        FieldKind::Scalar(_) | FieldKind::Enum(_) => Some(field.default.clone()),
        _ => None,
    }
}

impl SchemaGenerator for ProtobufGenerator {
    fn name(&self) -> &'static str {
        "protobuf"
    }

    fn format(&self) -> BinaryFormat {
        BinaryFormat::Protobuf
    }

    fn generate_enums(&self, registry: &EnumRegistry) -> Result<String> {
        let indent = self.options.indent.single();
        let mut output = String::new();
        self.generate_header(&mut output, &[])?;
        for (enum_name, cases) in registry.iter() {
            if cases.is_empty() {
                continue;
            }
            writeln!(output, "enum {enum_name} {{").map_err(fmt_error)?;
            for (case, ordinal) in registry.sorted_cases(enum_name) {
                writeln!(output, "{indent}{case} = {ordinal};").map_err(fmt_error)?;
            }
            writeln!(output, "}}").map_err(fmt_error)?;
            writeln!(output).map_err(fmt_error)?;
        }
        Ok(output)
    }

    fn generate_fixed(&self, record_name: &str, memory: ScalarType) -> Result<String> {
        let mut output = String::new();
        self.generate_header(&mut output, &[])?;
        writeln!(output, "message {record_name} {{").map_err(fmt_error)?;
        writeln!(
            output,
            "{}required {} {FIXED_MEMORY_NAME} = 1;",
            self.options.indent.single(),
            memory.proto_name()
        )
        .map_err(fmt_error)?;
        writeln!(output, "}}").map_err(fmt_error)?;
        Ok(output)
    }

    fn generate_sheet(&self, schema: &Schema, registry: &EnumRegistry) -> Result<String> {
        let access = self.options.access;
        let root = schema.root()?;
        let mut output = String::new();
        writeln!(output, "// Generated by sheetcfg from sheet {}", schema.sheet_name()).map_err(fmt_error)?;

        let mut imports = Vec::new();
        if uses_enums(schema, access) && !registry.is_empty() {
            imports.push(format!("{SHARED_ENUM_STEM}.proto"));
        }
        for (record_name, _) in fixed_records(schema) {
            imports.push(format!("{SHARED_PREFIX}{record_name}.proto"));
        }
        self.generate_header(&mut output, &imports)?;

        for table in records_in_order(schema, access) {
            let comment = (table == root).then(|| format!("One row of sheet {}", schema.sheet_name()));
            self.generate_message(&mut output, schema, table, comment.as_deref())?;
        }

        writeln!(output, "message {} {{", schema.root_array_name()?).map_err(fmt_error)?;
        writeln!(
            output,
            "{}repeated {} items = 1;",
            self.options.indent.single(),
            schema.root_type_name()?
        )
        .map_err(fmt_error)?;
        writeln!(output, "}}").map_err(fmt_error)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceOptions, SchemaInferencer};
    use sheetcfg_core::MemoryGrid;

    #[test]
    fn test_message_fields() {
        let grid = MemoryGrid::from_text_rows(
            "ITEM",
            [
                ["required", "optional", "repeated", "optional"],
                ["int32", "date", "string", "bool"],
                ["id", "opens", "aliases", "stackable=1"],
                ["", "", "", ""],
                ["", "", "", ""],
            ],
        );
        let schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let text = ProtobufGenerator::new()
            .generate_sheet(&schema, &EnumRegistry::new())
            .unwrap();
        assert!(text.contains("syntax = \"proto2\";\n\npackage dataconfig;"), "{text}");
        assert!(text.contains("    required int32 id = 1;\n"), "{text}");
        assert!(text.contains("    optional uint32 opens = 2 [default = 0];"), "{text}");
        assert!(text.contains("    repeated string aliases = 3;"), "{text}");
        assert!(text.contains("    optional bool stackable = 4 [default = true];"), "{text}");
        assert!(text.contains("message ITEM_ARRAY {\n    repeated ITEM items = 1;\n}"), "{text}");
    }

    #[test]
    fn test_fixed_record() {
        let text = ProtobufGenerator::new()
            .generate_fixed("FixedFloat32", ScalarType::Int32)
            .unwrap();
        assert!(text.contains("message FixedFloat32 {\n    required int32 memory = 1;\n}"));
    }
}
