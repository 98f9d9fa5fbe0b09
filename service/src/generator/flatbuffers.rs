//! FlatBuffers schema (`.fbs`) generator

use std::fmt::Write;

use sheetcfg_core::prelude::*;

use super::traits::{
    GeneratorOptions, SHARED_ENUM_STEM, SHARED_PREFIX, SchemaGenerator, comment_text, fixed_records,
    fmt_error, member_type_name, records_in_order, uses_enums,
};
use crate::registry::EnumRegistry;

/// FlatBuffers schema generator
#[derive(Debug, Clone, Default)]
pub struct FlatBuffersGenerator {
    options: GeneratorOptions,
}

impl FlatBuffersGenerator {
    /// Create a new FlatBuffers generator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub fn with_options(options: GeneratorOptions) -> Self {
        Self { options }
    }

    fn write_namespace(&self, output: &mut String) -> Result<()> {
        writeln!(output, "namespace {};", self.options.namespace).map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)
    }

    /// `name:type = default (key);` for one member
    fn field_line(&self, schema: &Schema, member: FieldId, key: bool) -> Result<String> {
        let field = schema.field(member);
        let type_name = member_type_name(schema, field, ScalarType::fbs_name);
        let repeated = field.is_repeated() || matches!(field.kind, FieldKind::Array(_));
        if repeated && matches!(field.kind, FieldKind::Scalar(ScalarType::Bytes)) {
            return Err(SheetCfgError::generation(format!(
                "repeated bytes field '{}' cannot be expressed in FlatBuffers",
                field.name
            )));
        }
        let mut line = if repeated {
            format!("{}:[{type_name}]", field.name)
        } else {
            format!("{}:{type_name}", field.name)
        };
        if !repeated && !key {
            if let Some(default) = default_text(field) {
                write!(line, " = {default}").map_err(fmt_error)?;
            }
        }
        if key {
            line.push_str(" (key)");
        }
        line.push(';');
        Ok(line)
    }

    fn write_table(&self, output: &mut String, schema: &Schema, table: FieldId, comment: Option<&str>) -> Result<()> {
        let indent = self.options.indent.single();
        let type_name = &schema.table(table)?.type_name;
        let id_field = schema.id_field();
        if let Some(comment) = comment {
            writeln!(output, "// {comment}").map_err(fmt_error)?;
        }
        writeln!(output, "table {type_name} {{").map_err(fmt_error)?;
        for member in schema.exported_members(table, self.options.access) {
            let field = schema.field(member);
            if let Some(desc) = comment_text(&field.description) {
                writeln!(output, "{indent}// {desc}").map_err(fmt_error)?;
            }
            let key = Some(member) == id_field;
            writeln!(output, "{indent}{}", self.field_line(schema, member, key)?).map_err(fmt_error)?;
        }
        writeln!(output, "}}").map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)
    }
}

/// Default literal as written after `=`, if the field has one
fn default_text(field: &Field) -> Option<String> {
    match &field.kind {
        FieldKind::Scalar(ScalarType::String) if !field.default.is_empty() => {
            Some(format!("{:?}", field.default))
        }
        FieldKind::Scalar(ScalarType::String | ScalarType::Bytes) => None,
        FieldKind::Scalar(_) | FieldKind::Enum(_) if !field.default.is_empty() => {
            Some(field.default.clone())
        }
        _ => None,
    }
}

impl SchemaGenerator for FlatBuffersGenerator {
    fn name(&self) -> &'static str {
        "flatbuffers"
    }

    fn format(&self) -> BinaryFormat {
        BinaryFormat::Flatbuffers
    }

    fn generate_enums(&self, registry: &EnumRegistry) -> Result<String> {
        let indent = self.options.indent.single();
        let mut output = String::new();
        self.write_namespace(&mut output)?;
        for (enum_name, cases) in registry.iter() {
            if cases.is_empty() {
                continue;
            }
            let repr = registry.repr(enum_name);
            writeln!(output, "enum {enum_name}:{} {{", repr.fbs_name()).map_err(fmt_error)?;
            for (case, ordinal) in registry.sorted_cases(enum_name) {
                writeln!(output, "{indent}{case} = {ordinal},").map_err(fmt_error)?;
            }
            writeln!(output, "}}").map_err(fmt_error)?;
            writeln!(output).map_err(fmt_error)?;
        }
        Ok(output)
    }

    fn generate_fixed(&self, record_name: &str, memory: ScalarType) -> Result<String> {
        let mut output = String::new();
        self.write_namespace(&mut output)?;
        writeln!(output, "table {record_name} {{").map_err(fmt_error)?;
        writeln!(
            output,
            "{}{}:{};",
            self.options.indent.single(),
            sheetcfg_core::schema::FIXED_MEMORY_NAME,
            memory.fbs_name()
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
        writeln!(output).map_err(fmt_error)?;

        let mut includes = Vec::new();
        if uses_enums(schema, access) && !registry.is_empty() {
            includes.push(format!("{SHARED_ENUM_STEM}.fbs"));
        }
        for (record_name, _) in fixed_records(schema) {
            includes.push(format!("{SHARED_PREFIX}{record_name}.fbs"));
        }
        for include in &includes {
            writeln!(output, "include \"{include}\";").map_err(fmt_error)?;
        }
        if !includes.is_empty() {
            writeln!(output).map_err(fmt_error)?;
        }
        self.write_namespace(&mut output)?;

        for table in records_in_order(schema, access) {
            let comment = (table == root).then(|| format!("One row of sheet {}", schema.sheet_name()));
            self.write_table(&mut output, schema, table, comment.as_deref())?;
        }

        let root_type = schema.root_type_name()?;
        let root_array = schema.root_array_name()?;
        writeln!(output, "table {root_array} {{").map_err(fmt_error)?;
        writeln!(output, "{}items:[{root_type}];", self.options.indent.single()).map_err(fmt_error)?;
        writeln!(output, "}}").map_err(fmt_error)?;
        writeln!(output).map_err(fmt_error)?;
        writeln!(output, "root_type {root_array};").map_err(fmt_error)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceOptions, SchemaInferencer};
    use sheetcfg_core::MemoryGrid;

    #[test]
    fn test_field_defaults_and_key() {
        let grid = MemoryGrid::from_text_rows(
            "ITEM",
            [
                ["required", "optional", "optional", "repeated"],
                ["int32", "string", "int16", "int32"],
                ["id", "title=Blade", "weight=5", "tags"],
                ["", "", "", ""],
                ["", "name of the item", "", ""],
            ],
        );
        let schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let text = FlatBuffersGenerator::new()
            .generate_sheet(&schema, &EnumRegistry::new())
            .unwrap();
        assert!(text.contains("    id:int (key);"), "{text}");
        assert!(text.contains("    // name of the item\n    title:string = \"Blade\";"), "{text}");
        assert!(text.contains("    weight:short = 5;"), "{text}");
        assert!(text.contains("    tags:[int];"), "{text}");
        assert!(text.contains("table ITEM_ARRAY {\n    items:[ITEM];\n}"), "{text}");
        assert!(text.ends_with("root_type ITEM_ARRAY;\n"));
        assert!(!text.contains("include"));
    }

    #[test]
    fn test_repeated_bytes_rejected() {
        let grid = MemoryGrid::from_text_rows(
            "BLOB",
            [["repeated"], ["bytes"], ["chunks"], [""], [""]],
        );
        let schema = SchemaInferencer::new(&grid, InferenceOptions::default())
            .infer()
            .unwrap();
        let err = FlatBuffersGenerator::new()
            .generate_sheet(&schema, &EnumRegistry::new())
            .unwrap_err();
        assert!(matches!(err, SheetCfgError::GenerationError(_)));
    }
}
