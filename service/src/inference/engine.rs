//! Recursive-descent schema inference over header columns
//!
//! The engine walks the header rows left to right. A type cell holding a
//! number N opens a nested table of N members, or an array of N elements when
//! the rule is `repeated`. Tables consume columns until their member count is
//! reached; the root table consumes every remaining column.

use tracing::debug;

use sheetcfg_core::grid::{ROW_ACCESS, ROW_DESCRIPTION, ROW_NAME, ROW_RULE, ROW_TYPE};
use sheetcfg_core::literal::{
    cell_label, is_int, make_camel, normalize_int_text, parse_bool, parse_date, parse_duration,
    parse_float, parse_int,
};
use sheetcfg_core::schema::FIXED_MEMORY_NAME;
use sheetcfg_core::types::ENUM_TYPE_PREFIX;
use sheetcfg_core::{
    ArrayField, CellType, EnumField, Field, FieldAccess, FieldId, FieldKind, FieldRule, FieldTag,
    FixedCodec, Grid, Result, ScalarType, Schema, SheetCfgError, TableField,
};

/// Markers in the rule or type row that hide a column
const IGNORE_MARKERS: [&str; 2] = ["*", "\u{ff0a}"];

/// Settings the engine needs from the run configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceOptions {
    /// Wrap `float` fields into fixed-point records
    pub fixed32: Option<FixedCodec>,
    /// Wrap `double` fields into fixed-point records
    pub fixed64: Option<FixedCodec>,
    /// Store fixed-point memory as unsigned integers
    pub unsigned_encoding: bool,
    /// Hours east of UTC for date defaults
    pub time_zone: f64,
}

/// A parsed declaration column, before its children are known
enum Declaration {
    Leaf(Field),
    Table {
        field: Field,
        type_name: String,
        member_count: usize,
    },
    Array {
        field: Field,
        count: usize,
    },
}

/// Builds a [`Schema`] from one sheet's header rows
pub struct SchemaInferencer<'a, G: Grid + ?Sized> {
    grid: &'a G,
    options: InferenceOptions,
    schema: Schema,
    type_prefix: String,
}

impl<'a, G: Grid + ?Sized> SchemaInferencer<'a, G> {
    #[must_use]
    pub fn new(grid: &'a G, options: InferenceOptions) -> Self {
        Self {
            grid,
            options,
            schema: Schema::new(grid.sheet_name()),
            type_prefix: make_camel(grid.sheet_name(), true),
        }
    }

    /// Parse every column into the root table named after the sheet
    ///
    /// # Errors
    ///
    /// Returns the first construction error; the sheet must then be skipped
    pub fn infer(mut self) -> Result<Schema> {
        let mut root = Field::scalar(self.grid.sheet_name(), ScalarType::Int32, 0);
        root.rule = FieldRule::Required;
        let type_name = self.grid.sheet_name().to_string();
        let (root_id, _) = self.parse_table(root, type_name, 0, 0, 0)?;
        self.schema.set_root(root_id);
        if self.schema.table(root_id)?.members.is_empty() {
            return Err(SheetCfgError::schema(format!(
                "sheet {} declares no fields",
                self.grid.sheet_name()
            )));
        }
        Ok(self.schema)
    }

    fn header(&self, row: usize, col: usize) -> String {
        self.grid.text(row, col)
    }

    /// Read the header cells of one column
    fn parse_field(&self, col: usize) -> Result<Option<Declaration>> {
        if self.grid.cell_type(ROW_RULE, col) != CellType::Text {
            return Ok(None);
        }
        let rule_token = self.header(ROW_RULE, col);
        let type_token = self.header(ROW_TYPE, col);
        let ignored = |t: &str| t.is_empty() || IGNORE_MARKERS.contains(&t);
        if ignored(&rule_token) || ignored(&type_token) {
            return Ok(None);
        }

        let rule = FieldRule::from_token(&rule_token).ok_or_else(|| {
            SheetCfgError::schema_at(
                format!("unknown field rule '{rule_token}'"),
                cell_label(ROW_RULE, col),
            )
        })?;
        let name_cell = self.header(ROW_NAME, col);
        let (name, default) = match name_cell.find('=') {
            Some(sep) if sep > 0 => (
                name_cell[..sep].trim().to_string(),
                name_cell[sep + 1..].trim().to_string(),
            ),
            _ => (name_cell.clone(), String::new()),
        };
        if name.is_empty() {
            return Err(SheetCfgError::schema_at("field has no name", cell_label(ROW_NAME, col)));
        }

        let mut field = Field::scalar(name, ScalarType::String, col);
        field.rule = rule;
        field.access = FieldAccess::from_token(&self.header(ROW_ACCESS, col));
        field.description = self.header(ROW_DESCRIPTION, col);

        if is_int(&type_token) {
            let count = usize::try_from(parse_int(&type_token)?)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    SheetCfgError::schema_at(
                        format!("member count '{type_token}' must be positive"),
                        cell_label(ROW_TYPE, col),
                    )
                })?;
            if rule == FieldRule::Repeated {
                return Ok(Some(Declaration::Array { field, count }));
            }
            let base = if default.is_empty() { &field.name } else { &default };
            let type_name = format!("{}{}", self.type_prefix, make_camel(base, false));
            return Ok(Some(Declaration::Table {
                field,
                type_name,
                member_count: count,
            }));
        }

        if let Some(enum_name) = type_token.strip_prefix(ENUM_TYPE_PREFIX) {
            if enum_name.is_empty() {
                return Err(SheetCfgError::UnresolvedType {
                    token: type_token.clone(),
                    location: cell_label(ROW_TYPE, col),
                });
            }
            field.kind = FieldKind::Enum(EnumField {
                enum_name: enum_name.to_string(),
            });
            // resolved against the registry once data rows are scanned
            field.default = if field.is_repeated() { String::new() } else { default };
            return Ok(Some(Declaration::Leaf(field)));
        }

        let scalar = ScalarType::from_token(&type_token).ok_or_else(|| SheetCfgError::UnresolvedType {
            token: type_token.clone(),
            location: cell_label(ROW_TYPE, col),
        })?;
        field.kind = FieldKind::Scalar(scalar);
        field.default = if field.is_repeated() {
            String::new()
        } else if default.is_empty() {
            scalar.default_literal().to_string()
        } else {
            self.default_literal(scalar, &default)
                .map_err(|e| e.with_location(cell_label(ROW_NAME, col)))?
        };
        Ok(Some(Declaration::Leaf(field)))
    }

    /// Normalize a declared default into schema-text form
    fn default_literal(&self, scalar: ScalarType, literal: &str) -> Result<String> {
        let text = match scalar {
            ScalarType::Date => parse_date(literal, self.options.time_zone)?.to_string(),
            ScalarType::Duration => parse_duration(literal)?.to_string(),
            ScalarType::Bool => parse_bool(literal)?.to_string(),
            ScalarType::Float32 | ScalarType::Float64 => {
                parse_float(literal)?;
                literal.to_string()
            }
            ScalarType::String | ScalarType::Bytes => literal.to_string(),
            _ => {
                let value = parse_int(literal)?;
                let (lo, hi) = scalar.integer_range().unwrap_or((i128::MIN, i128::MAX));
                if value < lo || value > hi {
                    return Err(SheetCfgError::malformed(literal, format!("{scalar} default")));
                }
                normalize_int_text(literal)
            }
        };
        Ok(text)
    }

    /// Parse members starting at `col` until `member_count` are found, or to
    /// the last column when `member_count` is zero
    ///
    /// Returns the table id and the first column after it.
    fn parse_table(
        &mut self,
        mut field: Field,
        type_name: String,
        member_count: usize,
        col: usize,
        depth: usize,
    ) -> Result<(FieldId, usize)> {
        debug!(
            "{:indent$}[TABLE] {} at {} members:{}",
            "",
            type_name,
            sheetcfg_core::literal::column_label(col),
            member_count,
            indent = depth * 4
        );
        let col_count = self.grid.col_count();
        let mut members: Vec<FieldId> = Vec::new();
        let mut c = col;
        while c < col_count {
            let Some(declaration) = self.parse_field(c)? else {
                c += 1;
                continue;
            };
            c += 1;
            let member = match declaration {
                Declaration::Leaf(leaf) => self.push_leaf(leaf, depth + 1)?,
                Declaration::Table {
                    field: nested,
                    type_name,
                    member_count,
                } => {
                    let (id, next) = self.parse_table(nested, type_name, member_count, c, depth + 1)?;
                    c = next;
                    id
                }
                Declaration::Array { field: nested, count } => {
                    let (id, next) = self.parse_array(nested, count, c, depth + 1)?;
                    c = next;
                    id
                }
            };
            let name = &self.schema.field(member).name;
            if members.iter().any(|&m| &self.schema.field(m).name == name) {
                return Err(SheetCfgError::DuplicateFieldName {
                    name: name.clone(),
                    location: cell_label(ROW_NAME, self.schema.field(member).offset),
                });
            }
            members.push(member);
            if member_count > 0 && members.len() == member_count {
                return self.finish_table(field, type_name, member_count, members, col, c);
            }
        }
        if member_count > 0 {
            return Err(SheetCfgError::schema_at(
                format!(
                    "table {type_name} declares {member_count} members but only {} fit before the last column",
                    members.len()
                ),
                cell_label(ROW_TYPE, field.offset),
            ));
        }
        field.offset = col;
        self.finish_table(field, type_name, member_count, members, col, col_count)
    }

    fn finish_table(
        &mut self,
        mut field: Field,
        type_name: String,
        member_count: usize,
        members: Vec<FieldId>,
        col: usize,
        next: usize,
    ) -> Result<(FieldId, usize)> {
        field.size = next - col;
        field.default = String::new();
        field.kind = FieldKind::Table(TableField {
            type_name,
            member_count,
            members,
        });
        let id = self.schema.push(field);
        self.schema.register_layout(id)?;
        Ok((id, next))
    }

    /// Parse `count` tables; the first is declared at `col`, the rest follow
    /// with the same shape and no declaration column of their own
    fn parse_array(
        &mut self,
        mut field: Field,
        count: usize,
        col: usize,
        depth: usize,
    ) -> Result<(FieldId, usize)> {
        debug!(
            "{:indent$}[ARRAY] {} at {} count:{}",
            "",
            field.name,
            sheetcfg_core::literal::column_label(col),
            count,
            indent = depth * 4
        );
        let element_decl = self.parse_field(col)?;
        let Some(Declaration::Table {
            field: element,
            type_name,
            member_count,
        }) = element_decl
        else {
            return Err(SheetCfgError::schema_at(
                format!("array '{}' must start with a table declaration", field.name),
                cell_label(ROW_TYPE, col),
            ));
        };
        let template = element.clone();
        let (first, mut c) = self.parse_table(element, type_name.clone(), member_count, col + 1, depth + 1)?;
        let mut elements = vec![first];
        while elements.len() < count {
            if c >= self.grid.col_count() {
                return Err(SheetCfgError::shape_mismatch(
                    &type_name,
                    format!(
                        "array '{}' declares {count} elements but columns end after {}",
                        field.name,
                        elements.len()
                    ),
                ));
            }
            let mut next = template.clone();
            next.offset = c;
            let (element, after) = self
                .parse_table(next, type_name.clone(), member_count, c, depth + 1)
                .map_err(|e| match e {
                    SheetCfgError::SchemaError { message, .. } => {
                        SheetCfgError::shape_mismatch(&type_name, message)
                    }
                    other => other,
                })?;
            self.schema.compare_positional(first, element)?;
            elements.push(element);
            c = after;
        }
        // the array's own declaration column sits just before `col`
        field.size = c - col + 1;
        field.offset = col - 1;
        field.default = String::new();
        field.kind = FieldKind::Array(ArrayField {
            count,
            element: first,
            elements,
        });
        Ok((self.schema.push(field), c))
    }

    /// Add a leaf member, wrapping floats into fixed-point records when enabled
    fn push_leaf(&mut self, field: Field, depth: usize) -> Result<FieldId> {
        debug!(
            "{:indent$}{} {} {} {}",
            "",
            field.column(),
            field.name,
            field.rule.as_str(),
            field.kind.describe(),
            indent = depth * 4
        );
        let codec = match field.kind {
            FieldKind::Scalar(ScalarType::Float32) => self.options.fixed32.map(|c| (c, FieldTag::FixedFloat32)),
            FieldKind::Scalar(ScalarType::Float64) => self.options.fixed64.map(|c| (c, FieldTag::FixedFloat64)),
            _ => None,
        };
        let Some((codec, tag)) = codec else {
            return Ok(self.schema.push(field));
        };
        self.hook_fixed_float(field, codec, tag)
    }

    fn hook_fixed_float(&mut self, field: Field, codec: FixedCodec, tag: FieldTag) -> Result<FieldId> {
        let memory_type = match (codec.total_bits(), self.options.unsigned_encoding) {
            (32, false) => ScalarType::Int32,
            (32, true) => ScalarType::UInt32,
            (_, false) => ScalarType::Int64,
            (_, true) => ScalarType::UInt64,
        };
        let mut holder = Field::scalar(FIXED_MEMORY_NAME, memory_type, field.offset);
        holder.access = field.access;
        holder.default = "0".to_string();
        holder.tag = tag;
        holder.description = format!("representation of float{} value", codec.total_bits());
        let holder = self.schema.push(holder);

        let type_name = tag.record_name().unwrap_or_default().to_string();
        let table = Field {
            default: String::new(),
            tag,
            kind: FieldKind::Table(TableField {
                type_name,
                member_count: 1,
                members: vec![holder],
            }),
            ..field
        };
        let id = self.schema.push(table);
        self.schema.register_layout(id)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcfg_core::MemoryGrid;

    fn grid(columns: &[[&str; 5]]) -> MemoryGrid {
        let rows = (0..5)
            .map(|r| columns.iter().map(|c| c[r]).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        MemoryGrid::from_text_rows("ITEM", rows)
    }

    fn infer(columns: &[[&str; 5]]) -> Result<Schema> {
        let g = grid(columns);
        SchemaInferencer::new(&g, InferenceOptions::default()).infer()
    }

    #[test]
    fn test_flat_fields() {
        let schema = infer(&[
            ["required", "int32", "id", "", "identifier"],
            ["optional", "string", "name=none", "c", ""],
            ["*", "int32", "skipped", "", ""],
            ["repeated", "int16", "scores", "s", ""],
        ])
        .unwrap();
        let root = schema.table(schema.root().unwrap()).unwrap();
        assert_eq!(root.type_name, "ITEM");
        let names: Vec<_> = root.members.iter().map(|&m| schema.field(m).name.as_str()).collect();
        assert_eq!(names, ["id", "name", "scores"]);

        let name = schema.field(root.members[1]);
        assert_eq!(name.default, "none");
        assert_eq!(name.access, FieldAccess::Client);
        let scores = schema.field(root.members[2]);
        assert_eq!(scores.offset, 3);
        assert!(scores.default.is_empty());
        assert_eq!(schema.field(root.members[0]).default, "0");
    }

    #[test]
    fn test_nested_table_and_array() {
        let schema = infer(&[
            ["required", "int32", "id", "", ""],
            ["optional", "2", "pos", "", ""],
            ["optional", "float", "x", "", ""],
            ["optional", "float", "y", "", ""],
            ["repeated", "2", "rewards", "", ""],
            ["optional", "2", "reward", "", ""],
            ["optional", "int32", "item", "", ""],
            ["optional", "int32", "num", "", ""],
            ["optional", "int32", "item", "", ""],
            ["optional", "int32", "num", "", ""],
            ["optional", "bool", "tail", "", ""],
        ])
        .unwrap();
        let root = schema.table(schema.root().unwrap()).unwrap();
        assert_eq!(root.members.len(), 4);

        let pos = schema.field(root.members[1]);
        assert_eq!(pos.as_table().unwrap().type_name, "ItemPos");
        assert_eq!(pos.size, 2);

        let rewards = schema.field(root.members[2]);
        let array = rewards.as_array().unwrap();
        assert_eq!(array.count, 2);
        assert_eq!(array.elements.len(), 2);
        assert_eq!(rewards.offset, 4);
        assert_eq!(rewards.size, 6);
        assert_eq!(schema.field(array.elements[1]).offset, 8);
        assert_eq!(schema.record_type_name(root.members[2]), Some("ItemReward"));

        let tail = schema.field(root.members[3]);
        assert_eq!(tail.offset, 10);
    }

    #[test]
    fn test_table_type_name_override() {
        let schema = infer(&[
            ["optional", "1", "src=point", "", ""],
            ["optional", "int32", "x", "", ""],
            ["optional", "1", "dst=point", "", ""],
            ["optional", "int32", "x", "", ""],
        ])
        .unwrap();
        assert!(schema.layout("ItemPoint").is_some());
    }

    #[test]
    fn test_duplicate_member() {
        let err = infer(&[
            ["required", "int32", "id", "", ""],
            ["optional", "int32", "id", "", ""],
        ])
        .unwrap_err();
        assert!(matches!(err, SheetCfgError::DuplicateFieldName { ref location, .. } if location == "B3"));
    }

    #[test]
    fn test_unresolved_type() {
        let err = infer(&[["optional", "vector3", "pos", "", ""]]).unwrap_err();
        assert!(matches!(err, SheetCfgError::UnresolvedType { ref token, .. } if token == "vector3"));
    }

    #[test]
    fn test_array_shape_mismatch() {
        let err = infer(&[
            ["repeated", "2", "rewards", "", ""],
            ["optional", "1", "reward", "", ""],
            ["optional", "int32", "item", "", ""],
            ["optional", "string", "item", "", ""],
        ])
        .unwrap_err();
        assert!(matches!(err, SheetCfgError::SchemaShapeMismatch { .. }));
    }

    #[test]
    fn test_truncated_nested_table() {
        let err = infer(&[
            ["optional", "3", "pos", "", ""],
            ["optional", "float", "x", "", ""],
        ])
        .unwrap_err();
        assert!(matches!(err, SheetCfgError::SchemaError { .. }));
    }

    #[test]
    fn test_malformed_default() {
        let err = infer(&[["optional", "uint8", "level=300", "", ""]]).unwrap_err();
        assert!(matches!(err, SheetCfgError::MalformedLiteral { .. }));
    }

    #[test]
    fn test_fixed_float_hook() {
        let g = grid(&[
            ["optional", "float", "speed", "", ""],
            ["repeated", "float", "curve", "", ""],
        ]);
        let options = InferenceOptions {
            fixed32: Some(FixedCodec::new(10, 32).unwrap()),
            ..InferenceOptions::default()
        };
        let schema = SchemaInferencer::new(&g, options).infer().unwrap();
        let root = schema.table(schema.root().unwrap()).unwrap();
        let speed = schema.field(root.members[0]);
        assert_eq!(speed.tag, FieldTag::FixedFloat32);
        assert_eq!(speed.as_table().unwrap().type_name, "FixedFloat32");
        let curve = schema.field(root.members[1]);
        assert!(curve.is_repeated());
        let holder = schema.field(curve.as_table().unwrap().members[0]);
        assert_eq!(holder.name, FIXED_MEMORY_NAME);
        assert_eq!(holder.offset, 1);
        assert_eq!(holder.kind, FieldKind::Scalar(ScalarType::Int32));
    }
}
