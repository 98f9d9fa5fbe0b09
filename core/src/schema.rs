//! Schema model inferred from a sheet's header rows
//!
//! Every field of a sheet lives in one arena owned by [`Schema`] and is
//! addressed by [`FieldId`]. Tables list their members by id and arrays point
//! at the concrete table parsed for each slot, so the tree never needs
//! back-references.
//!
//! Two tables sharing a type name describe the same record. The first one
//! registered becomes the canonical layout for that name; encoders and schema
//! emitters always take member order from the canonical layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SheetCfgError};
use crate::literal::column_label;
use crate::types::{FieldAccess, FieldRule, FieldTag, ScalarType};

/// Name of the single member of a fixed-point wrapper record
pub const FIXED_MEMORY_NAME: &str = "memory";

/// Suffix of the synthesized root record wrapping all rows
pub const ROOT_ARRAY_SUFFIX: &str = "_ARRAY";

/// Index of a field in its schema's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub usize);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A field reading its value from a registered enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumField {
    pub enum_name: String,
}

/// A nested record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    /// Emitted record name
    pub type_name: String,
    /// Declared member count, zero for the root table
    pub member_count: usize,
    pub members: Vec<FieldId>,
}

/// A fixed-size repeated group of identically shaped tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayField {
    /// Declared element count
    pub count: usize,
    /// First parsed element, which defines the element shape
    pub element: FieldId,
    /// Every parsed element, in column order
    pub elements: Vec<FieldId>,
}

/// What a field holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar(ScalarType),
    Enum(EnumField),
    Table(TableField),
    Array(ArrayField),
}

impl FieldKind {
    /// Short description used in logs and error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Scalar(t) => t.to_string(),
            Self::Enum(e) => format!("enum.{}", e.enum_name),
            Self::Table(t) => format!("table {}", t.type_name),
            Self::Array(a) => format!("array[{}]", a.count),
        }
    }
}

/// One logical column group of a sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub rule: FieldRule,
    /// Column holding the field's value, or its declaration column
    pub offset: usize,
    /// Number of columns occupied by the field and its descendants
    pub size: usize,
    pub access: FieldAccess,
    pub description: String,
    /// Default literal in schema-text form
    pub default: String,
    pub tag: FieldTag,
    pub kind: FieldKind,
}

impl Field {
    /// A one-column scalar field with empty metadata
    #[must_use]
    pub fn scalar(name: impl Into<String>, scalar: ScalarType, offset: usize) -> Self {
        Self {
            name: name.into(),
            rule: FieldRule::Optional,
            offset,
            size: 1,
            access: FieldAccess::Default,
            description: String::new(),
            default: String::new(),
            tag: FieldTag::None,
            kind: FieldKind::Scalar(scalar),
        }
    }

    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.rule == FieldRule::Repeated
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&TableField> {
        match &self.kind {
            FieldKind::Table(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayField> {
        match &self.kind {
            FieldKind::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this is the sort key of its record
    #[must_use]
    pub fn is_id(&self) -> bool {
        self.name.eq_ignore_ascii_case("id")
    }

    /// Spreadsheet column label of the field's offset
    #[must_use]
    pub fn column(&self) -> String {
        column_label(self.offset)
    }
}

/// All fields of one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    sheet_name: String,
    fields: Vec<Field>,
    root: Option<FieldId>,
    layouts: IndexMap<String, FieldId>,
}

impl Schema {
    #[must_use]
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            fields: Vec::new(),
            root: None,
            layouts: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Add a field to the arena
    pub fn push(&mut self, field: Field) -> FieldId {
        self.fields.push(field);
        FieldId(self.fields.len() - 1)
    }

    /// Look up a field; ids always come from this schema's `push`
    #[must_use]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields.iter().enumerate().map(|(n, f)| (FieldId(n), f))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set_root(&mut self, id: FieldId) {
        self.root = Some(id);
    }

    /// Root table id; fails on a schema still under construction
    pub fn root(&self) -> Result<FieldId> {
        self.root
            .ok_or_else(|| SheetCfgError::schema(format!("sheet {} has no root table", self.sheet_name)))
    }

    /// Record name of a sheet row
    pub fn root_type_name(&self) -> Result<&str> {
        let root = self.root()?;
        self.table(root).map(|t| t.type_name.as_str())
    }

    /// Record name of the synthesized container of all rows
    pub fn root_array_name(&self) -> Result<String> {
        Ok(format!("{}{ROOT_ARRAY_SUFFIX}", self.root_type_name()?))
    }

    /// Table payload of a field
    pub fn table(&self, id: FieldId) -> Result<&TableField> {
        let field = self.field(id);
        field.as_table().ok_or_else(|| {
            SheetCfgError::schema(format!("field '{}' is {}, not a table", field.name, field.kind.describe()))
        })
    }

    /// Record name behind a table or array field
    #[must_use]
    pub fn record_type_name(&self, id: FieldId) -> Option<&str> {
        match &self.field(id).kind {
            FieldKind::Table(t) => Some(&t.type_name),
            FieldKind::Array(a) => self.record_type_name(a.element),
            _ => None,
        }
    }

    /// Register `table` as a layout for its type name
    ///
    /// The first table registered under a name becomes canonical. Later tables
    /// must carry the same set of members, compared by name.
    pub fn register_layout(&mut self, table: FieldId) -> Result<()> {
        let type_name = self.table(table)?.type_name.clone();
        match self.layouts.get(&type_name) {
            Some(&canonical) if canonical != table => self.compare_by_name(canonical, table),
            Some(_) => Ok(()),
            None => {
                self.layouts.insert(type_name, table);
                Ok(())
            }
        }
    }

    /// Canonical table for a type name
    #[must_use]
    pub fn layout(&self, type_name: &str) -> Option<FieldId> {
        self.layouts.get(type_name).copied()
    }

    /// Canonical layouts in registration order
    pub fn layouts(&self) -> impl Iterator<Item = (&str, FieldId)> {
        self.layouts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Canonical table for the record behind `id`, falling back to `id` itself
    #[must_use]
    pub fn canonical(&self, id: FieldId) -> FieldId {
        self.record_type_name(id)
            .and_then(|name| self.layout(name))
            .unwrap_or(id)
    }

    /// Root member named `id`, if any
    #[must_use]
    pub fn id_field(&self) -> Option<FieldId> {
        let root = self.root.and_then(|r| self.field(r).as_table())?;
        root.members.iter().copied().find(|&m| self.field(m).is_id())
    }

    /// Compare two fields the way array elements must match: name, access,
    /// kind, size, and rule when either side repeats
    fn field_difference(&self, a: FieldId, b: FieldId) -> Option<String> {
        let (fa, fb) = (self.field(a), self.field(b));
        if fa.name != fb.name {
            return Some(format!("member '{}' differs from '{}'", fb.name, fa.name));
        }
        if fa.access != fb.access {
            return Some(format!(
                "member '{}' has {} access but expected {}",
                fb.name, fb.access, fa.access
            ));
        }
        let same_kind = match (&fa.kind, &fb.kind) {
            (FieldKind::Scalar(x), FieldKind::Scalar(y)) => x == y,
            (FieldKind::Enum(x), FieldKind::Enum(y)) => x.enum_name == y.enum_name,
            (FieldKind::Table(x), FieldKind::Table(y)) => x.type_name == y.type_name,
            (FieldKind::Array(x), FieldKind::Array(y)) => {
                x.count == y.count && self.record_type_name(x.element) == self.record_type_name(y.element)
            }
            _ => false,
        };
        if !same_kind || fa.tag != fb.tag {
            return Some(format!(
                "member '{}' is {} but expected {}",
                fb.name,
                fb.kind.describe(),
                fa.kind.describe()
            ));
        }
        if fa.size != fb.size {
            return Some(format!(
                "member '{}' spans {} columns but expected {}",
                fb.name, fb.size, fa.size
            ));
        }
        if (fa.is_repeated() || fb.is_repeated()) && fa.rule != fb.rule {
            return Some(format!(
                "member '{}' is {} but expected {}",
                fb.name,
                fb.rule.as_str(),
                fa.rule.as_str()
            ));
        }
        None
    }

    /// Require `other` to match `first` member by member, in order
    pub fn compare_positional(&self, first: FieldId, other: FieldId) -> Result<()> {
        let (ta, tb) = (self.table(first)?, self.table(other)?);
        let mismatch = |message: String| SheetCfgError::shape_mismatch(&ta.type_name, message);
        if ta.type_name != tb.type_name {
            return Err(mismatch(format!("element type '{}' differs", tb.type_name)));
        }
        if ta.members.len() != tb.members.len() {
            return Err(mismatch(format!(
                "element at column {} has {} members, expected {}",
                self.field(other).column(),
                tb.members.len(),
                ta.members.len()
            )));
        }
        for (&a, &b) in ta.members.iter().zip(&tb.members) {
            if let Some(diff) = self.field_difference(a, b) {
                return Err(mismatch(format!("{diff} at column {}", self.field(b).column())));
            }
        }
        Ok(())
    }

    /// Require `other` to carry the same members as `canonical`, in any order
    pub fn compare_by_name(&self, canonical: FieldId, other: FieldId) -> Result<()> {
        let (ta, tb) = (self.table(canonical)?, self.table(other)?);
        let mismatch = |message: String| SheetCfgError::shape_mismatch(&ta.type_name, message);
        if ta.members.len() != tb.members.len() {
            return Err(mismatch(format!(
                "table at column {} has {} members, expected {}",
                self.field(other).column(),
                tb.members.len(),
                ta.members.len()
            )));
        }
        for &b in &tb.members {
            let name = &self.field(b).name;
            let Some(&a) = ta.members.iter().find(|&&a| &self.field(a).name == name) else {
                return Err(mismatch(format!(
                    "unexpected member '{name}' at column {}",
                    self.field(b).column()
                )));
            };
            if let Some(diff) = self.field_difference(a, b) {
                return Err(mismatch(diff));
            }
        }
        Ok(())
    }

    /// Whether a field survives the access filter
    ///
    /// Tables and arrays with no exported members are dropped as a whole.
    #[must_use]
    pub fn is_exported(&self, id: FieldId, filter: FieldAccess) -> bool {
        let field = self.field(id);
        if !field.access.is_visible_to(filter) {
            return false;
        }
        if field.tag != FieldTag::None {
            return true;
        }
        match &field.kind {
            FieldKind::Table(_) => !self.exported_members(self.canonical(id), filter).is_empty(),
            FieldKind::Array(a) => self.is_exported(a.element, filter),
            _ => true,
        }
    }

    /// Exported members of a table, in that table's own order
    #[must_use]
    pub fn exported_members(&self, table: FieldId, filter: FieldAccess) -> Vec<FieldId> {
        self.field(table)
            .as_table()
            .map(|t| {
                t.members
                    .iter()
                    .copied()
                    .filter(|&m| self.is_exported(m, filter))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Field slot of a member within the canonical layout of its record
    #[must_use]
    pub fn slot_of(&self, type_name: &str, member_name: &str, filter: FieldAccess) -> Option<usize> {
        let canonical = self.layout(type_name)?;
        self.exported_members(canonical, filter)
            .iter()
            .position(|&m| self.field(m).name == member_name)
    }
}
