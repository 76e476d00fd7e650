//! Static descriptions of what an entity exposes to the admin interface.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Text,
    Boolean,
    Timestamp,
    TextList,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Column {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self { name, label, kind }
    }
}

/// Everything the list query builder needs to know about a table.
///
/// Column names listed here are interpolated into SQL, so they must only
/// ever come from these static declarations, never from request input.
#[derive(Debug)]
pub struct ListSchema {
    pub table: &'static str,
    /// Select list used for pages, details and exports.
    pub select: &'static str,
    pub columns: &'static [Column],
    pub searchable: &'static [&'static str],
    pub filterable: &'static [&'static str],
    pub sortable: &'static [&'static str],
}

impl ListSchema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Email,
    Password,
    Number,
    Checkbox,
    TextArea,
    MultiSelect,
}

#[derive(Debug, Clone, Copy)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub input: InputKind,
}

impl FormField {
    pub const fn new(name: &'static str, label: &'static str, input: InputKind) -> Self {
        Self { name, label, input }
    }
}
