use serde::{Deserialize, Serialize};

use crate::types::{PageId, value::DataType};

/// Row id aliases usable in WHERE clauses and projections.
pub const ROW_ID_NAMES: [&str; 3] = ["rowid", "_rowid_", "oid"];

pub fn is_row_id_name(name: &str) -> bool {
    ROW_ID_NAMES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(name))
}

/// Represents a column definition in a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct ColumnSchema {
    pub name: String,
    /// Declared type name as written in CREATE TABLE.
    pub declared_type: String,
    pub data_type: DataType,
    pub position: usize,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, position: usize) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            data_type: DataType::from_declared(&declared_type),
            declared_type,
            position,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// An `INTEGER PRIMARY KEY` column stores the row id itself.
    pub fn is_row_id_alias(&self) -> bool {
        self.primary_key && self.declared_type.eq_ignore_ascii_case("INTEGER")
    }
}

/// Catalog entry for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    /// Root of the table's B-tree; fixed for the table's lifetime.
    pub root_page_id: PageId,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSchema>, root_page_id: PageId) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            root_page_id,
        }
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Position of the `INTEGER PRIMARY KEY` column, if the table has one.
    pub fn row_id_alias(&self) -> Option<usize> {
        self.columns.iter().position(ColumnSchema::is_row_id_alias)
    }

    /// Whether `name` addresses the row id, by alias column or built-in name.
    pub fn is_row_id_column(&self, name: &str) -> bool {
        match self.get_column_index(name) {
            Some(index) => self.columns[index].is_row_id_alias(),
            None => is_row_id_name(name),
        }
    }
}
