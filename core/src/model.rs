//! Table, column and row types read from a SQLite catalog.
//!
//! These types carry exactly what the catalog reports and nothing more.
//! They are produced by the introspector and consumed by the triple and
//! descriptor builders; no builder ever goes back to the database.

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A table discovered in the database catalog.
///
/// # Examples
///
/// ```
/// use dbcroissant_core::{Column, Table};
///
/// let table = Table::new("var")
///     .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
///     .with_column(Column::new(1, "name", "TEXT"));
/// assert_eq!(table.columns.len(), 2);
/// assert!(table.column("id").unwrap().primary_key);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, unique within its database.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Column metadata as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Zero-based ordinal position.
    pub position: usize,
    /// Column name.
    pub name: String,
    /// Declared SQL type, verbatim (may be empty).
    pub declared_type: String,
    /// Whether the column is declared `NOT NULL`.
    pub not_null: bool,
    /// Default value expression text; `None` when no default was declared.
    pub default_value: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Creates a nullable, non-key column without a default.
    pub fn new(position: usize, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            declared_type: declared_type.into(),
            not_null: false,
            default_value: None,
            primary_key: false,
        }
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the default value expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Semantic type derived from the declared type.
    pub fn data_type(&self) -> DataType {
        DataType::from_sql(&self.declared_type)
    }
}

/// A single SQLite value, tagged by storage class.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

/// One table row, positionally aligned with the table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based sequence number within the scan.
    pub number: usize,
    /// Values in column order.
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a row.
    pub fn new(number: usize, values: Vec<Value>) -> Self {
        Self { number, values }
    }
}
