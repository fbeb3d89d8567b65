//! Column specification: the fixed output schema every document is converted to.
//!
//! A [`ColumnSpec`] is an ordered list of [`ColumnDescriptor`]s. Order is significant:
//! it defines the position of each value in an output [`Row`](crate::Row). The spec is
//! supplied by configuration, validated once, and then shared read-only (`Arc`) by
//! every split reader.

use crate::convert::coerce;
use crate::error::{ReaderError, ReaderResult};
use bson::Bson;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Declared target type of a column.
///
/// Deserializes from the lower-case names used in job files; common aliases
/// (`integer`, `bigint`, `varchar`, `bool`, `datetime`, ...) are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "varchar", alias = "text", alias = "char")]
    String,
    #[serde(alias = "integer", alias = "int32")]
    Int,
    #[serde(alias = "bigint", alias = "int64")]
    Long,
    #[serde(alias = "float")]
    Double,
    #[serde(alias = "decimal128", alias = "numeric")]
    Decimal,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    #[serde(alias = "datetime")]
    Timestamp,
    #[serde(alias = "object_id", alias = "oid")]
    ObjectId,
    #[serde(alias = "bytes")]
    Binary,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::ObjectId => "objectid",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Output column name; also the source field path when `path` is unset.
    pub name: String,
    /// Target type every value in this column is coerced to.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Dotted source path (`address.city`, `tags.0`), if different from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Constant text emitted for every row instead of reading the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Separator used to join an array field into a single string value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitter: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            path: None,
            value: None,
            splitter: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_splitter(mut self, splitter: impl Into<String>) -> Self {
        self.splitter = Some(splitter.into());
        self
    }

    /// Source field path resolved against each document.
    #[must_use]
    pub fn field_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// Immutable, ordered, cheaply clonable list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Arc<[ColumnDescriptor]>,
}

impl ColumnSpec {
    /// Build a spec, rejecting empty specs, blank names, duplicate names, malformed
    /// field paths, and constants that do not fit their column type.
    ///
    /// # Errors
    /// Returns a configuration error describing the first offending column.
    pub fn new(columns: Vec<ColumnDescriptor>) -> ReaderResult<Self> {
        if columns.is_empty() {
            return Err(ReaderError::configuration(
                "column spec must declare at least one column",
            ));
        }
        for (idx, col) in columns.iter().enumerate() {
            if col.name.trim().is_empty() {
                return Err(ReaderError::configuration(format!(
                    "column #{idx} has an empty name"
                )));
            }
            if columns[..idx].iter().any(|c| c.name == col.name) {
                return Err(ReaderError::configuration(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
            match &col.value {
                Some(constant) => validate_constant(col, constant)?,
                None => validate_field_path(col.field_path())?,
            }
            if col.splitter.is_some() && col.column_type != ColumnType::String {
                return Err(ReaderError::configuration(format!(
                    "column '{}' has a splitter but is typed {}; splitters need a string column",
                    col.name, col.column_type
                )));
            }
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    /// Column names in output order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl Deref for ColumnSpec {
    type Target = [ColumnDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.columns
    }
}

fn validate_constant(col: &ColumnDescriptor, constant: &str) -> ReaderResult<()> {
    coerce(&Bson::String(constant.to_string()), col).map_err(|e| {
        ReaderError::configuration(format!(
            "constant value of column '{}' ({}): {}",
            col.name, col.column_type, e.message
        ))
    })?;
    Ok(())
}

fn validate_field_path(path: &str) -> ReaderResult<()> {
    if path.starts_with('$') {
        return Err(ReaderError::configuration(format!(
            "field path '{path}' must not start with '$'"
        )));
    }
    if path.split('.').any(str::is_empty) {
        return Err(ReaderError::configuration(format!(
            "field path '{path}' contains an empty segment"
        )));
    }
    Ok(())
}
