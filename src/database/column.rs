use crate::error::SheetQueryError;
use std::collections::HashMap;
use thiserror::Error;

/// Errors related to column type parsing.
#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("Invalid column type '{0}'")]
    TypeError(String),
}

/// Authoritative column data types reported by the store's table metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// Numbers, percentages and currencies
    Number,
    /// Date without time component
    Date,
    /// Date and time
    DateTime,
    /// Plain text, never converted
    Text,
}

/// Column name to type tag, for one table.
pub type ColumnHints = HashMap<String, ColumnType>;

/// Table name to its column hints.
pub type SchemaMetadata = HashMap<String, ColumnHints>;

impl ColumnType {
    /// Returns the store's tag for this column type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Number => "NUMBER",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATE_TIME",
            ColumnType::Text => "TEXT",
        }
    }

    /// Parses a column type from a store tag.
    /// Supports various aliases for each type.
    pub fn parse(name: &str) -> Result<Self, SheetQueryError> {
        match name.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Ok(Self::Boolean),
            "NUMBER" | "PERCENT" | "CURRENCY" => Ok(Self::Number),
            "DATE" => Ok(Self::Date),
            "DATE_TIME" | "DATETIME" | "TIMESTAMP" => Ok(Self::DateTime),
            "TEXT" | "STRING" | "VARCHAR" => Ok(Self::Text),
            _ => Err(ColumnError::TypeError(name.to_string()))?,
        }
    }

    /// Returns true if this column type holds date/time values.
    #[inline]
    pub fn is_datetime(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateTime)
    }
}

/// Builds column hints from raw (column, tag) pairs, skipping tags that don't parse.
pub fn parse_column_hints<'a, I>(table: &str, tags: I) -> ColumnHints
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hints = ColumnHints::new();
    for (column, tag) in tags {
        match ColumnType::parse(tag) {
            Ok(kind) => {
                hints.insert(column.to_owned(), kind);
            }
            Err(error) => {
                tracing::warn!(table, column, %error, "ignoring column type hint");
            }
        }
    }
    hints
}
