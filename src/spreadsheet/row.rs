use crate::spreadsheet::cell::Value;
use serde::Serialize;
use std::collections::HashMap;

/// Column name to value, the shape of transform results and appended records.
pub type Record = HashMap<String, Value>;

/// Position of a row in its source table, carried beside (never inside) the row's fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowMeta {
    /// 1-based row number in the sheet; row 1 holds the headers
    pub position: usize,
    /// Number of raw cells the row had when it was read
    pub column_count: usize,
}

/// A materialized row: typed fields keyed by column name plus positional metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    fields: Record,
    meta: RowMeta,
}

impl Row {
    pub fn new(meta: RowMeta) -> Self {
        Row {
            fields: Record::new(),
            meta,
        }
    }

    pub fn with_fields(fields: Record, meta: RowMeta) -> Self {
        Row { fields, meta }
    }

    pub fn meta(&self) -> RowMeta {
        self.meta
    }

    pub fn position(&self) -> usize {
        self.meta.position
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn into_fields(self) -> Record {
        self.fields
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns the value of a column, or `Value::Empty` when the row lacks it.
    pub fn value(&self, column: &str) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.fields.get(column).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    /// Merges a partial record into this row, overwriting existing fields.
    pub fn merge(&mut self, partial: Record) {
        self.fields.extend(partial);
    }

    /// Keeps only the listed columns the row actually has; metadata is preserved.
    pub fn project(&self, columns: &[String]) -> Row {
        let fields = columns
            .iter()
            .filter_map(|column| self.fields.get(column).map(|value| (column.to_owned(), value.clone())))
            .collect();
        Row::with_fields(fields, self.meta)
    }
}
