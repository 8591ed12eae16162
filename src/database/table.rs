use crate::spreadsheet::Row;
use crate::spreadsheet::Value;
use serde::Serialize;
use std::collections::HashSet;

/// A point-in-time materialization of one table: its header set and rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    /// Column names, unique, in sheet order
    pub headers: Vec<String>,
    /// Rows with strictly increasing positions
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Table { headers, rows }
    }

    /// The `{ headers: [], rows: [] }` result of reading a missing or blank table.
    pub fn empty() -> Self {
        Table::default()
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns the 0-based column index of a header.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|name| name == header)
    }

    /// Returns the row read from the given 1-based sheet position.
    pub fn row_at(&self, position: usize) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&position, |row| row.position())
            .ok()
            .map(|index| &self.rows[index])
    }
}

/// Builds a header set from the raw header row.
///
/// Header cells are coerced to strings. A blank header is named `column{n}` and
/// a repeated name becomes `{name}_{n}`, `n` being the 1-based sheet column, so
/// names stay unique and one-to-one with sheet columns.
pub fn header_names(raw: &[Value], date_format: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            let mut name = value.to_key_string(date_format);
            if name.is_empty() {
                name = format!("column{}", index + 1);
            }
            while seen.contains(&name) {
                tracing::warn!(header = %name, column = index + 1, "duplicate header renamed");
                name = format!("{}_{}", name, index + 1);
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Removes duplicate names while keeping the first-seen order.
pub fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers.into_iter().filter(|header| seen.insert(header.clone())).collect()
}
