//! Lookup joins.
//!
//! Target rows are indexed by the string form of their match column. Each base
//! row then receives the copied fields of every matching target row, suffixed
//! `_1`, `_2`, ... when there is more than one match. The target match column
//! keeps its name even then.
use crate::database::Table;
use crate::spreadsheet::Row;
use crate::spreadsheet::RowCodec;
use std::collections::HashMap;

/// One-to-many equi-join of a base table against `table`.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinSpec {
    /// Table the joined fields come from
    pub table: String,
    /// Match column in the joined table
    pub target_column: String,
    /// Match column in the base rows
    pub source_column: String,
    /// Columns to copy; all but the target match column when `None`
    pub columns: Option<Vec<String>>,
}

impl JoinSpec {
    pub fn new(table: &str, target_column: &str, source_column: &str) -> Self {
        JoinSpec {
            table: table.to_owned(),
            target_column: target_column.to_owned(),
            source_column: source_column.to_owned(),
            columns: None,
        }
    }

    pub fn with_columns<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if `column` is one of this join's match columns.
    pub fn references(&self, column: &str) -> bool {
        self.source_column == column || self.target_column == column
    }
}

/// Joins `rows` against `target`, returning the rows and the column names the join wrote.
///
/// The join is skipped when the target has no rows or lacks the match column.
/// Copied fields overwrite same-named fields of the base row.
pub fn apply_join(rows: Vec<Row>, join: &JoinSpec, target: Option<&Table>, codec: &RowCodec) -> (Vec<Row>, Vec<String>) {
    let Some(target) = target.filter(|target| !target.is_empty()) else {
        tracing::debug!(table = %join.table, "join target is empty; join skipped");
        return (rows, Vec::new());
    };
    if target.column_index(&join.target_column).is_none() {
        tracing::warn!(table = %join.table, column = %join.target_column, "join column missing; join skipped");
        return (rows, Vec::new());
    }

    let mut lookup: HashMap<String, Vec<&Row>> = HashMap::new();
    for row in &target.rows {
        lookup
            .entry(codec.key_string(row.value(&join.target_column)))
            .or_default()
            .push(row);
    }

    let columns: Vec<String> = match &join.columns {
        Some(columns) => columns.clone(),
        None => target
            .headers
            .iter()
            .filter(|header| **header != join.target_column)
            .cloned()
            .collect(),
    };

    let mut written = Vec::new();
    let rows = rows
        .into_iter()
        .map(|mut row| {
            let key = codec.key_string(row.value(&join.source_column));
            let matches = lookup.get(&key).map(Vec::as_slice).unwrap_or_default();
            for (index, matched) in matches.iter().enumerate() {
                for column in &columns {
                    let Some(value) = matched.get(column) else {
                        continue;
                    };
                    let name = if matches.len() > 1 && *column != join.target_column {
                        format!("{}_{}", column, index + 1)
                    } else {
                        column.to_owned()
                    };
                    if !written.contains(&name) {
                        written.push(name.clone());
                    }
                    row.set(name, value.clone());
                }
            }
            row
        })
        .collect();
    (rows, written)
}

#[cfg(test)]
mod tests {
    use crate::operation::join::*;
    use crate::spreadsheet::RowMeta;
    use crate::spreadsheet::Value;

    fn table(headers: &[&str], rows: &[&[Value]]) -> Table {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let codec = RowCodec::default();
        let raw: Vec<Vec<Value>> = rows.iter().map(|row| row.to_vec()).collect();
        let rows = codec.decode_rows(&raw, &headers, None);
        Table::new(headers, rows)
    }

    fn order(customer: &str) -> Row {
        let mut row = Row::new(RowMeta {
            position: 2,
            column_count: 1,
        });
        row.set("Customer", customer);
        row
    }

    fn addresses() -> Table {
        table(
            &["CustomerId", "City"],
            &[
                &[Value::from(1), Value::from("Oslo")],
                &[Value::from(2), Value::from("Bergen")],
                &[Value::from(2), Value::from("Tromsø")],
            ],
        )
    }

    #[test]
    fn join_cardinality() {
        let join = JoinSpec::new("Addresses", "CustomerId", "Customer");
        let target = addresses();
        let rows = vec![order("0"), order("1"), order("2")];
        let (rows, written) = apply_join(rows, &join, Some(&target), &RowCodec::default());

        assert_eq!(rows[0].fields().len(), 1);
        assert_eq!(rows[1].value("City"), &Value::from("Oslo"));
        assert!(!rows[1].contains("CustomerId"));
        assert_eq!(rows[2].value("City_1"), &Value::from("Bergen"));
        assert_eq!(rows[2].value("City_2"), &Value::from("Tromsø"));
        assert!(!rows[2].contains("City"));
        assert_eq!(written, vec!["City", "City_1", "City_2"]);
    }

    #[test]
    fn match_column_is_never_suffixed() {
        let join = JoinSpec::new("Addresses", "CustomerId", "Customer").with_columns(["CustomerId", "City"]);
        let target = addresses();
        let (rows, _) = apply_join(vec![order("2")], &join, Some(&target), &RowCodec::default());
        assert_eq!(rows[0].value("CustomerId"), &Value::from(2));
        assert!(!rows[0].contains("CustomerId_1"));
        assert!(rows[0].contains("City_2"));
    }

    #[test]
    fn skipped_joins() {
        let codec = RowCodec::default();
        let join = JoinSpec::new("Addresses", "Missing", "Customer");
        let (rows, written) = apply_join(vec![order("1")], &join, Some(&addresses()), &codec);
        assert_eq!(rows[0].fields().len(), 1);
        assert!(written.is_empty());

        let join = JoinSpec::new("Addresses", "CustomerId", "Customer");
        let (rows, _) = apply_join(vec![order("1")], &join, None, &codec);
        assert_eq!(rows[0].fields().len(), 1);
        assert!(join.references("Customer") && join.references("CustomerId") && !join.references("City"));
    }
}
