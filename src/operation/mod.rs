//! # Table Operations Module
//!
//! Read, join, update, delete and append over materialized table snapshots.
//!
//! Caller callbacks (filters, transforms, resolvers) return `anyhow::Result`.
//! A failing callback never aborts an operation: the failure is logged and the
//! row degrades to a safe default (excluded by a filter, left unmodified by a
//! transform).
use crate::spreadsheet::Record;
use crate::spreadsheet::Row;

pub mod append;
pub mod coalesce;
pub mod delete;
pub mod join;
pub mod query;
pub mod reader;
pub mod resolver;
pub mod update;

/// A row filter.
pub type Predicate<'a> = dyn Fn(&Row) -> anyhow::Result<bool> + 'a;

/// A row transform returning the fields to merge into the row.
pub type Transform<'a> = dyn Fn(&Row) -> anyhow::Result<Record> + 'a;

/// Evaluates an optional filter; a failing filter excludes the row.
pub(crate) fn keep_row(table: &str, filter: Option<&Predicate>, row: &Row) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    match filter(row) {
        Ok(keep) => keep,
        Err(error) => {
            tracing::warn!(table, position = row.position(), error = %error, "filter failed; row excluded");
            false
        }
    }
}

/// Applies a filter to a row sequence.
pub(crate) fn filter_rows(table: &str, filter: Option<&Predicate>, rows: Vec<Row>) -> Vec<Row> {
    match filter {
        None => rows,
        Some(_) => rows.into_iter().filter(|row| keep_row(table, filter, row)).collect(),
    }
}

/// Applies a transform to a copy of the row; a failing transform leaves the copy unmodified.
pub(crate) fn transform_row(table: &str, transform: &Transform, row: &Row) -> Row {
    let mut updated = row.clone();
    match transform(row) {
        Ok(fields) => updated.merge(fields),
        Err(error) => {
            tracing::warn!(table, position = row.position(), error = %error, "transform failed; row left unmodified");
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use crate::operation::*;
    use crate::spreadsheet::RowMeta;
    use crate::spreadsheet::Value;

    fn row(position: usize, status: &str) -> Row {
        let mut row = Row::new(RowMeta {
            position,
            column_count: 1,
        });
        row.set("Status", status);
        row
    }

    #[test]
    fn failing_filter_excludes_row() {
        let filter = |row: &Row| -> anyhow::Result<bool> {
            match row.value("Status").as_str() {
                Some("boom") => anyhow::bail!("cannot decide"),
                other => Ok(other == Some("Open")),
            }
        };
        let rows = vec![row(2, "Open"), row(3, "boom"), row(4, "Done")];
        let kept = filter_rows("Tasks", Some(&filter), rows);
        assert_eq!(kept.iter().map(Row::position).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn no_filter_keeps_everything() {
        let rows = vec![row(2, "Open"), row(3, "Done")];
        assert_eq!(filter_rows("Tasks", None, rows).len(), 2);
    }

    #[test]
    fn failing_transform_leaves_row() {
        let transform = |_: &Row| -> anyhow::Result<Record> { anyhow::bail!("nope") };
        let original = row(2, "Open");
        assert_eq!(transform_row("Tasks", &transform, &original), original);

        let transform = |_: &Row| -> anyhow::Result<Record> { Ok(Record::from([("Status".to_owned(), Value::from("Done"))])) };
        let updated = transform_row("Tasks", &transform, &original);
        assert_eq!(updated.value("Status"), &Value::from("Done"));
        assert_eq!(original.value("Status"), &Value::from("Open"));
    }
}
