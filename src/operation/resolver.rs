//! Join-resolver reads.
//!
//! The caller receives the filtered base rows and every extra table's rows,
//! keyed by table name, and answers with a [`JoinResolution`] describing the
//! result rows.
use crate::database::Table;
use crate::operation::filter_rows;
use crate::operation::Predicate;
use crate::spreadsheet::Record;
use crate::spreadsheet::Row;
use std::collections::HashMap;

/// What a join resolver decided.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinResolution {
    /// These rows are the result; new field names extend the headers.
    Rows(Vec<Row>),
    /// Exactly this row is the result.
    Row(Row),
    /// Every base row gains the fields of this record it does not already have.
    Extend(Record),
    /// Keep the base rows as they are (`true`) or return none (`false`).
    Keep(bool),
}

/// A join resolver.
pub type Resolver<'a> = dyn Fn(&HashMap<String, Vec<Row>>) -> anyhow::Result<JoinResolution> + 'a;

/// Filters the base table, hands all rows to `resolver` and shapes the result.
///
/// A failing resolver is logged and yields the base headers with no rows.
pub fn resolve(base: &str, mut tables: HashMap<String, Table>, filter: Option<&Predicate>, resolver: &Resolver) -> Table {
    let Table { headers, rows } = tables.remove(base).unwrap_or_default();
    let rows = filter_rows(base, filter, rows);

    let mut context: HashMap<String, Vec<Row>> = tables.into_iter().map(|(name, table)| (name, table.rows)).collect();
    context.insert(base.to_owned(), rows);

    let resolution = match resolver(&context) {
        Ok(resolution) => resolution,
        Err(error) => {
            tracing::warn!(table = base, error = %error, "join resolver failed; returning no rows");
            return Table::new(headers, Vec::new());
        }
    };
    let base_rows = context.remove(base).unwrap_or_default();

    match resolution {
        JoinResolution::Rows(rows) => {
            let headers = extend_headers(headers, rows.iter().map(Row::fields));
            Table::new(headers, rows)
        }
        JoinResolution::Row(row) => {
            let headers = extend_headers(headers, std::iter::once(row.fields()));
            Table::new(headers, vec![row])
        }
        JoinResolution::Extend(record) => {
            let rows: Vec<Row> = base_rows
                .into_iter()
                .map(|mut row| {
                    for (column, value) in &record {
                        if !row.contains(column) {
                            row.set(column.as_str(), value.clone());
                        }
                    }
                    row
                })
                .collect();
            let headers = if rows.is_empty() {
                headers
            } else {
                extend_headers(headers, std::iter::once(&record))
            };
            Table::new(headers, rows)
        }
        JoinResolution::Keep(true) => Table::new(headers, base_rows),
        JoinResolution::Keep(false) => Table::new(headers, Vec::new()),
    }
}

/// Appends field names not yet in `headers`, new names sorted for a stable order.
fn extend_headers<'r, I>(mut headers: Vec<String>, records: I) -> Vec<String>
where
    I: Iterator<Item = &'r Record>,
{
    for record in records {
        let mut names: Vec<&String> = record.keys().filter(|name| !headers.contains(name)).collect();
        names.sort();
        headers.extend(names.into_iter().cloned());
    }
    headers
}
