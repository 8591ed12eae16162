use crate::client::SheetQuery;
use crate::database::range::RangeError;
use crate::database::Table;
use crate::database::TableRange;
use crate::error::SheetQueryError;
use crate::operation::reader::BatchReader;
use crate::spreadsheet::Record;
use crate::spreadsheet::Row;
use crate::spreadsheet::RowMeta;
use crate::store::AppendOptions;
use crate::store::TabularStore;

/// Appends records after the last row of a table.
pub struct Appender<'a, S> {
    client: &'a SheetQuery<S>,
    table: &'a str,
}

impl<'a, S: TabularStore> Appender<'a, S> {
    pub fn new(client: &'a SheetQuery<S>, table: &'a str) -> Self {
        Appender { client, table }
    }

    /// Encodes `records` in header order and appends them in one call.
    ///
    /// Returns the appended rows with the positions the store reported. Fails
    /// with [`SheetQueryError::MissingHeaderRow`] if the table has no header row.
    pub fn run(&self, records: &[Record]) -> Result<Table, SheetQueryError> {
        if records.is_empty() {
            return Ok(Table::empty());
        }
        let headers = self.headers()?;
        let codec = self.client.codec();
        let values: Vec<_> = records.iter().map(|record| codec.encode(record, &headers)).collect();
        let range = TableRange::whole(self.table).to_string();
        let options = AppendOptions {
            value_input_option: self.client.config().value_input_option,
            ..AppendOptions::default()
        };

        let response = self
            .client
            .gate()
            .execute("append_rows", || {
                self.client
                    .store()
                    .append_rows(self.client.document_id(), &range, values.clone(), &options)
            })
            .map_err(|error| match error {
                SheetQueryError::StoreError(error) => SheetQueryError::WriteRejected {
                    table: self.table.to_owned(),
                    ranges: vec![range.clone()],
                    message: error.to_string(),
                },
                other => other,
            })?;

        let (first_row, reported_rows) = appended_span(&response.updated_range)?;
        if reported_rows != values.len() {
            tracing::warn!(
                table = self.table,
                expected = values.len(),
                reported = reported_rows,
                "appended row count differs from store report"
            );
        }
        tracing::info!(table = self.table, rows = values.len(), first_row, "appended rows");

        let rows = values
            .into_iter()
            .enumerate()
            .map(|(offset, cells)| {
                let meta = RowMeta {
                    position: first_row + offset,
                    column_count: headers.len(),
                };
                let fields = headers.iter().cloned().zip(cells).collect();
                Row::with_fields(fields, meta)
            })
            .collect();
        Ok(Table::new(headers, rows))
    }

    fn headers(&self) -> Result<Vec<String>, SheetQueryError> {
        let headers = BatchReader::new(self.client).header_row(self.table)?;
        if headers.is_empty() {
            return Err(SheetQueryError::MissingHeaderRow(self.table.to_owned()));
        }
        Ok(headers)
    }
}

/// First row (1-based) and row count of an append's reported range, e.g. `Sheet!A5:C7` -> (5, 3).
fn appended_span(updated_range: &str) -> Result<(usize, usize), SheetQueryError> {
    let invalid = || RangeError::UpdatedRangeError(updated_range.to_owned());
    let range = TableRange::try_from(updated_range).map_err(|_| invalid())?.range;
    let first_row = range.first_row().ok_or_else(invalid)?;
    let last_row = range.last_row().ok_or_else(invalid)?;
    let rows = (last_row + 1).checked_sub(first_row).ok_or_else(invalid)?;
    Ok((first_row, rows))
}
