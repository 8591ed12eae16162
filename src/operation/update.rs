//! # Update Differ
//!
//! Diffs transformed rows against the snapshot they came from and writes only
//! the changed cells, coalesced into per-column runs, in one batched call.
//!
//! Values are compared after storage normalization. A change that would write
//! an empty value over a non-empty cell is never emitted.
use crate::client::SheetQuery;
use crate::database::Table;
use crate::error::SheetQueryError;
use crate::operation::coalesce::coalesce;
use crate::operation::coalesce::CellChange;
use crate::operation::filter_rows;
use crate::operation::reader::BatchReader;
use crate::operation::transform_row;
use crate::operation::Predicate;
use crate::operation::Transform;
use crate::spreadsheet::Row;
use crate::spreadsheet::Value;
use crate::store::StoreError;
use crate::store::TabularStore;
use crate::store::WriteRange;
use serde::Serialize;

/// Outcome of an update.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateResult {
    /// Rows that passed the filter and went through the transform
    pub updated_row_count: usize,
    pub headers: Vec<String>,
    /// The transformed rows, with their positions
    pub rows: Vec<Row>,
    /// Ranges sent to the store, empty when nothing changed
    pub written_ranges: Vec<String>,
}

/// A changed value before its header is resolved to a sheet column.
#[derive(Debug)]
struct PendingChange<'h> {
    header: &'h str,
    row: usize,
    value: Value,
}

/// Where header names get their sheet column from.
#[derive(Copy, Clone, Debug)]
enum SheetColumns {
    /// A fresh whole-table read, already in sheet order
    Snapshot,
    /// The table's header row, read on demand
    HeaderRow,
}

pub struct UpdateDiffer<'a, S> {
    client: &'a SheetQuery<S>,
    table: &'a str,
}

impl<'a, S: TabularStore> UpdateDiffer<'a, S> {
    pub fn new(client: &'a SheetQuery<S>, table: &'a str) -> Self {
        UpdateDiffer { client, table }
    }

    /// Updates a freshly fetched snapshot of the table.
    pub fn run(&self, filter: Option<&Predicate>, transform: &Transform) -> Result<UpdateResult, SheetQueryError> {
        let snapshot = BatchReader::new(self.client).fetch(self.table)?;
        if snapshot.headers.is_empty() {
            tracing::debug!(table = self.table, "table has no headers; nothing to update");
            return Ok(UpdateResult::default());
        }
        self.apply(&snapshot, filter, transform, SheetColumns::Snapshot)
    }

    /// Updates a snapshot the caller already holds; rows must carry their read positions.
    ///
    /// The snapshot may be a projection or carry joined fields: its headers are
    /// matched by name against the table's header row, which is read once when
    /// there is something to write. Fields the table lacks are never written.
    pub fn run_on(&self, snapshot: &Table, filter: Option<&Predicate>, transform: &Transform) -> Result<UpdateResult, SheetQueryError> {
        self.apply(snapshot, filter, transform, SheetColumns::HeaderRow)
    }

    fn apply(&self, snapshot: &Table, filter: Option<&Predicate>, transform: &Transform, columns: SheetColumns) -> Result<UpdateResult, SheetQueryError> {
        let eligible = filter_rows(self.table, filter, snapshot.rows.clone());
        let updated: Vec<Row> = eligible
            .iter()
            .map(|row| transform_row(self.table, transform, row))
            .collect();

        let pending = self.diff(&snapshot.headers, &eligible, &updated);
        let written_ranges = if pending.is_empty() {
            Vec::new()
        } else {
            let sheet_headers = match columns {
                SheetColumns::Snapshot => snapshot.headers.clone(),
                SheetColumns::HeaderRow => self.sheet_headers()?,
            };
            let changes = self.locate(pending, &sheet_headers);
            if changes.is_empty() {
                Vec::new()
            } else {
                self.write(snapshot, &sheet_headers, changes)?
            }
        };

        Ok(UpdateResult {
            updated_row_count: updated.len(),
            headers: snapshot.headers.clone(),
            rows: updated,
            written_ranges,
        })
    }

    /// Cell changes between original and updated rows, keyed by header name and normalized for storage.
    fn diff<'h>(&self, headers: &'h [String], original: &[Row], updated: &[Row]) -> Vec<PendingChange<'h>> {
        let codec = self.client.codec();
        let mut changes = Vec::new();
        for (before, after) in original.iter().zip(updated) {
            for header in headers {
                let old = codec.normalize(before.value(header));
                let new = codec.normalize(after.value(header));
                if codec.values_equal(&old, &new) {
                    continue;
                }
                if new.is_blank() {
                    tracing::debug!(table = self.table, column = %header, position = after.position(), "not clearing non-empty cell");
                    continue;
                }
                changes.push(PendingChange {
                    header,
                    row: after.position(),
                    value: new,
                });
            }
        }
        changes
    }

    /// Resolves header names to sheet columns, dropping fields the sheet doesn't have.
    fn locate(&self, pending: Vec<PendingChange>, sheet_headers: &[String]) -> Vec<CellChange> {
        pending
            .into_iter()
            .filter_map(|change| match sheet_headers.iter().position(|name| name == change.header) {
                Some(column) => Some(CellChange {
                    column,
                    row: change.row,
                    value: change.value,
                }),
                None => {
                    tracing::debug!(table = self.table, column = change.header, "field is not a table column; not written");
                    None
                }
            })
            .collect()
    }

    /// The table's own header row, in sheet order.
    fn sheet_headers(&self) -> Result<Vec<String>, SheetQueryError> {
        let headers = BatchReader::new(self.client).header_row(self.table)?;
        if headers.is_empty() {
            return Err(SheetQueryError::MissingHeaderRow(self.table.to_owned()));
        }
        Ok(headers)
    }

    /// Coalesces changes and sends them in one batched write.
    fn write(&self, snapshot: &Table, sheet_headers: &[String], changes: Vec<CellChange>) -> Result<Vec<String>, SheetQueryError> {
        let codec = self.client.codec();
        let config = self.client.config();
        let runs = coalesce(changes, config.gap_fill_rows, |column, position| {
            let header = sheet_headers.get(column)?;
            let row = snapshot.row_at(position)?;
            row.get(header).map(|value| codec.normalize(value))
        });
        let data: Vec<WriteRange> = runs.iter().map(|run| run.to_write(self.table)).collect();
        let ranges: Vec<String> = data.iter().map(|write| write.range.clone()).collect();
        tracing::debug!(table = self.table, ranges = ?ranges, "writing changed ranges");

        let response = self
            .client
            .gate()
            .execute("batch_write", || {
                self.client
                    .store()
                    .batch_write(self.client.document_id(), &data, config.value_input_option)
            })
            .map_err(|error| match error {
                SheetQueryError::StoreError(error) => self.rejected(&ranges, error),
                other => other,
            })?;
        tracing::info!(
            table = self.table,
            ranges = ranges.len(),
            cells = response.total_updated_cells,
            "updated table"
        );
        Ok(ranges)
    }

    fn rejected(&self, ranges: &[String], error: StoreError) -> SheetQueryError {
        SheetQueryError::WriteRejected {
            table: self.table.to_owned(),
            ranges: ranges.to_vec(),
            message: error.to_string(),
        }
    }
}
