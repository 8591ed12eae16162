//! Batched table reads.
//!
//! All requested tables are fetched in exactly one `batch_get_ranges` round
//! trip. Optional column type tags come from one auxiliary call whose failure
//! only downgrades typing to inference.
use crate::client::SheetQuery;
use crate::database::column::ColumnHints;
use crate::database::table::dedup_headers;
use crate::database::table::header_names;
use crate::database::Range;
use crate::database::SchemaMetadata;
use crate::database::Table;
use crate::database::TableRange;
use crate::error::SheetQueryError;
use crate::spreadsheet::Value;
use crate::store::StoreError;
use crate::store::TabularStore;
use std::collections::HashMap;

/// Fetches and materializes whole tables.
pub struct BatchReader<'a, S> {
    client: &'a SheetQuery<S>,
}

impl<'a, S: TabularStore> BatchReader<'a, S> {
    pub fn new(client: &'a SheetQuery<S>) -> Self {
        BatchReader { client }
    }

    /// Fetches one table.
    pub fn fetch(&self, table: &str) -> Result<Table, SheetQueryError> {
        let mut tables = self.fetch_many(&[table.to_owned()])?;
        Ok(tables.remove(table).unwrap_or_default())
    }

    /// Fetches several tables in one round trip. Every requested name is a key
    /// of the result; missing or blank tables map to an empty snapshot.
    pub fn fetch_many(&self, tables: &[String]) -> Result<HashMap<String, Table>, SheetQueryError> {
        let names = dedup_headers(tables.to_vec());
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let ranges: Vec<String> = names.iter().map(|name| TableRange::whole(name).to_string()).collect();
        let options = self.client.config().read_options();
        tracing::debug!(tables = ?names, "batch fetching tables");

        let fetched = self.client.gate().execute("batch_get_ranges", || {
            self.client
                .store()
                .batch_get_ranges(self.client.document_id(), &ranges, &options)
        });
        let value_ranges = match fetched {
            Ok(value_ranges) => value_ranges,
            Err(SheetQueryError::StoreError(StoreError::RangeNotFound(range))) => {
                let missing = TableRange::try_from(range.as_str()).map_or(range, |target| target.table);
                tracing::warn!(tables = ?names, %missing, "table not found; reading every requested table as empty");
                return Ok(names.into_iter().map(|name| (name, Table::empty())).collect());
            }
            Err(error) => return Err(error),
        };

        let schema = self.schema_metadata();
        let mut value_ranges = value_ranges.into_iter();
        let result = names
            .into_iter()
            .map(|name| {
                let values = value_ranges.next().map(|range| range.values).unwrap_or_default();
                let hints = schema.as_ref().and_then(|schema| schema.get(&name));
                let table = self.materialize(values, hints);
                (name, table)
            })
            .collect();
        Ok(result)
    }

    /// Reads only the header row (`T!1:1`); empty when the table is missing or blank.
    pub fn header_row(&self, table: &str) -> Result<Vec<String>, SheetQueryError> {
        let range = TableRange::new(table, Range::header_row()).to_string();
        let options = self.client.config().read_options();
        let response = self
            .client
            .gate()
            .execute("get_range", || self.client.store().get_range(self.client.document_id(), &range, &options))?;
        Ok(match response.values.first() {
            Some(header_row) if !header_row.is_empty() => header_names(header_row, self.client.codec().date_format()),
            _ => Vec::new(),
        })
    }

    /// Column type tags, when enabled and the store offers them.
    fn schema_metadata(&self) -> Option<SchemaMetadata> {
        if !self.client.config().schema_metadata {
            return None;
        }
        let fetched = self.client.gate().execute("schema_metadata", || {
            self.client.store().schema_metadata(self.client.document_id())
        });
        match fetched {
            Ok(schema) => Some(schema),
            Err(SheetQueryError::StoreError(StoreError::Unsupported(_))) => None,
            Err(error) => {
                tracing::warn!(%error, "column type metadata unavailable; inferring types");
                None
            }
        }
    }

    /// Turns raw values (row 0 = headers) into a snapshot.
    pub(crate) fn materialize(&self, values: Vec<Vec<Value>>, hints: Option<&ColumnHints>) -> Table {
        let Some((header_row, data)) = values.split_first() else {
            return Table::empty();
        };
        let codec = self.client.codec();
        let headers = header_names(header_row, codec.date_format());
        let rows = codec.decode_rows(data, &headers, hints);
        Table::new(headers, rows)
    }
}
