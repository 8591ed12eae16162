//! # Tabular Store Interface
//!
//! The remote collaborator every operation talks to. Implementations wrap a
//! transport (or, for [`memory::MemoryStore`], an in-process grid); the core
//! only ever calls them through [`crate::retry::RetryGate`].
use crate::database::SchemaMetadata;
use crate::spreadsheet::Value;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub mod memory;

/// Errors reported by a tabular store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Rate limit or quota rejection; retried by the gate
    #[error("429 Rate Limit Exceeded: {0}")]
    RateLimited(String),

    /// The named range or table does not exist
    #[error("Unable to parse range: {0}")]
    RangeNotFound(String),

    /// The document handle is unknown to the store
    #[error("Requested document '{0}' was not found")]
    DocumentNotFound(String),

    /// The store does not offer this call
    #[error("Operation '{0}' is not supported by this store")]
    Unsupported(&'static str),

    /// Any other failure, carrying the store's own message
    #[error("{0}")]
    Remote(String),
}

/// How cell values are rendered on read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueRenderOption {
    /// Calculated and formatted according to cell formatting
    #[default]
    FormattedValue,
    /// Calculated but not formatted
    UnformattedValue,
    /// Formulas returned as-is
    Formula,
}

/// How dates and times are rendered on read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateTimeRenderOption {
    /// Strings according to cell formatting
    #[default]
    FormattedString,
    /// Serial day numbers
    SerialNumber,
}

/// How written values are interpreted by the store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    /// Parsed as if typed by a user (formulas, dates, numbers)
    #[default]
    UserEntered,
    /// Stored verbatim
    Raw,
}

/// Where appended rows go.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsertDataOption {
    /// Written over blank rows after the table
    #[default]
    Overwrite,
    /// New rows are inserted
    InsertRows,
}

/// Render options for reads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub value_render_option: ValueRenderOption,
    pub date_time_render_option: DateTimeRenderOption,
}

/// Options for appends.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AppendOptions {
    pub value_input_option: ValueInputOption,
    pub insert_data_option: InsertDataOption,
}

/// Values of one range; row 0 holds the headers when a whole table is read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

/// One rectangular write.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteRange {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

/// Summary of a batch write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteResponse {
    pub total_updated_cells: usize,
    pub total_updated_rows: usize,
}

/// Summary of an append, naming the range the rows landed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppendResponse {
    pub updated_range: String,
}

/// A remote tabular store holding named tables inside documents.
pub trait TabularStore {
    /// Reads one range.
    fn get_range(&self, document: &str, range: &str, options: &ReadOptions) -> Result<ValueRange, StoreError>;

    /// Reads several ranges in one round trip; the result is aligned with `ranges`.
    fn batch_get_ranges(&self, document: &str, ranges: &[String], options: &ReadOptions) -> Result<Vec<ValueRange>, StoreError>;

    /// Writes several ranges in one round trip.
    fn batch_write(&self, document: &str, data: &[WriteRange], input: ValueInputOption) -> Result<BatchWriteResponse, StoreError>;

    /// Appends rows after the last non-blank row of the table named by `range`.
    fn append_rows(&self, document: &str, range: &str, values: Vec<Vec<Value>>, options: &AppendOptions) -> Result<AppendResponse, StoreError>;

    /// Removes whole rows, by 1-based position, in the order given.
    fn delete_rows(&self, document: &str, table: &str, positions: &[usize]) -> Result<(), StoreError>;

    /// Column type tags per table, for stores that keep them.
    fn schema_metadata(&self, _document: &str) -> Result<SchemaMetadata, StoreError> {
        Err(StoreError::Unsupported("schema_metadata"))
    }
}

impl<T: TabularStore + ?Sized> TabularStore for &T {
    fn get_range(&self, document: &str, range: &str, options: &ReadOptions) -> Result<ValueRange, StoreError> {
        (**self).get_range(document, range, options)
    }

    fn batch_get_ranges(&self, document: &str, ranges: &[String], options: &ReadOptions) -> Result<Vec<ValueRange>, StoreError> {
        (**self).batch_get_ranges(document, ranges, options)
    }

    fn batch_write(&self, document: &str, data: &[WriteRange], input: ValueInputOption) -> Result<BatchWriteResponse, StoreError> {
        (**self).batch_write(document, data, input)
    }

    fn append_rows(&self, document: &str, range: &str, values: Vec<Vec<Value>>, options: &AppendOptions) -> Result<AppendResponse, StoreError> {
        (**self).append_rows(document, range, values, options)
    }

    fn delete_rows(&self, document: &str, table: &str, positions: &[usize]) -> Result<(), StoreError> {
        (**self).delete_rows(document, table, positions)
    }

    fn schema_metadata(&self, document: &str) -> Result<SchemaMetadata, StoreError> {
        (**self).schema_metadata(document)
    }
}
