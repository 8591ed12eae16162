//! # Sheet Query
//!
//! Relational-style access to spreadsheet-backed tables: read, filter, project,
//! join, update, append and delete, without a query engine or persistent index.
//!
//! ## Features
//!
//! - **Batched reads**: a query and all of its join targets are fetched in one round trip
//! - **Typed rows**: booleans and dates are recognized from text, or typed by the store's
//!   column metadata when it offers any
//! - **Lookup joins**: one-to-many equi-joins with `_1`, `_2`, ... suffixes for multiple matches
//! - **Minimal writes**: updates diff every cell against its snapshot and write changed cells
//!   as coalesced per-column ranges in a single batch
//! - **Rate-limit tolerance**: every store call is retried with capped exponential backoff
//!
//! ## Example
//!
//! ```
//! use sheet_query::MemoryStore;
//! use sheet_query::Record;
//! use sheet_query::SheetQuery;
//! use sheet_query::Value;
//!
//! let store = MemoryStore::new("doc").with_table(
//!     "Tasks",
//!     vec![
//!         vec![Value::from("Id"), Value::from("Status")],
//!         vec![Value::from(1), Value::from("Open")],
//!     ],
//! );
//! let client = SheetQuery::new(store, "doc");
//! let result = client
//!     .from("Tasks")
//!     .filter(|row| Ok(row.value("Status") == &Value::from("Open")))
//!     .update(|_| Ok(Record::from([("Status".to_owned(), Value::from("Done"))])))
//!     .unwrap();
//! assert_eq!(result.written_ranges, vec!["Tasks!B2:B2"]);
//! ```
mod client;
mod config;
mod database;
mod error;
mod operation;
mod retry;
mod spreadsheet;
mod store;

pub use client::SheetQuery;
pub use config::resolve_document_id;
pub use config::Config;
pub use config::ConfigError;
pub use database::column::ColumnError;
pub use database::column_letter;
pub use database::range::RangeError;
pub use database::ColumnHints;
pub use database::ColumnType;
pub use database::Range;
pub use database::SchemaMetadata;
pub use database::Table;
pub use database::TableRange;
pub use error::SheetQueryError;
pub use operation::coalesce::coalesce;
pub use operation::coalesce::CellChange;
pub use operation::coalesce::ColumnRun;
pub use operation::delete::DeleteResult;
pub use operation::join::JoinSpec;
pub use operation::query::QueryPipeline;
pub use operation::query::TableQuery;
pub use operation::resolver::JoinResolution;
pub use operation::update::UpdateResult;
pub use operation::Predicate;
pub use operation::Transform;
pub use retry::backoff_delay;
pub use retry::is_rate_limit_message;
pub use retry::RetryGate;
pub use spreadsheet::Record;
pub use spreadsheet::Row;
pub use spreadsheet::RowCodec;
pub use spreadsheet::RowMeta;
pub use spreadsheet::Value;
pub use spreadsheet::DEFAULT_DATE_FORMAT;
pub use store::memory::MemoryStore;
pub use store::memory::StoreCall;
pub use store::AppendOptions;
pub use store::AppendResponse;
pub use store::BatchWriteResponse;
pub use store::DateTimeRenderOption;
pub use store::InsertDataOption;
pub use store::ReadOptions;
pub use store::StoreError;
pub use store::TabularStore;
pub use store::ValueInputOption;
pub use store::ValueRange;
pub use store::ValueRenderOption;
pub use store::WriteRange;
