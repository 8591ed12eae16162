//! # Row Materialization Module
//!
//! Typed cell values, rows with positional metadata, and the codec that maps
//! raw positional rows to keyed rows and back.
pub mod cell;
pub mod codec;
pub mod row;

pub use cell::Value;
pub use cell::DEFAULT_DATE_FORMAT;
pub use codec::RowCodec;
pub use row::Record;
pub use row::Row;
pub use row::RowMeta;
