//! # Table Model Module
//!
//! Table snapshots, column type tags and A1-style range references.
pub mod column;
pub mod range;
pub mod table;

pub use column::ColumnHints;
pub use column::ColumnType;
pub use column::SchemaMetadata;
pub use range::column_letter;
pub use range::Range;
pub use range::TableRange;
pub use table::Table;
