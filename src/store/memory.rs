//! An in-process [`TabularStore`] over plain grids.
//!
//! Reads behave like the remote API: trailing blank cells and rows are trimmed
//! and unknown tables read as blank. Every call is recorded so callers can
//! check round-trip counts, and failures can be queued with [`MemoryStore::fail_next`].
use crate::database::column::parse_column_hints;
use crate::database::column_letter;
use crate::database::range::quote_table_name;
use crate::database::Range;
use crate::database::SchemaMetadata;
use crate::database::TableRange;
use crate::spreadsheet::Value;
use crate::store::AppendOptions;
use crate::store::AppendResponse;
use crate::store::BatchWriteResponse;
use crate::store::ReadOptions;
use crate::store::StoreError;
use crate::store::TabularStore;
use crate::store::ValueInputOption;
use crate::store::ValueRange;
use crate::store::WriteRange;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;

type Grid = Vec<Vec<Value>>;

/// One call received by a [`MemoryStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    GetRange { range: String },
    BatchGetRanges { ranges: Vec<String> },
    BatchWrite { ranges: Vec<String> },
    AppendRows { range: String, rows: usize },
    DeleteRows { table: String, positions: Vec<usize> },
    SchemaMetadata,
}

impl StoreCall {
    /// Returns true for calls that change the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreCall::BatchWrite { .. } | StoreCall::AppendRows { .. } | StoreCall::DeleteRows { .. }
        )
    }
}

/// A single-document store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: String,
    tables: RefCell<HashMap<String, Grid>>,
    schema: Option<Result<SchemaMetadata, StoreError>>,
    calls: RefCell<Vec<StoreCall>>,
    failures: RefCell<VecDeque<StoreError>>,
    write_failure: RefCell<Option<StoreError>>,
}

/// Cell bounds of a range against a grid: 0-based, inclusive, `None` meaning "to the end".
struct Window {
    first_row: usize,
    last_row: Option<usize>,
    first_col: usize,
    last_col: Option<usize>,
}

impl From<&Range> for Window {
    fn from(range: &Range) -> Self {
        let single = range.row_upper_bound.is_none() && range.col_upper_bound.is_none();
        Window {
            first_row: range.row_lower_bound.unwrap_or(0),
            last_row: range.row_upper_bound.or(if single { range.row_lower_bound } else { None }),
            first_col: range.col_lower_bound.unwrap_or(0),
            last_col: range.col_upper_bound.or(if single { range.col_lower_bound } else { None }),
        }
    }
}

impl MemoryStore {
    pub fn new(document: &str) -> Self {
        MemoryStore {
            document: document.to_owned(),
            ..Default::default()
        }
    }

    /// Adds a table; row 0 of `rows` is its header row.
    pub fn with_table(self, name: &str, rows: Vec<Vec<Value>>) -> Self {
        self.tables.borrow_mut().insert(name.to_owned(), rows);
        self
    }

    /// Makes `schema_metadata` answer with these column type tags.
    pub fn with_schema(mut self, schema: SchemaMetadata) -> Self {
        self.schema = Some(Ok(schema));
        self
    }

    /// Declares column type tags for one table, spelled as the store reports them.
    pub fn with_column_types(mut self, table: &str, tags: &[(&str, &str)]) -> Self {
        let mut schema = match self.schema.take() {
            Some(Ok(schema)) => schema,
            _ => SchemaMetadata::new(),
        };
        schema.insert(table.to_owned(), parse_column_hints(table, tags.iter().copied()));
        self.schema = Some(Ok(schema));
        self
    }

    /// Makes `schema_metadata` fail with this error.
    pub fn with_schema_error(mut self, error: StoreError) -> Self {
        self.schema = Some(Err(error));
        self
    }

    /// Queues an error returned by the next call, whatever it is.
    pub fn fail_next(&self, error: StoreError) {
        self.failures.borrow_mut().push_back(error);
    }

    /// Makes every write fail with this error while reads keep working, like a protected sheet.
    pub fn reject_writes(&self, error: StoreError) {
        *self.write_failure.borrow_mut() = Some(error);
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// The table as it would be read back, or `None` for an unknown table.
    pub fn table(&self, name: &str) -> Option<Vec<Vec<Value>>> {
        self.tables.borrow().get(name).map(|grid| trim_grid(grid.clone()))
    }

    fn record(&self, document: &str, call: StoreCall) -> Result<(), StoreError> {
        let is_write = call.is_write();
        self.calls.borrow_mut().push(call);
        if let Some(error) = self.failures.borrow_mut().pop_front() {
            return Err(error);
        }
        if let Some(error) = self.write_failure.borrow().as_ref().filter(|_| is_write) {
            return Err(error.clone());
        }
        if document != self.document {
            return Err(StoreError::DocumentNotFound(document.to_owned()));
        }
        Ok(())
    }

    fn read(&self, range: &str) -> Result<ValueRange, StoreError> {
        let target = parse_range(range)?;
        let tables = self.tables.borrow();
        let values = match tables.get(&target.table) {
            Some(grid) => slice(grid, &Window::from(&target.range)),
            None => Vec::new(),
        };
        Ok(ValueRange {
            range: range.to_owned(),
            values,
        })
    }
}

fn parse_range(range: &str) -> Result<TableRange, StoreError> {
    TableRange::try_from(range).map_err(|_| StoreError::RangeNotFound(range.to_owned()))
}

fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(Value::is_blank)
}

/// Drops trailing blank cells and rows; interior absent cells read as empty strings.
fn trim_grid(grid: Grid) -> Grid {
    let mut grid: Grid = grid
        .into_iter()
        .map(|row| {
            let width = row.iter().rposition(|cell| !cell.is_blank()).map_or(0, |index| index + 1);
            row.into_iter()
                .take(width)
                .map(|cell| if matches!(cell, Value::Empty) { Value::blank() } else { cell })
                .collect()
        })
        .collect();
    while grid.last().is_some_and(|row| row.is_empty()) {
        grid.pop();
    }
    grid
}

fn slice(grid: &Grid, window: &Window) -> Grid {
    let rows = grid
        .iter()
        .enumerate()
        .filter(|(index, _)| *index >= window.first_row && window.last_row.map_or(true, |last| *index <= last))
        .map(|(_, row)| {
            row.iter()
                .enumerate()
                .filter(|(index, _)| *index >= window.first_col && window.last_col.map_or(true, |last| *index <= last))
                .map(|(_, cell)| cell.clone())
                .collect()
        })
        .collect();
    trim_grid(rows)
}

fn put(grid: &mut Grid, row: usize, col: usize, value: Value) {
    if grid.len() <= row {
        grid.resize_with(row + 1, Vec::new);
    }
    let cells = &mut grid[row];
    if cells.len() <= col {
        cells.resize(col + 1, Value::Empty);
    }
    cells[col] = value;
}

impl TabularStore for MemoryStore {
    fn get_range(&self, document: &str, range: &str, _options: &ReadOptions) -> Result<ValueRange, StoreError> {
        self.record(
            document,
            StoreCall::GetRange {
                range: range.to_owned(),
            },
        )?;
        self.read(range)
    }

    fn batch_get_ranges(&self, document: &str, ranges: &[String], _options: &ReadOptions) -> Result<Vec<ValueRange>, StoreError> {
        self.record(
            document,
            StoreCall::BatchGetRanges {
                ranges: ranges.to_vec(),
            },
        )?;
        ranges.iter().map(|range| self.read(range)).collect()
    }

    fn batch_write(&self, document: &str, data: &[WriteRange], _input: ValueInputOption) -> Result<BatchWriteResponse, StoreError> {
        self.record(
            document,
            StoreCall::BatchWrite {
                ranges: data.iter().map(|write| write.range.clone()).collect(),
            },
        )?;
        let targets = data
            .iter()
            .map(|write| {
                let target = parse_range(&write.range)?;
                if !self.tables.borrow().contains_key(&target.table) {
                    return Err(StoreError::RangeNotFound(write.range.clone()));
                }
                Ok(target)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = self.tables.borrow_mut();
        let mut response = BatchWriteResponse::default();
        for (target, write) in targets.iter().zip(data) {
            let Some(grid) = tables.get_mut(&target.table) else {
                continue;
            };
            let window = Window::from(&target.range);
            for (offset, cells) in write.values.iter().enumerate() {
                for (col_offset, value) in cells.iter().enumerate() {
                    put(grid, window.first_row + offset, window.first_col + col_offset, value.clone());
                    response.total_updated_cells += 1;
                }
            }
            response.total_updated_rows += write.values.len();
        }
        Ok(response)
    }

    fn append_rows(&self, document: &str, range: &str, values: Vec<Vec<Value>>, _options: &AppendOptions) -> Result<AppendResponse, StoreError> {
        self.record(
            document,
            StoreCall::AppendRows {
                range: range.to_owned(),
                rows: values.len(),
            },
        )?;
        let target = parse_range(range)?;
        let mut tables = self.tables.borrow_mut();
        let grid = tables
            .get_mut(&target.table)
            .ok_or_else(|| StoreError::RangeNotFound(range.to_owned()))?;
        let start = grid.iter().rposition(|row| !is_blank_row(row)).map_or(0, |index| index + 1);
        let width = values.iter().map(Vec::len).max().unwrap_or(0);
        let count = values.len();
        for (offset, cells) in values.into_iter().enumerate() {
            for (col, value) in cells.into_iter().enumerate() {
                put(grid, start + offset, col, value);
            }
        }
        let table = quote_table_name(&target.table);
        let updated_range = if count == 0 || width == 0 {
            table
        } else {
            format!("{}!A{}:{}{}", table, start + 1, column_letter(width - 1), start + count)
        };
        Ok(AppendResponse { updated_range })
    }

    fn delete_rows(&self, document: &str, table: &str, positions: &[usize]) -> Result<(), StoreError> {
        self.record(
            document,
            StoreCall::DeleteRows {
                table: table.to_owned(),
                positions: positions.to_vec(),
            },
        )?;
        let mut tables = self.tables.borrow_mut();
        let grid = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::RangeNotFound(table.to_owned()))?;
        for position in positions {
            if *position == 0 {
                return Err(StoreError::Remote(format!("Invalid row position {}", position)));
            }
            if *position <= grid.len() {
                grid.remove(position - 1);
            }
        }
        Ok(())
    }

    fn schema_metadata(&self, document: &str) -> Result<SchemaMetadata, StoreError> {
        self.record(document, StoreCall::SchemaMetadata)?;
        self.schema.clone().unwrap_or(Err(StoreError::Unsupported("schema_metadata")))
    }
}

#[cfg(test)]
mod tests {
    use crate::store::memory::*;

    fn people() -> MemoryStore {
        MemoryStore::new("doc").with_table(
            "People",
            vec![
                vec![Value::from("Id"), Value::from("Name"), Value::from("ManagerId")],
                vec![Value::from(1), Value::from("A"), Value::blank()],
                vec![Value::from(2), Value::from("B"), Value::from("1")],
            ],
        )
    }

    #[test]
    fn reads_trim_trailing_blanks() {
        let store = people();
        let range = store.get_range("doc", "People", &ReadOptions::default()).unwrap();
        assert_eq!(range.values[1], vec![Value::from(1), Value::from("A")]);
        assert_eq!(range.values.len(), 3);
        let header = store.get_range("doc", "People!1:1", &ReadOptions::default()).unwrap();
        assert_eq!(header.values, vec![vec![Value::from("Id"), Value::from("Name"), Value::from("ManagerId")]]);
        let cell = store.get_range("doc", "People!B3", &ReadOptions::default()).unwrap();
        assert_eq!(cell.values, vec![vec![Value::from("B")]]);
    }

    #[test]
    fn unknown_tables_read_blank() {
        let store = people();
        let ranges = store
            .batch_get_ranges("doc", &["People".to_owned(), "'No Such'".to_owned()], &ReadOptions::default())
            .unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(ranges[1].values.is_empty());
        assert_eq!(store.calls().len(), 1);
    }

    #[test]
    fn writes_and_appends() {
        let store = people();
        let write = WriteRange {
            range: "People!C2:C3".to_owned(),
            values: vec![vec![Value::from("9")], vec![Value::from("8")]],
        };
        let response = store.batch_write("doc", &[write], ValueInputOption::UserEntered).unwrap();
        assert_eq!(response.total_updated_cells, 2);
        assert_eq!(store.table("People").unwrap()[1][2], Value::from("9"));

        let appended = store
            .append_rows("doc", "People", vec![vec![Value::from(3), Value::from("C")]], &AppendOptions::default())
            .unwrap();
        assert_eq!(appended.updated_range, "People!A4:B4");
        assert_eq!(store.table("People").unwrap().len(), 4);

        let missing = WriteRange {
            range: "Nope!A1:A1".to_owned(),
            values: vec![vec![Value::from(1)]],
        };
        assert!(matches!(
            store.batch_write("doc", &[missing], ValueInputOption::Raw),
            Err(StoreError::RangeNotFound(_))
        ));
    }

    #[test]
    fn deletes_in_given_order() {
        let store = people();
        store.delete_rows("doc", "People", &[3, 2]).unwrap();
        assert_eq!(store.table("People").unwrap().len(), 1);
    }

    #[test]
    fn queued_failures_and_documents() {
        let store = people();
        store.fail_next(StoreError::RateLimited("slow".to_owned()));
        assert!(store.get_range("doc", "People", &ReadOptions::default()).is_err());
        assert!(store.get_range("doc", "People", &ReadOptions::default()).is_ok());
        assert!(matches!(
            store.get_range("other", "People", &ReadOptions::default()),
            Err(StoreError::DocumentNotFound(_))
        ));
        assert!(matches!(store.schema_metadata("doc"), Err(StoreError::Unsupported(_))));
        assert_eq!(store.calls().len(), 4);
        assert!(!store.calls()[0].is_write());
    }
}
