//! Contiguous-range coalescing of cell changes.
//!
//! Changes are grouped per column and sorted by row. Consecutive changes join
//! one run while at most `gap_fill_rows` untouched rows lie between them; those
//! rows are written back with their current value so the wider write leaves
//! them unchanged. A gap row with no known value always splits the run.
use crate::database::Range;
use crate::database::TableRange;
use crate::spreadsheet::Value;
use crate::store::WriteRange;
use std::collections::BTreeMap;

/// A detected difference at one (column, row) address.
#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    /// 0-based column index
    pub column: usize,
    /// 1-based sheet row
    pub row: usize,
    pub value: Value,
}

/// A single-column run of rows written in one range.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRun {
    /// 0-based column index
    pub column: usize,
    /// 1-based first sheet row
    pub first_row: usize,
    /// One value per row, starting at `first_row`
    pub values: Vec<Value>,
}

impl ColumnRun {
    pub fn last_row(&self) -> usize {
        self.first_row + self.values.len() - 1
    }

    /// The range this run covers, always written as `start:end`.
    pub fn range(&self, table: &str) -> String {
        TableRange::new(table, Range::column_span(self.column, self.first_row, self.last_row())).to_string()
    }

    pub fn to_write(&self, table: &str) -> WriteRange {
        WriteRange {
            range: self.range(table),
            values: self.values.iter().map(|value| vec![value.clone()]).collect(),
        }
    }
}

/// Groups changes into per-column runs, ordered by column then row.
///
/// `current(column, row)` supplies the stored value of an untouched gap row.
pub fn coalesce<F>(changes: Vec<CellChange>, gap_fill_rows: usize, current: F) -> Vec<ColumnRun>
where
    F: Fn(usize, usize) -> Option<Value>,
{
    let mut columns: BTreeMap<usize, BTreeMap<usize, Value>> = BTreeMap::new();
    for change in changes {
        columns.entry(change.column).or_default().insert(change.row, change.value);
    }

    let mut runs = Vec::new();
    for (column, rows) in columns {
        let mut run: Option<ColumnRun> = None;
        for (row, value) in rows {
            if let Some(current_run) = run.as_mut() {
                let gap = row - current_run.last_row() - 1;
                let fill = match gap {
                    0 => Some(Vec::new()),
                    gap if gap <= gap_fill_rows => (current_run.last_row() + 1..row)
                        .map(|gap_row| current(column, gap_row))
                        .collect::<Option<Vec<Value>>>(),
                    _ => None,
                };
                if let Some(fill) = fill {
                    current_run.values.extend(fill);
                    current_run.values.push(value);
                    continue;
                }
                runs.extend(run.take());
            }
            run = Some(ColumnRun {
                column,
                first_row: row,
                values: vec![value],
            });
        }
        runs.extend(run);
    }
    runs
}

#[cfg(test)]
mod tests {
    use crate::operation::coalesce::*;

    fn changes(column: usize, rows: &[usize]) -> Vec<CellChange> {
        rows.iter()
            .map(|row| CellChange {
                column,
                row: *row,
                value: Value::from(format!("new{row}")),
            })
            .collect()
    }

    fn ranges(runs: &[ColumnRun]) -> Vec<String> {
        runs.iter().map(|run| run.range("Tasks")).collect()
    }

    #[test]
    fn contiguous_rows_merge() {
        let runs = coalesce(changes(1, &[2, 3, 4, 7]), 1, |_, _| Some(Value::from("old")));
        assert_eq!(ranges(&runs), vec!["Tasks!B2:B4", "Tasks!B7:B7"]);
        assert_eq!(runs[0].values, vec![Value::from("new2"), Value::from("new3"), Value::from("new4")]);
    }

    #[test]
    fn single_gap_is_filled_with_current_value() {
        let runs = coalesce(changes(1, &[2, 4]), 1, |column, row| {
            assert_eq!((column, row), (1, 3));
            Some(Value::from("kept"))
        });
        assert_eq!(ranges(&runs), vec!["Tasks!B2:B4"]);
        assert_eq!(runs[0].values, vec![Value::from("new2"), Value::from("kept"), Value::from("new4")]);
    }

    #[test]
    fn unknown_gap_rows_split() {
        let runs = coalesce(changes(1, &[2, 4]), 1, |_, _| None);
        assert_eq!(ranges(&runs), vec!["Tasks!B2:B2", "Tasks!B4:B4"]);
    }

    #[test]
    fn gap_fill_disabled() {
        let runs = coalesce(changes(0, &[2, 4, 5]), 0, |_, _| Some(Value::blank()));
        assert_eq!(ranges(&runs), vec!["Tasks!A2:A2", "Tasks!A4:A5"]);
    }

    #[test]
    fn columns_are_independent() {
        let mut all = changes(2, &[3]);
        all.extend(changes(0, &[3, 4]));
        let runs = coalesce(all, 1, |_, _| None);
        assert_eq!(ranges(&runs), vec!["Tasks!A3:A4", "Tasks!C3:C3"]);
        assert_eq!(runs[1].to_write("Tasks").values, vec![vec![Value::from("new3")]]);
    }

    #[test]
    fn runs_never_touch() {
        let rows = [2, 3, 5, 9, 10, 11, 14];
        let runs = coalesce(changes(3, &rows), 1, |_, _| Some(Value::blank()));
        for pair in runs.windows(2) {
            assert!(pair[0].last_row() + 1 < pair[1].first_row);
        }
        assert_eq!(ranges(&runs), vec!["Tasks!D2:D5", "Tasks!D9:D11", "Tasks!D14:D14"]);
    }
}
