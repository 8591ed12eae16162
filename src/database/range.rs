use crate::error::SheetQueryError;
use regex::Regex;
use std::fmt::Display;
use thiserror::Error;

/// Errors related to A1-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),

    #[error("Could not parse updated range: {0}")]
    UpdatedRangeError(String),
}

/// Converts a 0-based column index to its spreadsheet letter (0 -> A, 25 -> Z, 26 -> AA).
pub fn column_letter(index: usize) -> String {
    let mut value = index + 1;
    let mut letters = Vec::new();
    while value > 0 {
        let remainder = (value - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        value = (value - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts a column letter ("A", "AB") to a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut value = 0usize;
    for char in letters.chars() {
        if !char.is_ascii_uppercase() {
            return None;
        }
        value = value * 26 + (char as usize - 'A' as usize + 1);
    }
    Some(value - 1)
}

/// Converts a 1-based row number ("1", "42") to a 0-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Quotes a table name for use in a range reference when it is not a plain identifier.
pub fn quote_table_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|char| char.is_ascii_alphanumeric() || char == '_') {
        name.to_owned()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Represents an A1-style cell range with optional boundaries.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Range {
    /// Lower row bound (0-based index), None for unbounded
    pub row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index), None for unbounded
    pub row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index), None for unbounded
    pub col_upper_bound: Option<usize>,
}

impl Range {
    /// A single column spanning the given 1-based rows.
    pub fn column_span(col: usize, first_row: usize, last_row: usize) -> Self {
        Range {
            row_lower_bound: Some(first_row - 1),
            row_upper_bound: Some(last_row - 1),
            col_lower_bound: Some(col),
            col_upper_bound: Some(col),
        }
    }

    /// The 1-based header row only ("1:1").
    pub fn header_row() -> Self {
        Range {
            row_lower_bound: Some(0),
            row_upper_bound: Some(0),
            ..Range::default()
        }
    }

    /// Returns true if the range selects the entire sheet.
    pub fn is_unbounded(&self) -> bool {
        *self == Range::default()
    }

    /// 1-based first row, when bounded.
    pub fn first_row(&self) -> Option<usize> {
        self.row_lower_bound.map(|row| row + 1)
    }

    /// 1-based last row. A single cell reference ("B7") ends where it starts.
    pub fn last_row(&self) -> Option<usize> {
        self.row_upper_bound.or(self.row_lower_bound).map(|row| row + 1)
    }
}

impl TryFrom<&str> for Range {
    type Error = SheetQueryError;

    /// Parses an A1-style range string (e.g., "A1", "B2:C5", "A", "1:10", "A:ZZ").
    /// Supports single cells, ranges, and partial ranges (columns or rows only).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let value = value.to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        Ok(Range {
            col_lower_bound: captures
                .get(1)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_lower_bound: captures
                .get(2)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
            col_upper_bound: captures
                .get(4)
                .map(|matcher| matcher.as_str())
                .and_then(col_to_index),
            row_upper_bound: captures
                .get(5)
                .map(|matcher| matcher.as_str())
                .and_then(row_to_index),
        })
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let corner = |col: Option<usize>, row: Option<usize>| {
            format!(
                "{}{}",
                col.map(column_letter).unwrap_or_default(),
                row.map(|row| (row + 1).to_string()).unwrap_or_default()
            )
        };
        let lower = corner(self.col_lower_bound, self.row_lower_bound);
        let upper = corner(self.col_upper_bound, self.row_upper_bound);
        if upper.is_empty() {
            write!(f, "{}", lower)
        } else {
            write!(f, "{}:{}", lower, upper)
        }
    }
}

/// A range qualified by its table (sheet) name, e.g. `'My Sheet'!B2:B4`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRange {
    pub table: String,
    pub range: Range,
}

impl TableRange {
    pub fn new(table: &str, range: Range) -> Self {
        TableRange {
            table: table.to_owned(),
            range,
        }
    }

    /// The whole table, header row included.
    pub fn whole(table: &str) -> Self {
        Self::new(table, Range::default())
    }
}

impl TryFrom<&str> for TableRange {
    type Error = SheetQueryError;

    /// Parses "Sheet", "Sheet!A1:B2" or "'My Sheet'!A1:B2".
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^(?:'((?:[^']|'')+)'|([^!']+))(?:!(.*))?$").expect("Hardcode regex pattern");
        let captures = pattern
            .captures(value)
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let table = captures
            .get(1)
            .map(|matcher| matcher.as_str().replace("''", "'"))
            .or_else(|| captures.get(2).map(|matcher| matcher.as_str().to_owned()))
            .ok_or(RangeError::FormatError(value.to_owned()))?;
        let range = match captures.get(3) {
            Some(matcher) => Range::try_from(matcher.as_str())?,
            None => Range::default(),
        };
        Ok(TableRange { table, range })
    }
}

impl Display for TableRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.range.is_unbounded() {
            write!(f, "{}", quote_table_name(&self.table))
        } else {
            write!(f, "{}!{}", quote_table_name(&self.table), self.range)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::database::range::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(52), "BA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn column_letters_invert() {
        for index in [0, 1, 25, 26, 27, 51, 52, 701, 702, 16383] {
            assert_eq!(col_to_index(&column_letter(index)), Some(index));
        }
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("a"), None);
    }

    #[test]
    fn parse_cell_ranges() {
        let range = Range::try_from("B2:C5").unwrap();
        assert_eq!(range.col_lower_bound, Some(1));
        assert_eq!(range.row_lower_bound, Some(1));
        assert_eq!(range.col_upper_bound, Some(2));
        assert_eq!(range.row_upper_bound, Some(4));

        let range = Range::try_from("1:1").unwrap();
        assert_eq!(range, Range::header_row());

        let range = Range::try_from("a:zz").unwrap();
        assert_eq!(range.col_lower_bound, Some(0));
        assert_eq!(range.col_upper_bound, Some(701));
        assert_eq!(range.row_lower_bound, None);

        let range = Range::try_from("B7").unwrap();
        assert_eq!(range.first_row(), Some(7));
        assert_eq!(range.last_row(), Some(7));

        assert!(Range::try_from("B2-C5").is_err());
    }

    #[test]
    fn format_ranges() {
        assert_eq!(Range::column_span(1, 2, 4).to_string(), "B2:B4");
        assert_eq!(Range::column_span(1, 7, 7).to_string(), "B7:B7");
        assert_eq!(Range::header_row().to_string(), "1:1");
        assert_eq!(Range::default().to_string(), "");
    }

    #[test]
    fn table_ranges() {
        let range = TableRange::try_from("People!A5:C7").unwrap();
        assert_eq!(range.table, "People");
        assert_eq!(range.range.first_row(), Some(5));
        assert_eq!(range.range.last_row(), Some(7));

        let range = TableRange::try_from("'Team ''A'''!B2").unwrap();
        assert_eq!(range.table, "Team 'A'");
        assert_eq!(range.to_string(), "'Team ''A'''!B2");

        let range = TableRange::try_from("People").unwrap();
        assert!(range.range.is_unbounded());
        assert_eq!(range.to_string(), "People");

        assert_eq!(TableRange::new("My Sheet", Range::header_row()).to_string(), "'My Sheet'!1:1");
    }
}
