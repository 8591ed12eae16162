//! Conversion between raw positional rows and typed, keyed rows.
//!
//! Decoding starts every header at the empty string, copies raw cells in by
//! position and then types string cells: an authoritative column type hint
//! wins, otherwise `true`/`false` become booleans and `M/D/YYYY[ h:m[:s]]`
//! becomes a date when it names a real calendar instant. Encoding turns the
//! typed row back into storable cells in header order.
use crate::database::column::ColumnHints;
use crate::database::column::ColumnType;
use crate::spreadsheet::cell::build_datetime;
use crate::spreadsheet::cell::parse_datetime;
use crate::spreadsheet::cell::serial_to_datetime;
use crate::spreadsheet::cell::Value;
use crate::spreadsheet::cell::DEFAULT_DATE_FORMAT;
use crate::spreadsheet::row::Record;
use crate::spreadsheet::row::Row;
use crate::spreadsheet::row::RowMeta;
use regex::Regex;

/// First data row; row 1 holds the headers.
pub const FIRST_DATA_ROW: usize = 2;

/// Maps raw cells to typed rows and back.
#[derive(Clone, Debug)]
pub struct RowCodec {
    date_format: String,
    infer_types: bool,
    date_pattern: Regex,
}

impl Default for RowCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, true)
    }
}

impl RowCodec {
    pub fn new(date_format: &str, infer_types: bool) -> Self {
        RowCodec {
            date_format: date_format.to_owned(),
            infer_types,
            date_pattern: Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?)?$").expect("Hardcode regex pattern"),
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Decodes one raw row. `position` is the 1-based sheet row the cells came from.
    pub fn decode(&self, raw: &[Value], headers: &[String], position: usize, hints: Option<&ColumnHints>) -> Row {
        let mut row = Row::new(RowMeta {
            position,
            column_count: raw.len(),
        });
        for header in headers {
            row.set(header.as_str(), Value::blank());
        }
        for (header, value) in headers.iter().zip(raw.iter()) {
            if matches!(value, Value::Empty) {
                continue; // Keep the empty string
            }
            let value = match hints.and_then(|hints| hints.get(header)) {
                Some(kind) => self.apply_column_type(value, *kind),
                None => self.infer(value),
            };
            row.set(header.as_str(), value);
        }
        row
    }

    /// Decodes raw data rows, numbering them from `FIRST_DATA_ROW`.
    pub fn decode_rows(&self, raw: &[Vec<Value>], headers: &[String], hints: Option<&ColumnHints>) -> Vec<Row> {
        raw.iter()
            .enumerate()
            .map(|(index, cells)| self.decode(cells, headers, index + FIRST_DATA_ROW, hints))
            .collect()
    }

    /// Encodes fields into raw cells in header order; missing fields become empty strings.
    pub fn encode(&self, fields: &Record, headers: &[String]) -> Vec<Value> {
        headers
            .iter()
            .map(|header| fields.get(header).map(|value| self.normalize(value)).unwrap_or_else(Value::blank))
            .collect()
    }

    /// Storage normalization: dates become their locale string, absent values the empty string.
    pub fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Empty => Value::blank(),
            Value::Date(datetime) => Value::Text(datetime.format(&self.date_format).to_string()),
            other => other.clone(),
        }
    }

    /// Equality used for change detection.
    pub fn values_equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Date(left), Value::Date(right)) => left == right,
            (Value::Date(date), Value::Text(text)) | (Value::Text(text), Value::Date(date)) => {
                date.format(&self.date_format).to_string() == *text
            }
            _ if left.is_blank() && right.is_blank() => true,
            _ => left == right,
        }
    }

    /// String coercion for join keys.
    pub fn key_string(&self, value: &Value) -> String {
        value.to_key_string(&self.date_format)
    }

    /// Heuristic typing of string cells: booleans and `M/D/YYYY` dates.
    pub fn infer(&self, value: &Value) -> Value {
        let text = match value {
            Value::Text(text) if self.infer_types && !text.is_empty() => text,
            _ => return value.clone(),
        };
        let lower = text.to_lowercase();
        if lower == "true" || lower == "false" {
            return Value::Boolean(lower == "true");
        }
        if let Some(captures) = self.date_pattern.captures(text) {
            let field = |index: usize| {
                captures
                    .get(index)
                    .map(|matcher| matcher.as_str().parse::<u32>().ok())
                    .unwrap_or(Some(0))
            };
            let parsed = (|| {
                let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
                build_datetime(year, field(1)?, field(2)?, field(4)?, field(5)?, field(6)?)
            })();
            if let Some(datetime) = parsed {
                return Value::Date(datetime);
            }
        }
        value.clone()
    }

    /// Authoritative typing from a column type hint; falls back to the original value.
    pub fn apply_column_type(&self, value: &Value, kind: ColumnType) -> Value {
        if value.is_blank() {
            return value.clone();
        }
        match (kind, value) {
            (ColumnType::Boolean, Value::Text(text)) => Value::Boolean(text.to_lowercase() == "true"),
            (ColumnType::Boolean, Value::Number(number)) => Value::Boolean(*number != 0.0 && !number.is_nan()),
            (ColumnType::Number, Value::Text(text)) => match text.trim().parse::<f64>() {
                Ok(number) if !number.is_nan() => Value::Number(number),
                _ => value.clone(),
            },
            (ColumnType::Date | ColumnType::DateTime, Value::Text(text)) => parse_datetime(text, &self.date_format)
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            (ColumnType::Date | ColumnType::DateTime, Value::Number(serial)) => serial_to_datetime(*serial)
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::database::column::ColumnHints;
    use crate::database::column::ColumnType;
    use crate::spreadsheet::cell::build_datetime;
    use crate::spreadsheet::*;
    use proptest::prelude::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn decode_pads_missing_cells() {
        let codec = RowCodec::default();
        let row = codec.decode(&[Value::from("1"), Value::Empty], &headers(&["Id", "Name", "Status"]), 2, None);
        assert_eq!(row.value("Id"), &Value::from("1"));
        assert_eq!(row.value("Name"), &Value::blank());
        assert_eq!(row.value("Status"), &Value::blank());
        assert_eq!(row.meta().position, 2);
        assert_eq!(row.meta().column_count, 2);
    }

    #[test]
    fn decode_ignores_extra_cells() {
        let codec = RowCodec::default();
        let row = codec.decode(&[Value::from("1"), Value::from("x")], &headers(&["Id"]), 5, None);
        assert_eq!(row.fields().len(), 1);
        assert_eq!(row.meta().column_count, 2);
    }

    #[test]
    fn infer_booleans_and_dates() {
        let codec = RowCodec::default();
        assert_eq!(codec.infer(&Value::from("TRUE")), Value::from(true));
        assert_eq!(codec.infer(&Value::from("False")), Value::from(false));
        assert_eq!(codec.infer(&Value::from("1/2/2024")), Value::from(build_datetime(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(codec.infer(&Value::from("12/31/2024 23:59")), Value::from(build_datetime(2024, 12, 31, 23, 59, 0).unwrap()));
        assert_eq!(codec.infer(&Value::from("3/4/2024 5:6:7")), Value::from(build_datetime(2024, 3, 4, 5, 6, 7).unwrap()));
        assert_eq!(codec.infer(&Value::from("2/30/2024")), Value::from("2/30/2024"));
        assert_eq!(codec.infer(&Value::from("2024-01-02")), Value::from("2024-01-02"));
        assert_eq!(codec.infer(&Value::from("yes")), Value::from("yes"));
        assert_eq!(codec.infer(&Value::from(3.0)), Value::from(3.0));
    }

    #[test]
    fn infer_disabled() {
        let codec = RowCodec::new(DEFAULT_DATE_FORMAT, false);
        assert_eq!(codec.infer(&Value::from("true")), Value::from("true"));
    }

    #[test]
    fn hints_take_precedence() {
        let codec = RowCodec::default();
        let hints = ColumnHints::from([
            ("Paid".to_owned(), ColumnType::Boolean),
            ("Total".to_owned(), ColumnType::Number),
            ("Due".to_owned(), ColumnType::Date),
            ("Note".to_owned(), ColumnType::Text),
        ]);
        let raw = vec![Value::from("yes"), Value::from(" 12.5 "), Value::from(45293.0), Value::from("true")];
        let row = codec.decode(&raw, &headers(&["Paid", "Total", "Due", "Note"]), 2, Some(&hints));
        assert_eq!(row.value("Paid"), &Value::from(false));
        assert_eq!(row.value("Total"), &Value::from(12.5));
        assert_eq!(row.value("Due"), &Value::from(build_datetime(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(row.value("Note"), &Value::from("true"));
    }

    #[test]
    fn hints_never_fail() {
        let codec = RowCodec::default();
        assert_eq!(codec.apply_column_type(&Value::from("n/a"), ColumnType::Number), Value::from("n/a"));
        assert_eq!(codec.apply_column_type(&Value::from("later"), ColumnType::DateTime), Value::from("later"));
        assert_eq!(codec.apply_column_type(&Value::blank(), ColumnType::Boolean), Value::blank());
        assert_eq!(codec.apply_column_type(&Value::from(0), ColumnType::Boolean), Value::from(false));
    }

    #[test]
    fn encode_in_header_order() {
        let codec = RowCodec::default();
        let fields = Record::from([
            ("Name".to_owned(), Value::from("A")),
            ("When".to_owned(), Value::from(build_datetime(2024, 1, 2, 15, 4, 5).unwrap())),
            ("Gone".to_owned(), Value::Empty),
        ]);
        let raw = codec.encode(&fields, &headers(&["When", "Id", "Name", "Gone"]));
        assert_eq!(raw, vec![Value::from("1/2/2024, 3:04:05 PM"), Value::blank(), Value::from("A"), Value::blank()]);
    }

    #[test]
    fn values_equal_rules() {
        let codec = RowCodec::default();
        let date = Value::from(build_datetime(2024, 1, 2, 15, 4, 5).unwrap());
        assert!(codec.values_equal(&date, &date.clone()));
        assert!(codec.values_equal(&date, &Value::from("1/2/2024, 3:04:05 PM")));
        assert!(codec.values_equal(&Value::from("1/2/2024, 3:04:05 PM"), &date));
        assert!(!codec.values_equal(&date, &Value::from("1/2/2024")));
        assert!(codec.values_equal(&Value::Empty, &Value::blank()));
        assert!(!codec.values_equal(&Value::from(1), &Value::from("1")));
        assert!(!codec.values_equal(&Value::from(0), &Value::blank()));
        assert!(codec.values_equal(&Value::from(true), &Value::from(true)));
    }

    proptest! {
        /// Non-boolean, non-date text and numbers survive decode then encode unchanged.
        #[test]
        fn round_trip_plain_cells(
            cells in prop::collection::vec(
                prop_oneof![
                    "[a-zA-Z ]{0,12}".prop_map(Value::from),
                    (-1.0e9..1.0e9f64).prop_map(Value::from),
                ],
                0..8,
            )
        ) {
            let cells: Vec<Value> = cells
                .into_iter()
                .filter(|cell| !matches!(cell.as_str().map(str::to_lowercase).as_deref(), Some("true") | Some("false")))
                .collect();
            let names: Vec<String> = (0..cells.len()).map(|index| format!("c{index}")).collect();
            let codec = RowCodec::default();
            let row = codec.decode(&cells, &names, 2, None);
            prop_assert_eq!(codec.encode(row.fields(), &names), cells);
        }

        /// Date cells encode to the locale string of the date they parse to.
        #[test]
        fn round_trip_date_cells(month in 1u32..=12, day in 1u32..=28, year in 1900i32..2100, hour in 0u32..24, minute in 0u32..60) {
            let raw = Value::from(format!("{month}/{day}/{year} {hour}:{minute}"));
            let codec = RowCodec::default();
            let names = vec!["When".to_owned()];
            let row = codec.decode(&[raw], &names, 2, None);
            let expected = build_datetime(year, month, day, hour, minute, 0).unwrap();
            prop_assert_eq!(codec.encode(row.fields(), &names), vec![codec.normalize(&Value::from(expected))]);
        }
    }
}
