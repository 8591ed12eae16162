use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Default rendering of a date as a "locale string" (en-US style, e.g. `1/2/2024, 3:04:05 PM`).
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Formats the store accepts as a date when a column is typed as a date.
const DATE_TIME_FORMATS: [&str; 7] = [
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// A typed cell value, as materialized into a row or written back to the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (null/undefined)
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean(bool),
    /// Numeric values
    Number(f64),
    /// Text values
    Text(String),
    /// Date/time values without timezone
    Date(NaiveDateTime),
}

impl Value {
    /// The empty-string value every header slot starts with.
    pub fn blank() -> Self {
        Value::Text(String::new())
    }

    /// Returns true for null/undefined and the empty string, which compare equal.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// String coercion used for join keys and header names.
    pub fn to_key_string(&self, date_format: &str) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Boolean(value) => value.to_string(),
            Value::Number(value) => format_number(*value),
            Value::Text(text) => text.to_owned(),
            Value::Date(value) => value.format(date_format).to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key_string(DEFAULT_DATE_FORMAT))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Empty)
    }
}

/// Formats a number the shortest way that reads back to the same value (1, 1.5, -0.25).
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if value == 0.0 {
        "0".to_owned() // no "-0"
    } else {
        value.to_string()
    }
}

/// Builds a calendar instant, rejecting out-of-range fields instead of rolling over.
pub(crate) fn build_datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Converts a spreadsheet serial number (days since 1899-12-30) to a date/time.
/// Handles Lotus 1-2-3 leap year bug for serials before 1900-03-01.
pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = (serial.fract().abs() * 86_400f64).round() as i64;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_signed(Duration::days(days + if (1..60).contains(&days) { 1 } else { 0 }))?;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(seconds))
}

/// Parses the date spellings accepted for date-typed columns, including `date_format` itself.
pub(crate) fn parse_datetime(text: &str, date_format: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, date_format) {
        return Some(datetime);
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::spreadsheet::cell::*;

    fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        build_datetime(year, month, day, hour, minute, second).unwrap()
    }

    #[test]
    fn blank_values() {
        assert!(Value::Empty.is_blank());
        assert!(Value::blank().is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::from(0).is_blank());
        assert!(!Value::from(false).is_blank());
    }

    #[test]
    fn key_strings() {
        assert_eq!(Value::from(1).to_key_string(DEFAULT_DATE_FORMAT), "1");
        assert_eq!(Value::from(1.5).to_key_string(DEFAULT_DATE_FORMAT), "1.5");
        assert_eq!(Value::from(-0.0).to_key_string(DEFAULT_DATE_FORMAT), "0");
        assert_eq!(Value::from(true).to_key_string(DEFAULT_DATE_FORMAT), "true");
        assert_eq!(Value::Empty.to_key_string(DEFAULT_DATE_FORMAT), "");
        assert_eq!(Value::from("A").to_key_string(DEFAULT_DATE_FORMAT), "A");
        assert_eq!(Value::from(datetime(2024, 1, 2, 15, 4, 5)).to_string(), "1/2/2024, 3:04:05 PM");
        assert_eq!(Value::from(datetime(2024, 11, 12, 0, 0, 0)).to_string(), "11/12/2024, 12:00:00 AM");
    }

    #[test]
    fn invalid_calendar_dates() {
        assert!(build_datetime(2024, 2, 29, 0, 0, 0).is_some());
        assert!(build_datetime(2023, 2, 29, 0, 0, 0).is_none());
        assert!(build_datetime(2024, 13, 1, 0, 0, 0).is_none());
        assert!(build_datetime(2024, 1, 1, 24, 0, 0).is_none());
    }

    #[test]
    fn serial_numbers() {
        assert_eq!(serial_to_datetime(45293.0), Some(datetime(2024, 1, 2, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45293.5), Some(datetime(2024, 1, 2, 12, 0, 0)));
        assert_eq!(serial_to_datetime(61.0), Some(datetime(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(1.0), Some(datetime(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn parse_date_spellings() {
        let expected = Some(datetime(2024, 1, 2, 15, 4, 5));
        assert_eq!(parse_datetime("1/2/2024, 3:04:05 PM", DEFAULT_DATE_FORMAT), expected);
        assert_eq!(parse_datetime("2024-01-02T15:04:05", DEFAULT_DATE_FORMAT), expected);
        assert_eq!(parse_datetime("2024-01-02 15:04:05", DEFAULT_DATE_FORMAT), expected);
        assert_eq!(parse_datetime("01/02/2024 15:04:05", DEFAULT_DATE_FORMAT), expected);
        assert_eq!(parse_datetime("2024-01-02", DEFAULT_DATE_FORMAT), Some(datetime(2024, 1, 2, 0, 0, 0)));
        assert_eq!(parse_datetime("1/2/2024", DEFAULT_DATE_FORMAT), Some(datetime(2024, 1, 2, 0, 0, 0)));
        assert_eq!(parse_datetime("soon", DEFAULT_DATE_FORMAT), None);
    }

    #[test]
    fn json_scalars() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3.5, "x"]"#).unwrap();
        assert_eq!(values, vec![Value::Empty, Value::from(true), Value::from(3.5), Value::from("x")]);
        assert_eq!(serde_json::to_string(&Value::from("y")).unwrap(), r#""y""#);
    }
}
